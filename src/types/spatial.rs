//! Spatial geometry types built from primitive tables

use serde::{Deserialize, Serialize};

/// 2D or 3D coordinate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub z: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Planar equality, ignoring z
    pub fn same_xy(&self, other: &Point) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// Axis-aligned extent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Extents are taken as stored; datasets occasionally carry inverted boxes
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn from_point(point: Point) -> Self {
        Self {
            min_x: point.x,
            min_y: point.y,
            max_x: point.x,
            max_y: point.y,
        }
    }

    pub fn expand(&mut self, point: &Point) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Geometry values produced by the primitive builders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(Vec<Point>),
    /// Closed rings; the first is the shell
    Polygon {
        exterior: Vec<Point>,
        holes: Vec<Vec<Point>>,
    },
    /// Annotation text placed along a shape line
    Text {
        text: String,
        line: Vec<Point>,
    },
}

impl Geometry {
    fn points(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(p)),
            Geometry::LineString(points) => Box::new(points.iter()),
            Geometry::Polygon { exterior, holes } => {
                Box::new(exterior.iter().chain(holes.iter().flatten()))
            }
            Geometry::Text { line, .. } => Box::new(line.iter()),
        }
    }

    /// Bounding box of the geometry, `None` when it has no coordinates
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut points = self.points();
        let mut bbox = BoundingBox::from_point(*points.next()?);
        for point in points {
            bbox.expand(point);
        }
        Some(bbox)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::Text { .. } => "Text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(-5.0, 2.0, 4.0, 20.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(-5.0, 0.0, 10.0, 20.0));
    }

    #[test]
    fn test_polygon_bbox_includes_holes() {
        let polygon = Geometry::Polygon {
            exterior: vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 0.0),
            ],
            holes: vec![vec![Point::new(-1.0, 2.0), Point::new(2.0, 2.0)]],
        };

        let bbox = polygon.bounding_box().unwrap();
        assert_eq!(bbox.min_x, -1.0);
        assert_eq!(bbox.max_x, 10.0);
    }

    #[test]
    fn test_empty_geometry_has_no_bbox() {
        assert!(Geometry::LineString(vec![]).bounding_box().is_none());
    }
}
