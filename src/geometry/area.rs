//! Area features: `fac_id` -> rings -> winged-edge walk
//!
//! Each face owns one or more rings (`rng.face_id`, `rng.start_edge`). A ring
//! is traced from its start edge: an edge with the face on its right is
//! taken forward and continues with `right_edge`, an edge with the face on
//! its left is taken backward and continues with `left_edge`. The walk ends
//! when it returns to the start edge. The first ring is the shell.

use super::{append_points, GeometryFactory, GeometrySource};
use crate::error::{Result, VpfError};
use crate::types::{Geometry, Point, Row, Value};
use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Face 1 is the universe face and has no boundary of its own
const UNIVERSE_FACE: i64 = 1;

/// Start edges of each face's rings, in ring table order
type RingIndex = AHashMap<i64, Vec<i64>>;

#[derive(Default)]
pub struct AreaFactory {
    rings: Mutex<AHashMap<PathBuf, Arc<RingIndex>>>,
}

impl AreaFactory {
    fn ring_index(&self, source: &GeometrySource<'_>, dir: &Path) -> Result<Arc<RingIndex>> {
        if let Some(index) = self.rings.lock().get(dir) {
            return Ok(Arc::clone(index));
        }

        let mut index = RingIndex::new();
        for ring in source.tables.read_all(dir, "rng")? {
            let face = ring.get_or_null("face_id").as_i64();
            let start = ring.get_or_null("start_edge").as_i64();
            if let (Some(face), Some(start)) = (face, start) {
                index.entry(face).or_default().push(start);
            }
        }

        let index = Arc::new(index);
        self.rings.lock().insert(dir.to_path_buf(), Arc::clone(&index));
        Ok(index)
    }

    fn trace_ring(
        &self,
        source: &GeometrySource<'_>,
        dir: &Path,
        face: i64,
        start_edge: i64,
    ) -> Result<Vec<Point>> {
        let mut ring = Vec::new();
        let mut visited = AHashSet::new();
        let mut edge_id = start_edge;

        loop {
            if !visited.insert(edge_id) {
                return Err(VpfError::Geometry(format!(
                    "ring of face {} revisits edge {} before closing",
                    face, edge_id
                )));
            }
            let edge = source
                .tables
                .lookup(dir, "edg", "id", &Value::Integer(edge_id))?
                .ok_or_else(|| VpfError::Geometry(format!("edge {} not found", edge_id)))?;
            let points = edge
                .get("coordinates")
                .and_then(Value::as_coordinates)
                .unwrap_or(&[]);

            let right = edge.get_or_null("right_face").as_i64();
            let left = edge.get_or_null("left_face").as_i64();
            let next = if right == Some(face) {
                append_points(&mut ring, points.iter());
                edge.get_or_null("right_edge").as_i64()
            } else if left == Some(face) {
                append_points(&mut ring, points.iter().rev());
                edge.get_or_null("left_edge").as_i64()
            } else {
                return Err(VpfError::Geometry(format!(
                    "edge {} does not bound face {}",
                    edge_id, face
                )));
            };

            match next {
                Some(next) if next != start_edge => edge_id = next,
                _ => break,
            }
        }

        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last()) {
            if !first.same_xy(last) {
                ring.push(first);
            }
        }
        Ok(ring)
    }
}

impl GeometryFactory for AreaFactory {
    fn build(&self, source: &GeometrySource<'_>, row: &Row) -> Result<Option<Geometry>> {
        let Some(face) = row.get_or_null(source.key_column).as_i64() else {
            return Ok(None);
        };
        if face == UNIVERSE_FACE {
            return Ok(None);
        }

        let dir = source.primitive_dir(row);
        let index = self.ring_index(source, &dir)?;
        let Some(starts) = index.get(&face) else {
            return Ok(None);
        };

        let mut rings = Vec::with_capacity(starts.len());
        for &start in starts {
            let ring = self.trace_ring(source, &dir, face, start)?;
            if !ring.is_empty() {
                rings.push(ring);
            }
        }

        let mut rings = rings.into_iter();
        Ok(rings.next().map(|exterior| Geometry::Polygon {
            exterior,
            holes: rings.collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryKind;
    use crate::storage::testutil::TableWriter;
    use crate::storage::{ByteOrder, MemoryTable, TableContext, TableCursor, TableHeader};
    use crate::types::{Column, ColumnType, ElementCount, TripletId};

    fn triplet(id: i32) -> Value {
        Value::Triplet(TripletId::new(Some(id), None, None))
    }

    /// Unit square split into two edges around face 2
    fn write_square(dir: &Path) {
        TableWriter::new("Rings")
            .column("id", ColumnType::LongInteger, "1")
            .column("face_id", ColumnType::LongInteger, "1")
            .column("start_edge", ColumnType::LongInteger, "1")
            .row(vec![Value::Integer(1), Value::Integer(1), Value::Integer(1)])
            .row(vec![Value::Integer(2), Value::Integer(2), Value::Integer(1)])
            .write(dir, "rng")
            .unwrap();

        TableWriter::new("Edges")
            .column("id", ColumnType::LongInteger, "1")
            .column("right_face", ColumnType::TripletId, "1")
            .column("left_face", ColumnType::TripletId, "1")
            .column("right_edge", ColumnType::TripletId, "1")
            .column("left_edge", ColumnType::TripletId, "1")
            .column("coordinates", ColumnType::Coordinate2DFloat, "*")
            .row(vec![
                Value::Integer(1),
                triplet(2),
                triplet(1),
                triplet(2),
                triplet(2),
                Value::Coordinates(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)]),
            ])
            .row(vec![
                Value::Integer(2),
                triplet(1),
                triplet(2),
                triplet(1),
                triplet(1),
                Value::Coordinates(vec![Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 1.0)]),
            ])
            .write(dir, "edg")
            .unwrap();
    }

    fn feature_row(fac_id: Value) -> Row {
        let header = TableHeader::new(
            "lakea.aft",
            "Lakes",
            ByteOrder::LittleEndian,
            vec![
                Column::new("id", ColumnType::LongInteger, ElementCount::Fixed(1)),
                Column::new("fac_id", ColumnType::LongInteger, ElementCount::Fixed(1)),
            ],
        );
        let mut table = MemoryTable::from_values("lakea.aft", header, vec![vec![Value::Integer(1), fac_id]]);
        table.read_next().unwrap().unwrap()
    }

    #[test]
    fn test_trace_square() {
        let dir = tempfile::tempdir().unwrap();
        write_square(dir.path());
        let tables = TableContext::default();
        let source = GeometrySource {
            class_name: "lakea",
            key_column: GeometryKind::Area.foreign_key(),
            directory: dir.path(),
            tables: &tables,
            tile_map: None,
        };

        let geometry = AreaFactory::default()
            .build(&source, &feature_row(Value::Integer(2)))
            .unwrap()
            .unwrap();
        match geometry {
            Geometry::Polygon { exterior, holes } => {
                assert!(holes.is_empty());
                assert_eq!(exterior.len(), 5);
                assert!(exterior.first().unwrap().same_xy(exterior.last().unwrap()));
                assert!(exterior.contains(&Point::new(0.0, 1.0)));
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_universe_and_null_faces() {
        let dir = tempfile::tempdir().unwrap();
        write_square(dir.path());
        let tables = TableContext::default();
        let source = GeometrySource {
            class_name: "lakea",
            key_column: GeometryKind::Area.foreign_key(),
            directory: dir.path(),
            tables: &tables,
            tile_map: None,
        };
        let factory = AreaFactory::default();
        assert!(factory.build(&source, &feature_row(Value::Integer(1))).unwrap().is_none());
        assert!(factory.build(&source, &feature_row(Value::Null)).unwrap().is_none());
        assert!(factory.build(&source, &feature_row(Value::Integer(9))).unwrap().is_none());
    }
}
