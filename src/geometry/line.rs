//! Line features: `edg_id` -> edge coordinates

use super::{GeometryFactory, GeometryKind, GeometrySource};
use crate::error::Result;
use crate::types::{Geometry, Row, Value};

pub struct LineFactory;

impl GeometryFactory for LineFactory {
    fn build(&self, source: &GeometrySource<'_>, row: &Row) -> Result<Option<Geometry>> {
        let kind = GeometryKind::Line;
        let edge_id = row.get_or_null(source.key_column);
        if edge_id.is_null() {
            return Ok(None);
        }
        let Some(edge) = source.primitive(row, kind.table_name(), edge_id)? else {
            return Ok(None);
        };
        Ok(edge
            .get("coordinates")
            .and_then(Value::as_coordinates)
            .map(|points| Geometry::LineString(points.to_vec())))
    }
}
