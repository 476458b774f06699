//! Point features: `cnd_id` / `end_id` -> node coordinate

use super::{GeometryFactory, GeometryKind, GeometrySource};
use crate::error::Result;
use crate::types::{Geometry, Row, Value};

pub struct NodeFactory {
    kind: GeometryKind,
}

impl NodeFactory {
    pub fn connected() -> Self {
        Self {
            kind: GeometryKind::ConnectedNode,
        }
    }

    pub fn entity() -> Self {
        Self {
            kind: GeometryKind::EntityNode,
        }
    }
}

impl GeometryFactory for NodeFactory {
    fn build(&self, source: &GeometrySource<'_>, row: &Row) -> Result<Option<Geometry>> {
        let node_id = row.get_or_null(source.key_column);
        if node_id.is_null() {
            return Ok(None);
        }
        let Some(node) = source.primitive(row, self.kind.table_name(), node_id)? else {
            return Ok(None);
        };
        Ok(node
            .get("coordinate")
            .and_then(Value::as_coordinates)
            .and_then(|points| points.first())
            .map(|p| Geometry::Point(*p)))
    }
}
