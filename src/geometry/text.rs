//! Annotation features: `txt_id` -> text string and its shape line

use super::{GeometryFactory, GeometryKind, GeometrySource};
use crate::error::Result;
use crate::types::{Geometry, Row, Value};

pub struct TextFactory;

impl GeometryFactory for TextFactory {
    fn build(&self, source: &GeometrySource<'_>, row: &Row) -> Result<Option<Geometry>> {
        let kind = GeometryKind::Text;
        let text_id = row.get_or_null(source.key_column);
        if text_id.is_null() {
            return Ok(None);
        }
        let Some(text_row) = source.primitive(row, kind.table_name(), text_id)? else {
            return Ok(None);
        };
        let Some(line) = text_row.get("shape_line").and_then(Value::as_coordinates) else {
            return Ok(None);
        };
        let text = text_row
            .get("string")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Some(Geometry::Text {
            text,
            line: line.to_vec(),
        }))
    }
}
