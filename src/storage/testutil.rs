//! Test-only table writer used to build on-disk fixtures

use super::header::{ByteOrder, TableHeader};
use crate::error::Result;
use crate::types::{Column, ColumnType, ElementCount, Point, Value};
use std::path::{Path, PathBuf};

pub(crate) struct TableWriter {
    description: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl TableWriter {
    pub(crate) fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Add a column; `count` is an element count or `*`
    pub(crate) fn column(mut self, name: &str, column_type: ColumnType, count: &str) -> Self {
        let count = ElementCount::parse(count).expect("valid element count");
        self.columns.push(Column::new(name, column_type, count));
        self
    }

    pub(crate) fn row(mut self, values: Vec<Value>) -> Self {
        assert_eq!(values.len(), self.columns.len(), "row width must match columns");
        self.rows.push(values);
        self
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let header = TableHeader::new("", &self.description, ByteOrder::LittleEndian, self.columns.clone());
        let text = header.to_header_text();
        let mut bytes = (text.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(text.as_bytes());
        for row in &self.rows {
            for (column, value) in self.columns.iter().zip(row) {
                encode_value(column, value, &mut bytes);
            }
        }
        bytes
    }

    pub(crate) fn write(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        std::fs::write(&path, self.to_bytes())?;
        Ok(path)
    }
}

fn elements(value: &Value) -> Vec<&Value> {
    match value {
        Value::List(values) => values.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn write_count(column: &Column, count: usize, buf: &mut Vec<u8>) {
    if column.element_count == ElementCount::Variable {
        buf.extend_from_slice(&(count as i32).to_le_bytes());
    }
}

fn encode_value(column: &Column, value: &Value, buf: &mut Vec<u8>) {
    match column.column_type {
        ColumnType::NullField => {}
        ColumnType::Text
        | ColumnType::Level1Text
        | ColumnType::Level2Text
        | ColumnType::Level3Text
        | ColumnType::Date => {
            let text = value.as_str().unwrap_or("");
            let unit = if column.column_type == ColumnType::Date { 20 } else { 1 };
            match column.element_count {
                ElementCount::Fixed(n) => {
                    let width = n as usize * unit;
                    let mut bytes: Vec<u8> = text.bytes().take(width).collect();
                    bytes.resize(width, b' ');
                    buf.extend_from_slice(&bytes);
                }
                ElementCount::Variable => {
                    buf.extend_from_slice(&(text.len() as i32).to_le_bytes());
                    buf.extend_from_slice(text.as_bytes());
                }
            }
        }
        ColumnType::ShortInteger | ColumnType::LongInteger | ColumnType::ShortFloat | ColumnType::LongFloat => {
            let items = elements(value);
            let count = match column.element_count {
                ElementCount::Fixed(n) => n as usize,
                ElementCount::Variable => items.len(),
            };
            write_count(column, count, buf);
            for i in 0..count {
                let item = items.get(i).copied().unwrap_or(&Value::Null);
                match column.column_type {
                    ColumnType::ShortInteger => {
                        let v = item.as_i64().map_or(i16::MIN, |v| v as i16);
                        buf.extend_from_slice(&v.to_le_bytes());
                    }
                    ColumnType::LongInteger => {
                        let v = item.as_i64().map_or(i32::MIN, |v| v as i32);
                        buf.extend_from_slice(&v.to_le_bytes());
                    }
                    ColumnType::ShortFloat => {
                        let v = item.as_f64().map_or(f32::NAN, |v| v as f32);
                        buf.extend_from_slice(&v.to_le_bytes());
                    }
                    _ => {
                        let v = item.as_f64().unwrap_or(f64::NAN);
                        buf.extend_from_slice(&v.to_le_bytes());
                    }
                }
            }
        }
        ColumnType::Coordinate2DFloat
        | ColumnType::Coordinate3DFloat
        | ColumnType::Coordinate2DReal
        | ColumnType::Coordinate3DReal => {
            let points: &[Point] = value.as_coordinates().unwrap_or(&[]);
            let count = match column.element_count {
                ElementCount::Fixed(n) => n as usize,
                ElementCount::Variable => points.len(),
            };
            write_count(column, count, buf);
            for i in 0..count {
                let p = points.get(i).copied().unwrap_or(Point::new(0.0, 0.0));
                let z = p.z.unwrap_or(0.0);
                match column.column_type {
                    ColumnType::Coordinate2DFloat => {
                        buf.extend_from_slice(&(p.x as f32).to_le_bytes());
                        buf.extend_from_slice(&(p.y as f32).to_le_bytes());
                    }
                    ColumnType::Coordinate3DFloat => {
                        buf.extend_from_slice(&(p.x as f32).to_le_bytes());
                        buf.extend_from_slice(&(p.y as f32).to_le_bytes());
                        buf.extend_from_slice(&(z as f32).to_le_bytes());
                    }
                    ColumnType::Coordinate2DReal => {
                        buf.extend_from_slice(&p.x.to_le_bytes());
                        buf.extend_from_slice(&p.y.to_le_bytes());
                    }
                    _ => {
                        buf.extend_from_slice(&p.x.to_le_bytes());
                        buf.extend_from_slice(&p.y.to_le_bytes());
                        buf.extend_from_slice(&z.to_le_bytes());
                    }
                }
            }
        }
        ColumnType::TripletId => {
            let items = elements(value);
            let count = match column.element_count {
                ElementCount::Fixed(n) => n as usize,
                ElementCount::Variable => items.len(),
            };
            write_count(column, count, buf);
            for i in 0..count {
                let (id, tile, ext) = match items.get(i) {
                    Some(Value::Triplet(t)) => (t.id, t.tile_id, t.ext_id),
                    Some(other) => (other.as_i64().map(|v| v as i32), None, None),
                    None => (None, None, None),
                };
                let code = |part: Option<i32>| if part.is_some() { 3u8 } else { 0u8 };
                buf.push((code(id) << 6) | (code(tile) << 4) | (code(ext) << 2));
                for part in [id, tile, ext].into_iter().flatten() {
                    buf.extend_from_slice(&part.to_le_bytes());
                }
            }
        }
    }
}
