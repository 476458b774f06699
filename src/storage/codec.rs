//! Row decoding
//!
//! Fixed-count values are stored back to back; variable-count (`*`) values
//! are prefixed by a 4-byte element count. Integers use `MIN` as the null
//! sentinel, floats use NaN, text and dates are null when blank.

use super::header::{ByteOrder, TableHeader};
use crate::error::{Result, VpfError};
use crate::types::{Column, ColumnType, ElementCount, Point, TripletId, Value};

/// Cursor over raw table bytes
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8], pos: usize, order: ByteOrder) -> Self {
        Self { data, pos, order }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(VpfError::InvalidData(format!(
                "unexpected end of table at byte {} (needed {} more)",
                self.pos, n
            ))),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn i16(&mut self) -> Result<i16> {
        let b = self.array::<2>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => i16::from_le_bytes(b),
            ByteOrder::BigEndian => i16::from_be_bytes(b),
        })
    }

    fn i32(&mut self) -> Result<i32> {
        let b = self.array::<4>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => i32::from_le_bytes(b),
            ByteOrder::BigEndian => i32::from_be_bytes(b),
        })
    }

    fn f32(&mut self) -> Result<f32> {
        let b = self.array::<4>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => f32::from_le_bytes(b),
            ByteOrder::BigEndian => f32::from_be_bytes(b),
        })
    }

    fn f64(&mut self) -> Result<f64> {
        let b = self.array::<8>()?;
        Ok(match self.order {
            ByteOrder::LittleEndian => f64::from_le_bytes(b),
            ByteOrder::BigEndian => f64::from_be_bytes(b),
        })
    }
}

/// Decode one row starting at the reader's position
pub(crate) fn decode_row(header: &TableHeader, reader: &mut ByteReader<'_>) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(header.columns.len());
    for column in &header.columns {
        let value = decode_value(column, reader).map_err(|e| match e {
            VpfError::InvalidData(reason) => VpfError::InvalidData(format!(
                "{} column '{}': {}",
                header.name, column.name, reason
            )),
            other => other,
        })?;
        values.push(value);
    }
    Ok(values)
}

fn element_count(column: &Column, reader: &mut ByteReader<'_>) -> Result<usize> {
    match column.element_count {
        ElementCount::Fixed(n) => Ok(n as usize),
        ElementCount::Variable => {
            let n = reader.i32()?;
            usize::try_from(n)
                .map_err(|_| VpfError::InvalidData(format!("negative element count {}", n)))
        }
    }
}

fn scalar_or_list(mut values: Vec<Value>) -> Value {
    match values.len() {
        0 => Value::Null,
        1 => values.pop().unwrap_or(Value::Null),
        _ => Value::List(values),
    }
}

fn decode_text(bytes: &[u8], column_type: ColumnType) -> Option<String> {
    let text = match column_type {
        ColumnType::Level2Text | ColumnType::Level3Text => String::from_utf8_lossy(bytes).into_owned(),
        _ => bytes.iter().map(|&b| b as char).collect(),
    };
    let trimmed = text.trim_end_matches(|c: char| c == ' ' || c == '\0');
    if trimmed.trim().is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn triplet_part(reader: &mut ByteReader<'_>, code: u8) -> Result<Option<i32>> {
    Ok(match code & 0b11 {
        0 => None,
        1 => Some(reader.u8()? as i32),
        2 => Some(reader.i16()? as i32),
        _ => Some(reader.i32()?),
    })
}

fn decode_value(column: &Column, reader: &mut ByteReader<'_>) -> Result<Value> {
    if column.column_type == ColumnType::NullField {
        return Ok(Value::Null);
    }
    let count = element_count(column, reader)?;
    // Triplets are at least one type byte each
    let min_width = column.column_type.width().unwrap_or(1);
    let needed = count.checked_mul(min_width);
    if needed.map_or(true, |n| n > reader.remaining()) {
        return Err(VpfError::InvalidData(format!(
            "element count {} exceeds the {} bytes left in the table",
            count,
            reader.remaining()
        )));
    }

    let value = match column.column_type {
        ColumnType::Text
        | ColumnType::Level1Text
        | ColumnType::Level2Text
        | ColumnType::Level3Text => {
            let bytes = reader.take(count)?;
            decode_text(bytes, column.column_type).map_or(Value::Null, Value::Text)
        }
        ColumnType::Date => {
            let bytes = reader.take(20 * count)?;
            decode_text(bytes, ColumnType::Text).map_or(Value::Null, Value::Date)
        }
        ColumnType::ShortInteger => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let v = reader.i16()?;
                values.push(if v == i16::MIN { Value::Null } else { Value::Integer(v as i64) });
            }
            scalar_or_list(values)
        }
        ColumnType::LongInteger => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let v = reader.i32()?;
                values.push(if v == i32::MIN { Value::Null } else { Value::Integer(v as i64) });
            }
            scalar_or_list(values)
        }
        ColumnType::ShortFloat => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let v = reader.f32()?;
                values.push(if v.is_nan() { Value::Null } else { Value::Float(v as f64) });
            }
            scalar_or_list(values)
        }
        ColumnType::LongFloat => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let v = reader.f64()?;
                values.push(if v.is_nan() { Value::Null } else { Value::Float(v) });
            }
            scalar_or_list(values)
        }
        ColumnType::Coordinate2DFloat => {
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                let x = reader.f32()? as f64;
                let y = reader.f32()? as f64;
                points.push(Point::new(x, y));
            }
            coordinates(points)
        }
        ColumnType::Coordinate3DFloat => {
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                let x = reader.f32()? as f64;
                let y = reader.f32()? as f64;
                let z = reader.f32()? as f64;
                points.push(Point::new_3d(x, y, z));
            }
            coordinates(points)
        }
        ColumnType::Coordinate2DReal => {
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                let x = reader.f64()?;
                let y = reader.f64()?;
                points.push(Point::new(x, y));
            }
            coordinates(points)
        }
        ColumnType::Coordinate3DReal => {
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                let x = reader.f64()?;
                let y = reader.f64()?;
                let z = reader.f64()?;
                points.push(Point::new_3d(x, y, z));
            }
            coordinates(points)
        }
        ColumnType::TripletId => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let kind = reader.u8()?;
                let id = triplet_part(reader, kind >> 6)?;
                let tile_id = triplet_part(reader, kind >> 4)?;
                let ext_id = triplet_part(reader, kind >> 2)?;
                let triplet = TripletId::new(id, tile_id, ext_id);
                values.push(if triplet.is_empty() { Value::Null } else { Value::Triplet(triplet) });
            }
            scalar_or_list(values)
        }
        ColumnType::NullField => Value::Null,
    };
    Ok(value)
}

fn coordinates(points: Vec<Point>) -> Value {
    if points.is_empty() {
        Value::Null
    } else {
        Value::Coordinates(points)
    }
}
