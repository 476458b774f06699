//! Value types shared by the table codec and the feature assembler

mod column;
mod row;
mod spatial;

pub use column::{Column, ColumnType, ElementCount, KeyType, SemanticType};
pub use row::Row;
pub use spatial::{BoundingBox, Geometry, Point};

use serde::Serialize;
use std::fmt;

/// Triplet id: row id, tile id and external id, each optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TripletId {
    pub id: Option<i32>,
    pub tile_id: Option<i32>,
    pub ext_id: Option<i32>,
}

impl TripletId {
    pub fn new(id: Option<i32>, tile_id: Option<i32>, ext_id: Option<i32>) -> Self {
        Self { id, tile_id, ext_id }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.tile_id.is_none() && self.ext_id.is_none()
    }
}

/// A decoded attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Date kept in its stored 20-character form
    Date(String),
    Coordinates(Vec<Point>),
    Triplet(TripletId),
    /// Multi-element numeric value
    List(Vec<Value>),
    Geometry(Geometry),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view; triplets yield their row id, integral floats convert
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Value::Triplet(t) => t.id.map(i64::from),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Date(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_coordinates(&self) -> Option<&[Point]> {
        match self {
            Value::Coordinates(points) => Some(points.as_slice()),
            _ => None,
        }
    }

    pub fn as_triplet(&self) -> Option<&TripletId> {
        match self {
            Value::Triplet(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None,
        }
    }

    /// Key used for equality joins, `None` for null or unjoinable values
    pub fn join_key(&self) -> Option<JoinKey> {
        JoinKey::from_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) | Value::Date(s) => f.write_str(s),
            Value::Coordinates(points) => write!(f, "<{} coordinates>", points.len()),
            Value::Triplet(t) => write!(f, "({:?}, {:?}, {:?})", t.id, t.tile_id, t.ext_id),
            Value::List(values) => write!(f, "<{} values>", values.len()),
            Value::Geometry(g) => write!(f, "<{}>", g.kind_name()),
            Value::Null => f.write_str("null"),
        }
    }
}

/// Hashable join key; values compare by content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinKey {
    Integer(i64),
    Text(String),
}

impl JoinKey {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(JoinKey::Integer(*i)),
            Value::Float(_) | Value::Triplet(_) => value.as_i64().map(JoinKey::Integer),
            Value::Text(s) => Some(JoinKey::Text(s.trim().to_string())),
            _ => None,
        }
    }
}
