//! Assembled features

use super::schema::FeatureSchema;
use crate::types::{BoundingBox, Geometry, Value};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Feature identifier: the primary row's `id`, or a generated token when absent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FeatureId {
    Row(i64),
    Synthetic(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Row(id) => write!(f, "{}", id),
            FeatureId::Synthetic(token) => f.write_str(token),
        }
    }
}

/// One feature: values in schema order plus an optional geometry
#[derive(Debug, Clone)]
pub struct Feature {
    id: FeatureId,
    values: Vec<Value>,
    schema: Arc<FeatureSchema>,
}

impl Feature {
    pub fn new(id: FeatureId, schema: Arc<FeatureSchema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { id, values, schema }
    }

    pub fn id(&self) -> &FeatureId {
        &self.id
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the named attribute, resolved through the schema
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.schema
            .geometry_index()
            .and_then(|i| self.values.get(i))
            .and_then(Value::as_geometry)
    }

    /// Attach a geometry to the schema's geometry column; ignored without one
    pub(crate) fn set_geometry(&mut self, geometry: Geometry) {
        if let Some(slot) = self.schema.geometry_index().and_then(|i| self.values.get_mut(i)) {
            *slot = Value::Geometry(geometry);
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry().and_then(Geometry::bounding_box)
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.values == other.values
    }
}

/// GeoJSON-like: `{"type": "Feature", "id", "properties", "geometry"}`
impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Properties<'a>(&'a Feature);

        impl Serialize for Properties<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let feature = self.0;
                let geometry = feature.schema.geometry_index();
                let mut map = serializer.serialize_map(None)?;
                for (i, (column, value)) in feature.schema.columns().iter().zip(&feature.values).enumerate() {
                    if Some(i) != geometry {
                        map.serialize_entry(column.name(), value)?;
                    }
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("type", "Feature")?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("properties", &Properties(self))?;
        map.serialize_entry("geometry", &self.geometry())?;
        map.end()
    }
}
