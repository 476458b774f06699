//! Geometry construction from primitive tables
//!
//! A feature class whose schema joins a primitive table (edges, faces,
//! nodes, text) gets its geometry from a `GeometryFactory`. The kind is
//! resolved once, from the primitive table name, when the schema is built.

mod area;
mod line;
mod node;
mod text;

pub use area::AreaFactory;
pub use line::LineFactory;
pub use node::NodeFactory;
pub use text::TextFactory;

use crate::database::TileMap;
use crate::error::Result;
use crate::storage::TableContext;
use crate::types::{Geometry, Point, Row, Value};
use ahash::AHashMap;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Primitive geometry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GeometryKind {
    Line,
    Area,
    ConnectedNode,
    EntityNode,
    Text,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 5] = [
        GeometryKind::Line,
        GeometryKind::Area,
        GeometryKind::ConnectedNode,
        GeometryKind::EntityNode,
        GeometryKind::Text,
    ];

    /// Kind for a primitive table name (case-insensitive)
    pub fn from_table_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.table_name().eq_ignore_ascii_case(name))
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            GeometryKind::Line => "edg",
            GeometryKind::Area => "fac",
            GeometryKind::ConnectedNode => "cnd",
            GeometryKind::EntityNode => "end",
            GeometryKind::Text => "txt",
        }
    }

    /// Conventional column of a feature table pointing at this primitive
    pub fn foreign_key(&self) -> &'static str {
        match self {
            GeometryKind::Line => "edg_id",
            GeometryKind::Area => "fac_id",
            GeometryKind::ConnectedNode => "cnd_id",
            GeometryKind::EntityNode => "end_id",
            GeometryKind::Text => "txt_id",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryKind::Line => "line",
            GeometryKind::Area => "area",
            GeometryKind::ConnectedNode => "connected node",
            GeometryKind::EntityNode => "entity node",
            GeometryKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// What a factory sees of the feature class it builds for
pub struct GeometrySource<'a> {
    pub class_name: &'a str,
    /// Column of the feature row that references the primitive
    pub key_column: &'a str,
    pub directory: &'a Path,
    pub tables: &'a TableContext,
    pub tile_map: Option<&'a TileMap>,
}

impl<'a> GeometrySource<'a> {
    /// Directory holding the primitives for `row`, following its `tile_id` when tiled
    pub fn primitive_dir(&self, row: &Row) -> PathBuf {
        let tile = row.get("tile_id").and_then(Value::as_i64);
        match (tile, self.tile_map) {
            (Some(tile_id), Some(tiles)) => match tiles.get(tile_id) {
                Some(rel) => self.directory.join(rel),
                None => self.directory.to_path_buf(),
            },
            _ => self.directory.to_path_buf(),
        }
    }

    /// Primitive row with `id == key` from `table`, next to `row`'s tile
    pub fn primitive(&self, row: &Row, table: &str, key: &Value) -> Result<Option<Row>> {
        self.tables.lookup(&self.primitive_dir(row), table, "id", key)
    }
}

/// Builds a geometry from the feature table row that references a primitive
pub trait GeometryFactory: Send + Sync {
    /// `Ok(None)` when the row references no primitive
    fn build(&self, source: &GeometrySource<'_>, row: &Row) -> Result<Option<Geometry>>;
}

/// Factory per geometry kind
#[derive(Clone)]
pub struct GeometryFactories {
    factories: AHashMap<GeometryKind, Arc<dyn GeometryFactory>>,
}

impl GeometryFactories {
    pub fn empty() -> Self {
        Self {
            factories: AHashMap::new(),
        }
    }

    pub fn with_factory(mut self, kind: GeometryKind, factory: Arc<dyn GeometryFactory>) -> Self {
        self.factories.insert(kind, factory);
        self
    }

    pub fn get(&self, kind: GeometryKind) -> Option<&Arc<dyn GeometryFactory>> {
        self.factories.get(&kind)
    }
}

impl Default for GeometryFactories {
    fn default() -> Self {
        Self::empty()
            .with_factory(GeometryKind::Line, Arc::new(LineFactory))
            .with_factory(GeometryKind::Area, Arc::new(AreaFactory::default()))
            .with_factory(GeometryKind::ConnectedNode, Arc::new(NodeFactory::connected()))
            .with_factory(GeometryKind::EntityNode, Arc::new(NodeFactory::entity()))
            .with_factory(GeometryKind::Text, Arc::new(TextFactory))
    }
}

/// Append `points` to `ring`, dropping a repeated joint vertex
pub(crate) fn append_points<'p>(ring: &mut Vec<Point>, points: impl Iterator<Item = &'p Point>) {
    for p in points {
        if ring.last().map_or(true, |last| !last.same_xy(p)) {
            ring.push(*p);
        }
    }
}
