//! Tile map: tile id -> relative directory of that tile's primitives

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Rewrite a stored `\`-delimited path to a host path
pub fn normalize_tile_path(raw: &str) -> PathBuf {
    raw.trim()
        .split(['\\', '/'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileMap {
    tiles: BTreeMap<i64, PathBuf>,
}

impl TileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tile; `raw` is the path as stored in the tile reference table
    pub fn insert(&mut self, tile_id: i64, raw: &str) {
        self.tiles.insert(tile_id, normalize_tile_path(raw));
    }

    pub fn get(&self, tile_id: i64) -> Option<&Path> {
        self.tiles.get(&tile_id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &Path)> {
        self.tiles.iter().map(|(id, path)| (*id, path.as_path()))
    }
}
