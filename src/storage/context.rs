//! Table context
//!
//! Owns the path -> table data map shared by every library, coverage and
//! feature class opened from one database. Table data is immutable once
//! loaded, so each `open` hands out an independent cursor over shared bytes.
//!
//! ## Features
//! - LRU-bounded cache of loaded tables
//! - Case-insensitive resolution of table and directory names
//! - Keyed first-match lookups for geometry builders

use super::cursor::TableCursor;
use super::table_file::{TableData, VpfTableFile};
use crate::config::VpfConfig;
use crate::error::{Result, VpfError};
use crate::types::{Row, Value};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Find `name` inside `dir`, ignoring ASCII case
pub fn resolve_path(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.exists() {
        return Some(exact);
    }
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|entry| entry.path())
}

pub struct TableContext {
    tables: Mutex<LruCache<PathBuf, Arc<TableData>>>,
    memory_map: bool,
}

impl TableContext {
    pub fn new(config: &VpfConfig) -> Self {
        let capacity = NonZeroUsize::new(config.table_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            tables: Mutex::new(LruCache::new(capacity)),
            memory_map: config.memory_map,
        }
    }

    /// Loaded table data for `path`, reading it on first use
    pub fn table_data(&self, path: &Path) -> Result<Arc<TableData>> {
        if let Some(data) = self.tables.lock().get(path) {
            return Ok(Arc::clone(data));
        }

        // Load outside the lock; a racing loader simply replaces the entry
        let data = Arc::new(TableData::load(path, self.memory_map)?);
        debug!(table = %path.display(), columns = data.header().column_count(), "Loaded table");
        self.tables.lock().put(path.to_path_buf(), Arc::clone(&data));
        Ok(data)
    }

    /// Fresh cursor over the table at `path`
    pub fn open(&self, path: &Path) -> Result<Box<dyn TableCursor>> {
        let data = self.table_data(path)?;
        Ok(Box::new(VpfTableFile::from_data(data)))
    }

    /// Resolve `name` in `dir` and open it
    pub fn open_in(&self, dir: &Path, name: &str) -> Result<Box<dyn TableCursor>> {
        let path = resolve_path(dir, name).ok_or_else(|| VpfError::TableNotFound(dir.join(name)))?;
        self.open(&path)
    }

    /// All rows of `dir/name`
    pub fn read_all(&self, dir: &Path, name: &str) -> Result<Vec<Row>> {
        self.open_in(dir, name)?.read_all()
    }

    /// First row of `dir/name` whose `key_column` equals `key`
    pub fn lookup(&self, dir: &Path, name: &str, key_column: &str, key: &Value) -> Result<Option<Row>> {
        self.open_in(dir, name)?.row_by_id(key_column, key)
    }

    pub fn cached_tables(&self) -> usize {
        self.tables.lock().len()
    }

    /// Drop every cached table; open cursors keep their data alive
    pub fn clear(&self) {
        self.tables.lock().clear();
    }
}

impl std::fmt::Debug for TableContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableContext")
            .field("cached_tables", &self.cached_tables())
            .field("memory_map", &self.memory_map)
            .finish()
    }
}

impl Default for TableContext {
    fn default() -> Self {
        Self::new(&VpfConfig::default())
    }
}
