//! Database Core - VpfDatabase structure and open
//!
//! This module contains:
//! - VpfDatabase struct definition
//! - open() / open_with_config() / open_with_factories()
//! - Aggregate lookups over libraries, coverages and feature types

use super::library::Library;
use crate::catalog::{ClassContext, FeatureClass, FeatureType};
use crate::config::VpfConfig;
use crate::error::{Result, VpfError};
use crate::geometry::GeometryFactories;
use crate::storage::TableContext;
use crate::types::{BoundingBox, Row, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Library attribute table
pub const LAT_TABLE: &str = "lat";
/// Database header table
pub const DHT_TABLE: &str = "dht";

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub libraries: usize,
    pub coverages: usize,
    pub feature_classes: usize,
    pub feature_types: usize,
    /// Tables currently held by the table context
    pub cached_tables: usize,
}

/// An opened database directory
#[derive(Debug)]
pub struct VpfDatabase {
    /// Database directory
    path: PathBuf,

    /// Name from the database header table, when present
    name: Option<String>,

    description: Option<String>,

    /// Libraries whose directories exist, in attribute table order
    libraries: Vec<Library>,

    /// Shared table data for every library of this database
    tables: Arc<TableContext>,

    config: VpfConfig,
}

impl VpfDatabase {
    /// Open with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, VpfConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: VpfConfig) -> Result<Self> {
        Self::open_with_factories(path, config, GeometryFactories::default())
    }

    /// Open with custom geometry factories
    pub fn open_with_factories<P: AsRef<Path>>(
        path: P,
        config: VpfConfig,
        factories: GeometryFactories,
    ) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(VpfError::DirectoryMissing(path.to_path_buf()));
        }

        let tables = Arc::new(TableContext::new(&config));
        let context = ClassContext::new(Arc::clone(&tables), &config).with_factories(factories);

        let (name, description) = match tables.read_all(path, DHT_TABLE) {
            Ok(rows) => {
                let first = rows.first();
                (text(first, "database_name"), text(first, "database_desc"))
            }
            Err(e) => {
                debug!(database = %path.display(), error = %e, "No database header table");
                (None, None)
            }
        };

        let rows = tables.read_all(path, LAT_TABLE).map_err(|e| {
            VpfError::SchemaBuild(format!(
                "library attribute table of {} cannot be read: {}",
                path.display(),
                e
            ))
        })?;

        let mut libraries = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(library_name) = text(Some(row), "library_name") else {
                continue;
            };
            match Library::open(path, &library_name, bounds(row), &context) {
                Ok(library) => libraries.push(library),
                Err(VpfError::DirectoryMissing(dir)) => {
                    warn!(library = %library_name, directory = %dir.display(), "Library directory missing, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            database = %path.display(),
            libraries = libraries.len(),
            "Opened database"
        );

        Ok(Self {
            path: path.to_path_buf(),
            name,
            description,
            libraries,
            tables,
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn config(&self) -> &VpfConfig {
        &self.config
    }

    pub fn table_context(&self) -> &Arc<TableContext> {
        &self.tables
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn library(&self, name: &str) -> Option<&Library> {
        self.libraries
            .iter()
            .find(|l| l.name().eq_ignore_ascii_case(name))
    }

    /// Union of the library bounding boxes
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.libraries
            .iter()
            .filter_map(Library::bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    pub fn feature_types(&self) -> impl Iterator<Item = &FeatureType> {
        self.libraries.iter().flat_map(Library::feature_types)
    }

    pub fn feature_classes(&self) -> impl Iterator<Item = &Arc<FeatureClass>> {
        self.libraries
            .iter()
            .flat_map(Library::coverages)
            .flat_map(|c| c.feature_classes())
    }

    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            libraries: self.libraries.len(),
            coverages: self.libraries.iter().map(|l| l.coverages().len()).sum(),
            feature_classes: self.feature_classes().count(),
            feature_types: self.feature_types().count(),
            cached_tables: self.tables.cached_tables(),
        }
    }

    /// Close every feature class and drop cached table data
    pub fn close(&self) {
        for library in &self.libraries {
            library.close();
        }
        self.tables.clear();
        debug!(database = %self.path.display(), "Closed database");
    }
}

fn text(row: Option<&Row>, column: &str) -> Option<String> {
    row?.get(column)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

/// `xmin`, `ymin`, `xmax`, `ymax` of a library attribute row
fn bounds(row: &Row) -> Option<BoundingBox> {
    let coordinate = |name: &str| row.get(name).and_then(Value::as_f64);
    Some(BoundingBox::new(
        coordinate("xmin")?,
        coordinate("ymin")?,
        coordinate("xmax")?,
        coordinate("ymax")?,
    ))
}
