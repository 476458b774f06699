//! Column sets: one joined table of a feature class

use crate::geometry::GeometryKind;
use crate::storage::TableHeader;
use crate::types::Column;
use std::path::{Path, PathBuf};

/// Name of the single column a geometry table contributes to the schema
pub const GEOMETRY_COLUMN: &str = "geometry";

/// One table taking part in a feature class join
#[derive(Debug, Clone)]
pub struct ColumnSet {
    /// Table name as declared in the feature class schema table
    pub table_name: String,

    /// Resolved file path; `None` for geometry tables
    pub path: Option<PathBuf>,

    /// Declared columns in file order (empty for geometry tables)
    pub columns: Vec<Column>,

    /// Builder used for this table's geometry, when the name is a known primitive
    pub geometry_kind: Option<GeometryKind>,

    /// Single column standing in for a geometry table
    pub geometry_column: Option<Column>,
}

impl ColumnSet {
    /// Ordinary data table opened from `path`
    pub fn data(table_name: &str, path: &Path, header: &TableHeader) -> Self {
        Self {
            table_name: table_name.trim().to_string(),
            path: Some(path.to_path_buf()),
            columns: header.columns.clone(),
            geometry_kind: None,
            geometry_column: None,
        }
    }

    /// Geometry placeholder; `kind` is `None` for tables that merely failed to open
    pub fn geometry(table_name: &str, kind: Option<GeometryKind>) -> Self {
        Self {
            table_name: table_name.trim().to_string(),
            path: None,
            columns: Vec::new(),
            geometry_kind: kind,
            geometry_column: Some(Column::geometry(GEOMETRY_COLUMN)),
        }
    }

    pub fn is_geometry_table(&self) -> bool {
        self.geometry_column.is_some()
    }

    pub fn matches(&self, table_name: &str) -> bool {
        self.table_name.eq_ignore_ascii_case(table_name.trim())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}
