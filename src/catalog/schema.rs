//! Merged feature schema
//!
//! Built once per feature class by walking its column sets in registration
//! order. Every column set after the first drops its `id` column, and the
//! first geometry table contributes the single geometry column.

use super::column_set::ColumnSet;
use crate::types::Column;
use ahash::AHashMap;
use serde::Serialize;

/// A schema column and the table it comes from
#[derive(Debug, Clone, Serialize)]
pub struct SchemaColumn {
    pub table: String,
    pub column: Column,
    /// Column set the value is read from
    #[serde(skip)]
    pub(crate) set: usize,
    /// Position in that column set's rows; `None` for the geometry column
    #[serde(skip)]
    pub(crate) source: Option<usize>,
}

impl SchemaColumn {
    pub fn name(&self) -> &str {
        &self.column.name
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureSchema {
    columns: Vec<SchemaColumn>,
    #[serde(skip)]
    index: AHashMap<String, usize>,
    geometry: Option<usize>,
}

impl FeatureSchema {
    pub fn build(column_sets: &[ColumnSet]) -> Self {
        let mut columns = Vec::new();
        let mut geometry = None;

        for (set, column_set) in column_sets.iter().enumerate() {
            if let Some(column) = &column_set.geometry_column {
                if geometry.is_none() {
                    geometry = Some(columns.len());
                    columns.push(SchemaColumn {
                        table: column_set.table_name.clone(),
                        column: column.clone(),
                        set,
                        source: None,
                    });
                }
                continue;
            }

            for (position, column) in column_set.columns.iter().enumerate() {
                if set > 0 && column.is_id() {
                    continue;
                }
                columns.push(SchemaColumn {
                    table: column_set.table_name.clone(),
                    column: column.clone(),
                    set,
                    source: Some(position),
                });
            }
        }

        let mut index = AHashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            index.entry(column.name().to_ascii_lowercase()).or_insert(i);
        }

        Self {
            columns,
            index,
            geometry,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&SchemaColumn> {
        self.columns.get(index)
    }

    /// Position of the first column named `name` (case-insensitive)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Position of `column` from `table`, for names shared by several tables
    pub fn qualified_index(&self, table: &str, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| {
            c.table.eq_ignore_ascii_case(table) && c.name().eq_ignore_ascii_case(column)
        })
    }

    pub fn geometry_index(&self) -> Option<usize> {
        self.geometry
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(SchemaColumn::name)
    }
}
