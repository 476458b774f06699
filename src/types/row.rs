//! One decoded table row, addressable by position or column name

use crate::storage::TableHeader;
use crate::types::{Column, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Row {
    header: Arc<TableHeader>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(header: Arc<TableHeader>, values: Vec<Value>) -> Self {
        debug_assert_eq!(header.columns.len(), values.len());
        Self { header, values }
    }

    pub fn header(&self) -> &Arc<TableHeader> {
        &self.header
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the named column (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.header
            .column_index(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Value of the named column, treating a missing column as null
    pub fn get_or_null(&self, name: &str) -> &Value {
        self.get(name).unwrap_or(&Value::Null)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.header.column(name)
    }

    /// Row identifier from the `id` column, when present and not null
    pub fn id(&self) -> Option<i64> {
        self.get("id").and_then(Value::as_i64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
