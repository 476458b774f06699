//! Table cursor abstraction
//!
//! A cursor gives sequential access to one table plus a first-match keyed
//! lookup. Cursors are single-owner and not shared across threads while a
//! pass is in flight.

use super::header::TableHeader;
use crate::error::{Result, VpfError};
use crate::types::{Column, Row, Value};
use std::sync::Arc;

pub trait TableCursor: Send {
    fn header(&self) -> &Arc<TableHeader>;

    fn column_count(&self) -> usize {
        self.header().column_count()
    }

    fn column_at(&self, index: usize) -> Option<&Column> {
        self.header().column_at(index)
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.header().column(name)
    }

    /// Next row in physical order, `None` at the end
    fn read_next(&mut self) -> Result<Option<Row>>;

    fn has_next(&self) -> bool;

    /// Rewind to the first row
    fn reset(&mut self) -> Result<()>;

    /// Release the underlying data; further reads fail with `TableClosed`
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// First row in physical order whose `key_column` equals `id`.
    /// The cursor position is left untouched.
    fn row_by_id(&mut self, key_column: &str, id: &Value) -> Result<Option<Row>>;

    fn path_name(&self) -> &str;

    /// Every row of the table, in physical order
    fn read_all(&mut self) -> Result<Vec<Row>>;
}

/// Fully buffered table
pub struct MemoryTable {
    path_name: String,
    header: Arc<TableHeader>,
    rows: Option<Arc<[Row]>>,
    position: usize,
}

impl MemoryTable {
    pub fn new(path_name: impl Into<String>, header: Arc<TableHeader>, rows: Vec<Row>) -> Self {
        Self {
            path_name: path_name.into(),
            header,
            rows: Some(rows.into()),
            position: 0,
        }
    }

    /// Build rows from raw value vectors
    pub fn from_values(
        path_name: impl Into<String>,
        header: TableHeader,
        values: Vec<Vec<Value>>,
    ) -> Self {
        let header = Arc::new(header);
        let rows = values
            .into_iter()
            .map(|v| Row::new(Arc::clone(&header), v))
            .collect();
        Self::new(path_name, header, rows)
    }

    fn rows(&self) -> Result<&Arc<[Row]>> {
        self.rows
            .as_ref()
            .ok_or_else(|| VpfError::TableClosed(self.path_name.clone()))
    }

    pub fn len(&self) -> usize {
        self.rows.as_ref().map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TableCursor for MemoryTable {
    fn header(&self) -> &Arc<TableHeader> {
        &self.header
    }

    fn read_next(&mut self) -> Result<Option<Row>> {
        let row = self.rows()?.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn has_next(&self) -> bool {
        self.position < self.len()
    }

    fn reset(&mut self) -> Result<()> {
        self.rows()?;
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.rows = None;
    }

    fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    fn row_by_id(&mut self, key_column: &str, id: &Value) -> Result<Option<Row>> {
        let idx = self
            .header
            .column_index(key_column)
            .ok_or_else(|| VpfError::ColumnNotFound(format!("{}.{}", self.path_name, key_column)))?;
        let Some(key) = id.join_key() else {
            return Ok(None);
        };
        Ok(self
            .rows()?
            .iter()
            .find(|row| row.value(idx).and_then(Value::join_key).as_ref() == Some(&key))
            .cloned())
    }

    fn path_name(&self) -> &str {
        &self.path_name
    }

    fn read_all(&mut self) -> Result<Vec<Row>> {
        Ok(self.rows()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ByteOrder;
    use crate::types::{ColumnType, ElementCount};

    fn table() -> MemoryTable {
        let header = TableHeader::new(
            "rdt",
            "roads",
            ByteOrder::LittleEndian,
            vec![
                Column::new("id", ColumnType::LongInteger, ElementCount::Fixed(1)),
                Column::new("k", ColumnType::LongInteger, ElementCount::Fixed(1)),
            ],
        );
        MemoryTable::from_values(
            "rdt",
            header,
            vec![
                vec![Value::Integer(1), Value::Integer(10)],
                vec![Value::Integer(2), Value::Integer(10)],
                vec![Value::Integer(3), Value::Integer(11)],
            ],
        )
    }

    #[test]
    fn test_sequential_and_reset() {
        let mut t = table();
        let mut ids = Vec::new();
        while t.has_next() {
            ids.push(t.read_next().unwrap().unwrap().id().unwrap());
        }
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(t.read_next().unwrap().is_none());

        t.reset().unwrap();
        assert_eq!(t.read_next().unwrap().unwrap().id(), Some(1));
    }

    #[test]
    fn test_row_by_id_first_match() {
        let mut t = table();
        let row = t.row_by_id("k", &Value::Integer(10)).unwrap().unwrap();
        assert_eq!(row.id(), Some(1));
        assert!(t.row_by_id("k", &Value::Integer(99)).unwrap().is_none());
        assert!(t.row_by_id("k", &Value::Null).unwrap().is_none());
        assert!(matches!(
            t.row_by_id("missing", &Value::Integer(1)),
            Err(VpfError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_closed_table() {
        let mut t = table();
        t.close();
        assert!(t.is_closed());
        assert!(!t.has_next());
        assert!(matches!(t.read_next(), Err(VpfError::TableClosed(_))));
    }
}
