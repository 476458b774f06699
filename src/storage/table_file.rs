//! On-disk table files
//!
//! `TableData` holds the raw bytes of one table (memory-mapped or buffered)
//! and is shared between cursors. Each `VpfTableFile` keeps its own read
//! position over that shared data.

use super::codec::{decode_row, ByteReader};
use super::cursor::TableCursor;
use super::header::TableHeader;
use crate::error::{Result, VpfError};
use crate::types::{JoinKey, Row, Value};
use ahash::AHashMap;
use memmap2::{Mmap, MmapOptions};
use parking_lot::Mutex;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

enum TableBytes {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Deref for TableBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            TableBytes::Mapped(m) => m,
            TableBytes::Buffered(b) => b,
        }
    }
}

/// First-occurrence offsets of each key value in one column
type KeyIndex = AHashMap<JoinKey, usize>;

/// Immutable contents of one table file
pub struct TableData {
    path: PathBuf,
    header: Arc<TableHeader>,
    bytes: TableBytes,
    data_start: usize,
    key_indexes: Mutex<AHashMap<usize, Arc<KeyIndex>>>,
}

impl TableData {
    pub fn load(path: &Path, memory_map: bool) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if len < 4 {
            return Err(VpfError::InvalidHeader {
                path: path.display().to_string(),
                reason: format!("file is {} bytes long", len),
            });
        }

        let bytes = if memory_map {
            // Table files are opened read-only and never modified by this crate
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            TableBytes::Mapped(mmap)
        } else {
            TableBytes::Buffered(std::fs::read(path)?)
        };

        let (header, data_start) = TableHeader::parse(&name, &bytes)
            .map_err(|e| e.with_path(&path.display().to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            header: Arc::new(header),
            bytes,
            data_start,
            key_indexes: Mutex::new(AHashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Arc<TableHeader> {
        &self.header
    }

    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Decode the row at `offset`; returns it with the offset of the next row
    fn decode_at(&self, offset: usize) -> Result<(Row, usize)> {
        let mut reader = ByteReader::new(&self.bytes, offset, self.header.byte_order);
        let values = decode_row(&self.header, &mut reader)?;
        Ok((Row::new(Arc::clone(&self.header), values), reader.position()))
    }

    pub fn rows(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut offset = self.data_start;
        while offset < self.bytes.len() {
            let (row, next) = self.decode_at(offset)?;
            rows.push(row);
            offset = next;
        }
        Ok(rows)
    }

    fn key_index(&self, column: usize) -> Result<Arc<KeyIndex>> {
        if let Some(index) = self.key_indexes.lock().get(&column) {
            return Ok(Arc::clone(index));
        }

        let mut index = KeyIndex::new();
        let mut offset = self.data_start;
        while offset < self.bytes.len() {
            let (row, next) = self.decode_at(offset)?;
            if let Some(key) = row.value(column).and_then(Value::join_key) {
                index.entry(key).or_insert(offset);
            }
            offset = next;
        }

        let index = Arc::new(index);
        self.key_indexes.lock().insert(column, Arc::clone(&index));
        Ok(index)
    }

    /// First row in file order whose `column` equals `key`
    pub fn first_match(&self, column: usize, key: &JoinKey) -> Result<Option<Row>> {
        let index = self.key_index(column)?;
        match index.get(key) {
            Some(&offset) => Ok(Some(self.decode_at(offset)?.0)),
            None => Ok(None),
        }
    }
}

/// Sequential cursor over a table file
pub struct VpfTableFile {
    data: Option<Arc<TableData>>,
    header: Arc<TableHeader>,
    path_name: String,
    offset: usize,
}

impl VpfTableFile {
    pub fn open(path: &Path, memory_map: bool) -> Result<Self> {
        Ok(Self::from_data(Arc::new(TableData::load(path, memory_map)?)))
    }

    pub fn from_data(data: Arc<TableData>) -> Self {
        Self {
            header: Arc::clone(data.header()),
            path_name: data.path().display().to_string(),
            offset: data.data_start,
            data: Some(data),
        }
    }

    fn data(&self) -> Result<&Arc<TableData>> {
        self.data
            .as_ref()
            .ok_or_else(|| VpfError::TableClosed(self.path_name.clone()))
    }
}

impl TableCursor for VpfTableFile {
    fn header(&self) -> &Arc<TableHeader> {
        &self.header
    }

    fn read_next(&mut self) -> Result<Option<Row>> {
        let data = Arc::clone(self.data()?);
        if self.offset >= data.len_bytes() {
            return Ok(None);
        }
        let (row, next) = data.decode_at(self.offset)?;
        self.offset = next;
        Ok(Some(row))
    }

    fn has_next(&self) -> bool {
        self.data
            .as_ref()
            .map_or(false, |data| self.offset < data.len_bytes())
    }

    fn reset(&mut self) -> Result<()> {
        self.offset = self.data()?.data_start;
        Ok(())
    }

    fn close(&mut self) {
        self.data = None;
    }

    fn is_closed(&self) -> bool {
        self.data.is_none()
    }

    fn row_by_id(&mut self, key_column: &str, id: &Value) -> Result<Option<Row>> {
        let column = self
            .header
            .column_index(key_column)
            .ok_or_else(|| VpfError::ColumnNotFound(format!("{}.{}", self.path_name, key_column)))?;
        match id.join_key() {
            Some(key) => self.data()?.first_match(column, &key),
            None => Ok(None),
        }
    }

    fn path_name(&self) -> &str {
        &self.path_name
    }

    fn read_all(&mut self) -> Result<Vec<Row>> {
        self.data()?.rows()
    }
}
