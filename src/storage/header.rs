//! Table header parsing
//!
//! A table file starts with a 4-byte header length followed by the header
//! text:
//!
//! ```text
//! L;Road attribute table;-;id=I,1,P,Row Id,-,-,-,:f_code=T,5,N,FACC,char.vdt,-,-,:;
//! ```
//!
//! The first character is the byte order marker (`L` little endian, `M` big
//! endian). Rows start right after the header.

use crate::error::{Result, VpfError};
use crate::types::{Column, ColumnType, ElementCount, KeyType};
use ahash::AHashMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    pub fn marker(&self) -> char {
        match self {
            ByteOrder::LittleEndian => 'L',
            ByteOrder::BigEndian => 'M',
        }
    }
}

/// Parsed table header
#[derive(Debug, Clone)]
pub struct TableHeader {
    /// File name the header was read from
    pub name: String,
    pub description: String,
    pub narrative_table: Option<String>,
    pub byte_order: ByteOrder,
    pub columns: Vec<Column>,
    /// Lowercased column name -> position
    index: AHashMap<String, usize>,
}

fn optional_field(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && *s != "-")
        .map(str::to_string)
}

impl TableHeader {
    pub fn new(name: &str, description: &str, byte_order: ByteOrder, columns: Vec<Column>) -> Self {
        let mut index = AHashMap::with_capacity(columns.len());
        for (pos, col) in columns.iter().enumerate() {
            index.entry(col.name.clone()).or_insert(pos);
        }
        Self {
            name: name.to_string(),
            description: description.to_string(),
            narrative_table: None,
            byte_order,
            columns,
            index,
        }
    }

    /// Parse the header at the start of `bytes`; returns the header and the offset of the first row
    pub fn parse(name: &str, bytes: &[u8]) -> Result<(Self, usize)> {
        Self::parse_inner(name, bytes).map_err(|e| e.with_path(name))
    }

    fn parse_inner(name: &str, bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 4 {
            return Err(VpfError::header("file shorter than header length field"));
        }
        let len_bytes = [bytes[0], bytes[1], bytes[2], bytes[3]];
        // A marker byte only counts when a ';' follows it
        let byte_order = match (bytes.get(4), bytes.get(5)) {
            (Some(b'M' | b'm'), Some(b';')) => ByteOrder::BigEndian,
            _ => ByteOrder::LittleEndian,
        };
        let header_len = match byte_order {
            ByteOrder::LittleEndian => u32::from_le_bytes(len_bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(len_bytes),
        } as usize;

        let end = 4usize
            .checked_add(header_len)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                VpfError::header(format!(
                    "header length {} exceeds file size {}",
                    header_len,
                    bytes.len()
                ))
            })?;

        let text: String = bytes[4..end].iter().map(|&b| b as char).collect();
        let mut rest = text.as_str();

        // Byte order marker is optional
        let mut chars = rest.chars();
        if let (Some('L' | 'l' | 'M' | 'm'), Some(';')) = (chars.next(), chars.next()) {
            rest = &rest[2..];
        }

        let (description, after) = rest
            .split_once(';')
            .ok_or_else(|| VpfError::header("missing description terminator"))?;
        let (narrative, after) = after
            .split_once(';')
            .ok_or_else(|| VpfError::header("missing narrative terminator"))?;
        let column_text = after.split(';').next().unwrap_or("");

        let mut columns = Vec::new();
        for def in column_text.split(':') {
            let def = def.trim();
            if def.is_empty() {
                continue;
            }
            columns.push(Self::parse_column(def)?);
        }
        if columns.is_empty() {
            return Err(VpfError::header("no column definitions"));
        }

        let mut header = Self::new(name, description.trim(), byte_order, columns);
        header.narrative_table = optional_field(Some(narrative));
        Ok((header, end))
    }

    fn parse_column(def: &str) -> Result<Column> {
        let (name, definition) = def
            .split_once('=')
            .ok_or_else(|| VpfError::header(format!("column definition without '=': {}", def)))?;
        let mut parts = definition.split(',');

        let code = parts
            .next()
            .and_then(|p| p.trim().chars().next())
            .ok_or_else(|| VpfError::header(format!("column '{}' has no type", name.trim())))?;
        let column_type = ColumnType::from_code(code)?;
        let element_count = match parts.next() {
            Some(raw) => ElementCount::parse(raw)?,
            None => ElementCount::Fixed(1),
        };
        let key_type = KeyType::from_code(parts.next().unwrap_or("N"));
        let description = parts.next().unwrap_or("");

        let mut column = Column::new(name, column_type, element_count)
            .with_key_type(key_type)
            .with_description(description);
        column.value_description_table = optional_field(parts.next());
        column.thematic_index = optional_field(parts.next());
        column.narrative_table = optional_field(parts.next());
        Ok(column)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        if let Some(pos) = self.index.get(name) {
            return Some(*pos);
        }
        self.index.get(&name.trim().to_ascii_lowercase()).copied()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Header text in on-disk form, without the length prefix
    pub fn to_header_text(&self) -> String {
        let mut text = String::new();
        let _ = write!(
            text,
            "{};{};{};",
            self.byte_order.marker(),
            self.description,
            self.narrative_table.as_deref().unwrap_or("-")
        );
        for col in &self.columns {
            let _ = write!(
                text,
                "{}={},{},{},{},{},{},{},:",
                col.name,
                col.column_type.code(),
                col.element_count,
                match col.key_type {
                    KeyType::Primary => 'P',
                    KeyType::Unique => 'U',
                    KeyType::NonUnique => 'N',
                },
                col.description,
                col.value_description_table.as_deref().unwrap_or("-"),
                col.thematic_index.as_deref().unwrap_or("-"),
                col.narrative_table.as_deref().unwrap_or("-"),
            );
        }
        text.push(';');
        text
    }
}
