//! Table storage: header parsing, row decoding and cursors

mod codec;
mod context;
mod cursor;
mod header;
mod table_file;

#[cfg(test)]
pub(crate) mod testutil;

pub use context::{resolve_path, TableContext};
pub use cursor::{MemoryTable, TableCursor};
pub use header::{ByteOrder, TableHeader};
pub use table_file::{TableData, VpfTableFile};
