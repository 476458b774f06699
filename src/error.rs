//! Error types for the vpfdb reader

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VpfError>;

#[derive(Error, Debug)]
pub enum VpfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A table needed to build a feature class or coverage schema could not be read
    #[error("Schema build error: {0}")]
    SchemaBuild(String),

    /// An optional table is absent; callers fall back to a default
    #[error("Missing optional table: {0}")]
    MissingOptionalTable(PathBuf),

    /// A joined table could not be scanned for one row
    #[error("Join lookup failed on {table}: {reason}")]
    JoinLookup { table: String, reason: String },

    #[error("Directory not found: {0}")]
    DirectoryMissing(PathBuf),

    #[error("CRS resolution error: {0}")]
    CrsResolution(String),

    #[error("Invalid table header in {path}: {reason}")]
    InvalidHeader { path: String, reason: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unknown column type code '{0}'")]
    UnknownTypeCode(char),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(PathBuf),

    #[error("Table closed: {0}")]
    TableClosed(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VpfError {
    /// Header errors raised while the table path is not yet known
    pub(crate) fn header(reason: impl Into<String>) -> Self {
        VpfError::InvalidHeader {
            path: String::new(),
            reason: reason.into(),
        }
    }

    pub(crate) fn with_path(self, path: &str) -> Self {
        match self {
            VpfError::InvalidHeader { reason, .. } => VpfError::InvalidHeader {
                path: path.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Errors that are handled by falling back rather than aborting an open
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VpfError::MissingOptionalTable(_)
                | VpfError::JoinLookup { .. }
                | VpfError::DirectoryMissing(_)
                | VpfError::CrsResolution(_)
        )
    }
}

impl From<serde_json::Error> for VpfError {
    fn from(err: serde_json::Error) -> Self {
        VpfError::Config(err.to_string())
    }
}
