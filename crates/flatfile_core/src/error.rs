//! Error types for record layouts and layout definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or querying record layouts.
///
/// Tokenizing a line never fails; only layout construction and record-type
/// lookups produce these.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A record-type key was queried that no layout was registered under.
    #[error("unknown record type '{key}'")]
    UnknownRecordType { key: String },

    /// A named layout tried to use one of the keys reserved for the default layout.
    #[error("record type '{key}' is reserved for the default layout")]
    ReservedRecordKey { key: String },

    #[error("record type '{key}' is defined more than once")]
    DuplicateRecordType { key: String },

    /// Indicator positions are 1-based and must name a column.
    #[error("record type '{key}' has an indicator without a valid position")]
    InvalidIndicator { key: String },

    #[error("unsupported layout definition version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("failed to read layout definition {path}: {source}")]
    LayoutRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse layout definition: {0}")]
    LayoutParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
