use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the overlap finder.
///
/// Messages leave the underlying cause to `source()`, so reporters walking
/// the chain print it once.
#[derive(Error, Debug)]
pub enum OverlapError {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Read error at byte offset {offset}")]
    Read {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed hash dump {}: line {line}: {reason}", path.display())]
    DumpFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Block size mismatch: hash dump was recorded with {dump} bytes, requested {requested} bytes")]
    BlockSizeMismatch { dump: u64, requested: u64 },

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl OverlapError {
    pub(crate) fn dump_format(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::DumpFormat {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// True for the errors that mean a hash dump cannot be trusted
    pub fn is_dump_format(&self) -> bool {
        matches!(self, Self::DumpFormat { .. } | Self::BlockSizeMismatch { .. })
    }
}

/// Result type alias for overlap operations
pub type Result<T> = std::result::Result<T, OverlapError>;
