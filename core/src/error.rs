use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A single file could not be read or decoded. The reindex cycle skips it.
    #[error("failed to extract text from {path}: {source}")]
    Extraction {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document store and inverted index disagree. Aborts the current cycle.
    #[error("index invariant violated: {0}")]
    InvariantViolation(String),

    /// The document root itself could not be walked.
    #[error("document root {path} is unavailable: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        CoreError::InvariantViolation(msg.into())
    }

    pub fn is_extraction(&self) -> bool {
        matches!(self, CoreError::Extraction { .. })
    }
}
