//! Error types for tensorprep.

use thiserror::Error;

/// Result type alias for tensorprep operations.
pub type Result<T> = std::result::Result<T, TensorPrepError>;

/// Main error type for tensorprep operations.
#[derive(Error, Debug)]
pub enum TensorPrepError {
    /// A tabular source could not be resolved locally or downloaded.
    #[error("Failed to fetch dataset: {0}")]
    Fetch(String),

    /// A named text corpus (or one of its splits) is unavailable.
    #[error("Failed to load corpus: {0}")]
    Corpus(String),

    /// Malformed rows or cells in a tabular source.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Tokenizer training, loading, or encoding errors.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Hub transport errors.
    #[error("Hub error: {0}")]
    Hub(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No policy is registered under the requested dataset name.
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
