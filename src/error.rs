//! Error types for index operations.
//!
//! Every fallible operation in this crate returns [`IndexResult`]. The enum
//! keeps the three failure families distinguishable for callers: bad input
//! (`DimensionMismatch`, `InvalidDimension`), bad file content
//! (`UnsupportedVersion`, `InvalidFormat`), and underlying I/O (`Io`).
//! Display text carries a suggestion line so CLI users get actionable
//! messages without a lookup.

use thiserror::Error;

/// Errors produced by index construction, search, and persistence.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A vector's length does not match the index dimension count.
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors come from the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    /// A dimension count that can never be valid, such as zero.
    #[error(
        "Invalid vector dimension {dimension}: {reason}\nSuggestion: Construct the index with a dimension count of at least 1"
    )]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    /// The file header declares a format version this build cannot read.
    #[error(
        "Unsupported index format version {found} (this build reads version {supported})\nSuggestion: Rebuild the index file or upgrade to a release that reads this version"
    )]
    UnsupportedVersion { found: i32, supported: i32 },

    /// The file content is malformed: truncated stream, bad boolean byte,
    /// invalid UTF-8, negative count, or an out-of-range split dimension.
    #[error(
        "Invalid index file: {0}\nSuggestion: The file is corrupt or was not written by this tool; rebuild it from source data"
    )]
    InvalidFormat(String),

    /// Filesystem failure outside the format itself.
    #[error("I/O error: {0}\nSuggestion: Check the path, disk space, and file permissions")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type IndexResult<T> = Result<T, IndexError>;
