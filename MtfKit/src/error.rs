//! Error types for `MtfKit`

use thiserror::Error;

/// The error type for `MtfKit` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== MTF Archive Errors ====================
    /// The archive's file table could not be read in full.
    ///
    /// The index is all-or-nothing: a table that ends mid-record is
    /// rejected before any extraction starts.
    #[error("malformed archive index: {0}")]
    MalformedIndex(String),

    /// The requested entry is not present in the archive index.
    #[error("entry not found in archive: {0}")]
    EntryNotFound(String),
}

/// A specialized Result type for `MtfKit` operations.
pub type Result<T> = std::result::Result<T, Error>;
