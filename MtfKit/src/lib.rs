//! # MtfKit
//!
//! A pure-Rust library for reading MTF game-data archives.
//!
//! ## What it does
//!
//! - **Index scanning** - read the archive's virtual-file table
//! - **Decompression** - the byte-oriented LZ codec used by compressed
//!   entries, with its inferred variable-length block headers
//! - **Checksum validation** - CRC-32 verification of decoded entries
//! - **Concurrent extraction** - cancellable whole-archive extraction
//!   with an observable progress stream
//!
//! There is no write path: the archives were produced by the game's own
//! tooling and this library only reads them.
//!
//! ## Quick Start
//!
//! Extracting a whole archive while watching progress:
//!
//! ```no_run
//! use mtfkit::archive::{CancelToken, ExtractionProgress, extract_archive};
//!
//! let mut progress = ExtractionProgress::new();
//! for event in extract_archive("world.mtf", "out", CancelToken::new()) {
//!     progress.update(&event);
//! }
//! assert!(progress.is_done() || progress.was_canceled());
//! ```
//!
//! Reading a single entry without touching the filesystem:
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use mtfkit::archive::{extract_entry, scan_index};
//!
//! let mut source = BufReader::new(File::open("world.mtf")?);
//! let index = scan_index(&mut source)?;
//! let first = &index.entries()[0];
//! let bytes = extract_entry(&mut source, first)?;
//! # Ok::<(), mtfkit::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `mtfkit` command-line binary

pub mod archive;
pub mod checksum;
pub mod compression;
pub mod error;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::archive::{
        ArchiveIndex, BatchResult, CancelToken, CompressedBlockHeader, CompressionTag,
        ExtractionProgress, ProgressEvent, VirtualFileEntry, batch_extract, extract_archive,
        extract_entry, find_mtf_files, scan_index,
    };
    pub use crate::checksum::crc32_of;
    pub use crate::compression::decompress;
    pub use crate::error::{Error, Result};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
