//! MTF archive operations module

mod batch;
mod block;
mod extractor;
mod index;
mod pipeline;

pub use batch::{BatchResult, batch_extract, find_mtf_files};
pub use block::{CompressedBlockHeader, CompressionTag, header_size};
pub use extractor::extract_entry;
pub use index::{ArchiveIndex, VirtualFileEntry, scan_index};
pub use pipeline::{CancelToken, ExtractionProgress, ProgressEvent, extract_archive};
