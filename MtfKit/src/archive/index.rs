//! MTF archive index scanning
//!
//! An archive opens with a little-endian `u32` entry count followed by one
//! record per virtual file: name length, raw name bytes (NUL padded,
//! either path separator), absolute data offset, decompressed size.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// One indexed virtual file inside an MTF archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFileEntry {
    /// Absolute byte offset of the entry data in the archive.
    pub offset: u32,
    /// Decompressed size in bytes.
    pub total_size: u32,
    /// Sanitized relative path of the entry.
    pub file_name: String,
}

/// The file table of one archive, in on-disk order.
///
/// Built once by [`scan_index`]; immutable afterward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveIndex {
    entries: Vec<VirtualFileEntry>,
}

impl ArchiveIndex {
    /// All entries, in on-disk order.
    #[must_use]
    pub fn entries(&self) -> &[VirtualFileEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look an entry up by its sanitized name.
    #[must_use]
    pub fn find(&self, file_name: &str) -> Option<&VirtualFileEntry> {
        self.entries.iter().find(|e| e.file_name == file_name)
    }
}

/// Scan the archive's file table into memory.
///
/// The whole table must parse: a read past the end of the data discards
/// any partial result and fails with [`Error::MalformedIndex`], so
/// extraction never starts against a half-read index.
///
/// # Errors
/// Returns [`Error::MalformedIndex`] if the table ends mid-record, or
/// [`Error::Io`] for any other read failure.
///
/// [`Error::MalformedIndex`]: crate::Error::MalformedIndex
/// [`Error::Io`]: crate::Error::Io
pub fn scan_index<R: Read + Seek>(source: &mut R) -> Result<ArchiveIndex> {
    source.seek(SeekFrom::Start(0))?;

    let entry_count = read_index_u32(source, "entry count")?;

    let mut entries = Vec::with_capacity(entry_count.min(0x10000) as usize);
    for _ in 0..entry_count {
        let name_length = read_index_u32(source, "name length")?;

        let mut name = vec![0u8; name_length as usize];
        source
            .read_exact(&mut name)
            .map_err(|e| index_error(e, "entry name"))?;

        let offset = read_index_u32(source, "entry offset")?;
        let total_size = read_index_u32(source, "entry size")?;

        entries.push(VirtualFileEntry {
            offset,
            total_size,
            file_name: sanitize_entry_name(&name),
        });
    }

    Ok(ArchiveIndex { entries })
}

fn read_index_u32<R: Read>(source: &mut R, field: &str) -> Result<u32> {
    source
        .read_u32::<LittleEndian>()
        .map_err(|e| index_error(e, field))
}

fn index_error(e: std::io::Error, field: &str) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::MalformedIndex(format!("archive ended while reading {field}"))
    } else {
        Error::Io(e)
    }
}

/// Clean a raw index name into a safe relative path.
///
/// Names come NUL padded and with either separator. Empty, `.`, and `..`
/// segments are dropped so an entry can never resolve outside the
/// extraction directory.
fn sanitize_entry_name(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let segments: Vec<&str> = text
        .trim_matches('\0')
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    segments.join("/")
}
