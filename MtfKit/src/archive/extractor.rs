//! Single-entry extraction
//!
//! Produces the raw bytes of one virtual file. Raw entries are returned
//! as stored; compressed entries go through header disambiguation, the LZ
//! codec, and CRC validation.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::block::{CompressedBlockHeader, CompressionTag};
use super::index::VirtualFileEntry;
use crate::checksum::crc32_of;
use crate::compression;
use crate::error::Result;

/// Extract one virtual file's bytes from the archive.
///
/// A recognized compression tag selects the decode path; anything else
/// means the `total_size` window at the entry's offset is the payload
/// itself. A stored-CRC mismatch is logged and the decoded bytes are
/// returned anyway; a compressed block of 8 bytes or fewer has no room
/// for a payload and yields an empty result rather than an error.
///
/// # Errors
/// Returns [`Error::Io`] if the archive data cannot be read at the
/// entry's offsets.
///
/// [`Error::Io`]: crate::Error::Io
pub fn extract_entry<R: Read + Seek>(
    source: &mut R,
    entry: &VirtualFileEntry,
) -> Result<Vec<u8>> {
    source.seek(SeekFrom::Start(u64::from(entry.offset)))?;
    let raw_tag = source.read_u32::<LittleEndian>()?;

    if !CompressionTag::from_raw(raw_tag).is_compressed() {
        // raw entry: the whole window at the offset is payload, tag included
        source.seek(SeekFrom::Start(u64::from(entry.offset)))?;
        let mut content = vec![0u8; entry.total_size as usize];
        source.read_exact(&mut content)?;
        return Ok(content);
    }

    let compressed_size = source.read_u32::<LittleEndian>()?;

    // the CRC footer sits directly after the compressed block
    source.seek(SeekFrom::Start(
        u64::from(entry.offset) + u64::from(compressed_size),
    ))?;
    let stored_crc = source.read_u32::<LittleEndian>()?;

    if compressed_size <= 8 {
        // the tag and size fields leave no payload behind them
        return Ok(Vec::new());
    }

    let header = CompressedBlockHeader::new(raw_tag, compressed_size);
    source.seek(SeekFrom::Start(
        u64::from(entry.offset) + u64::from(header.header_size),
    ))?;

    let decoded = compression::decompress(source, header.payload_budget())?;

    let computed_crc = crc32_of(&decoded, entry.total_size);
    if stored_crc != computed_crc {
        tracing::warn!(
            "checksum mismatch for `{}`: stored {stored_crc:#010x}, computed {computed_crc:#010x}",
            entry.file_name
        );
    }

    Ok(decoded)
}
