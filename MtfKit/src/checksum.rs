//! CRC-32 validation for decoded entries
//!
//! Archives store a little-endian CRC-32 (reflected polynomial
//! `0xEDB88320`) immediately after each compressed block. The stored value
//! covers at most the entry's declared decompressed size, even when the
//! codec produced more.

/// Compute the CRC-32 of `data`, capped to the entry's declared size.
#[must_use]
pub fn crc32_of(data: &[u8], declared_size: u32) -> u32 {
    let limit = data.len().min(declared_size as usize);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&data[..limit]);
    hasher.finalize()
}
