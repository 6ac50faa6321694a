//! Compressed block framing for MTF entries
//!
//! An entry's data opens with a 4-byte tag. Three magic values mark the
//! entry as compressed; anything else means the whole window is raw bytes
//! and the tag is part of the payload.

/// Compression tag stored in the first four bytes of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionTag {
    /// Entry data is stored raw; the tag bytes belong to the payload.
    Uncompressed,
    VariantA,
    VariantB,
    VariantC,
}

impl CompressionTag {
    pub const VARIANT_A: u32 = 0xbadbeaf;
    pub const VARIANT_B: u32 = 0xbadbeae;
    pub const VARIANT_C: u32 = 0xbadbeaa;

    /// Parse a tag value. Unrecognized values mean the entry is raw.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            Self::VARIANT_A => CompressionTag::VariantA,
            Self::VARIANT_B => CompressionTag::VariantB,
            Self::VARIANT_C => CompressionTag::VariantC,
            _ => CompressionTag::Uncompressed,
        }
    }

    #[must_use]
    pub fn is_compressed(self) -> bool {
        !matches!(self, CompressionTag::Uncompressed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionTag::Uncompressed => "raw",
            CompressionTag::VariantA => "lz-a",
            CompressionTag::VariantB => "lz-b",
            CompressionTag::VariantC => "lz-c",
        }
    }
}

/// Header of one compressed block, reconstructed while extracting.
#[derive(Debug, Clone, Copy)]
pub struct CompressedBlockHeader {
    /// Raw tag value as stored.
    pub tag: u32,
    /// Size of the block, header included.
    pub compressed_size: u32,
    /// Inferred header size, 8 through 12.
    pub header_size: u32,
}

impl CompressedBlockHeader {
    #[must_use]
    pub fn new(tag: u32, compressed_size: u32) -> Self {
        Self {
            tag,
            compressed_size,
            header_size: header_size(compressed_size),
        }
    }

    /// Input bytes left for the codec once the header is skipped.
    #[must_use]
    pub fn payload_budget(&self) -> u32 {
        self.compressed_size - self.header_size
    }
}

/// Infer the total header size for a compressed block.
///
/// The CRC footer can occupy 0-4 bytes directly after the payload and the
/// format carries no length field for it; the header size is inferred by
/// exhausting a remainder test instead. Starting at 8 (the tag and size
/// fields already read), the size grows by one while
/// `compressed_size - header_size` is nonzero, up to a ceiling of 12. The
/// subtraction wraps for sizes below 8, which the extractor never passes
/// in; those fall through the same arithmetic rather than a special case.
#[must_use]
pub fn header_size(compressed_size: u32) -> u32 {
    let mut size = 8;
    while size < 12 && compressed_size != 0 && compressed_size.wrapping_sub(size) != 0 {
        size += 1;
    }
    size
}
