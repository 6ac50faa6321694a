//! Decompression for MTF compressed entry payloads
//!
//! Compressed entries use a byte-oriented LZ77 variant. An indicator byte
//! supplies eight literal/back-reference flags, consumed low bit first;
//! literals pass straight through, and back-references copy from a
//! 1024-byte history window that is rewritten while it is being read.
//! The window is a plain array with a masked cursor rather than a ring
//! abstraction: a back-reference may overlap the bytes it is producing,
//! and that overlap is how a single byte extends into an arbitrary run.

use std::io::Read;

use crate::error::Result;

/// History window size. Back-reference offsets are 10 bits.
const WINDOW_SIZE: usize = 0x400;
const WINDOW_MASK: u32 = 0x3ff;

/// Decode one compressed payload.
///
/// `budget` is the number of input bytes belonging to the payload. Running
/// past the budget is not an error: an exhausted indicator refill behaves
/// as all-ones (`0xFFFF_FFFF`) and an exhausted data read yields `0xFF`,
/// matching the archive producer. Decoding stops at a back-reference word
/// whose offset field is zero; the output is however many bytes the stream
/// produced by then.
///
/// # Errors
/// Returns [`Error::Io`] if the underlying reader fails while budget
/// remains.
///
/// [`Error::Io`]: crate::Error::Io
pub fn decompress<R: Read>(reader: &mut R, budget: u32) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(0x8000);
    let mut window = [0u8; WINDOW_SIZE];
    // the format's write cursor starts at slot 1, not 0
    let mut cursor: u32 = 1;

    let mut remaining = budget;
    let mut indicator: u32 = 0;
    let mut bits_left: u8 = 0;

    loop {
        let mut data_left: i32;

        // literal loop: one indicator bit per decoded byte
        loop {
            if bits_left == 0 {
                bits_left = 8;
                indicator = if remaining == 0 {
                    0xffffffff
                } else {
                    remaining -= 1;
                    u32::from(read_byte(reader)?)
                };
            }
            bits_left -= 1;
            data_left = remaining as i32;

            let flag = indicator & 1;
            indicator >>= 1;
            if flag == 0 {
                break;
            }

            let byte = if data_left == 0 {
                0xff
            } else {
                remaining -= 1;
                read_byte(reader)?
            };
            output.push(byte);
            window[cursor as usize] = byte;
            cursor = (cursor + 1) & WINDOW_MASK;
        }

        // back-reference word: two bytes, low byte first
        let low = if data_left == 0 {
            0xffffffff
        } else {
            let byte = u32::from(read_byte(reader)?);
            remaining = (data_left - 1) as u32;
            byte
        };
        let high = if remaining == 0 {
            0xffffffff
        } else {
            remaining -= 1;
            u32::from(read_byte(reader)?)
        };

        // exhausted-input sentinels overflow here; the wrap is part of the format
        let word = high.wrapping_mul(0x100).wrapping_add(low);
        let offset = word & WINDOW_MASK;
        if offset == 0 {
            break;
        }

        let count = ((word >> 10) & 0x3f) + 2;
        let base = cursor as i32 - offset as i32;

        // copies count + 1 bytes; each lands back in the window before the
        // next is read, so an overlapping source extends its own output
        let mut copied: i32 = 0;
        while copied <= count as i32 {
            let index = ((base & 0x3ff) + (copied & 0x3ff)) & 0x3ff;
            let byte = window[index as usize];
            output.push(byte);
            window[cursor as usize] = byte;
            cursor = (cursor + 1) & WINDOW_MASK;
            copied += 1;
        }
    }

    tracing::debug!("decoded {budget} input bytes into {} bytes", output.len());

    Ok(output)
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn decode(stream: &[u8]) -> Vec<u8> {
        decompress(&mut Cursor::new(stream), stream.len() as u32).unwrap()
    }

    #[test]
    fn literal_only_stream_decodes_to_its_bytes() {
        // indicator 0b011: two literals, then a zero-offset terminator word
        let output = decode(&[0x03, b'H', b'i', 0x00, 0x00]);
        assert_eq!(output, b"Hi");
    }

    #[test]
    fn zero_offset_word_terminates_immediately() {
        let output = decode(&[0x00, 0x00, 0x00]);
        assert!(output.is_empty());
    }

    #[test]
    fn offset_one_reference_extends_a_single_byte_run() {
        // one literal, then offset=1 with length bits 0: copies 0+2+1 = 3
        // bytes out of the byte it is writing
        let output = decode(&[0x01, b'A', 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(output, b"AAAA");
    }

    #[test]
    fn back_reference_word_is_read_low_byte_first() {
        // offset=2 must come from the first of the two word bytes
        let output = decode(&[0x03, b'a', b'b', 0x02, 0x00, 0x00, 0x00]);
        assert_eq!(output, b"ababa");
    }

    #[test]
    fn length_bits_are_biased_by_two_plus_inclusive_copy() {
        // offset=2, length bits 1 => word 0x0402, copies 1+2+1 = 4 bytes
        let output = decode(&[0x03, b'x', b'y', 0x02, 0x04, 0x00, 0x00]);
        assert_eq!(output, b"xyxyxy");
    }

    #[test]
    fn long_run_crosses_window_wrap() {
        // fill most of the window with literals, then reference back across
        // the cursor wrap point
        let mut stream = Vec::new();
        for _ in 0..128 {
            stream.push(0xff); // eight literal flags
            stream.extend_from_slice(&[0xAB; 8]);
        }
        // cursor is now back at slot 1 (1 + 1024 mod 1024); copy the three
        // most recent bytes, then terminate
        stream.push(0x00);
        stream.extend_from_slice(&[0x01, 0x00]);
        stream.extend_from_slice(&[0x00, 0x00]);

        let output = decode(&stream);
        assert_eq!(output.len(), 1024 + 3);
        assert!(output.iter().all(|&b| b == 0xAB));
    }
}
