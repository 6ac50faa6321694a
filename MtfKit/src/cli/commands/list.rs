//! CLI command for listing archive contents

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::Context;
use byteorder::{LittleEndian, ReadBytesExt};

use crate::archive::{CompressionTag, VirtualFileEntry, scan_index};

pub fn execute(source: &Path, detailed: bool) -> anyhow::Result<()> {
    let file = File::open(source).with_context(|| format!("opening {}", source.display()))?;
    let mut reader = BufReader::new(file);
    let index = scan_index(&mut reader)?;

    if detailed {
        println!("{:>10}  {:>10}  {:>5}  name", "offset", "size", "tag");
        for entry in index.entries() {
            let tag = entry_tag(&mut reader, entry)
                .map_or("?", CompressionTag::as_str);
            println!(
                "{:>10}  {:>10}  {:>5}  {}",
                entry.offset, entry.total_size, tag, entry.file_name
            );
        }
    } else {
        for entry in index.entries() {
            println!("{}", entry.file_name);
        }
    }

    println!("{} entries", index.len());
    Ok(())
}

/// Peek at an entry's compression tag without extracting it.
fn entry_tag<R: Read + Seek>(reader: &mut R, entry: &VirtualFileEntry) -> Option<CompressionTag> {
    reader.seek(SeekFrom::Start(u64::from(entry.offset))).ok()?;
    let raw = reader.read_u32::<LittleEndian>().ok()?;
    Some(CompressionTag::from_raw(raw))
}
