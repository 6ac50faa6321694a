use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use mtfkit::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

// ---------------------------------------------------------------------------
// Archive builders
// ---------------------------------------------------------------------------

struct EntrySpec {
    name: &'static str,
    data: Vec<u8>,
    total_size: u32,
    /// Overrides the computed data offset, for deliberately broken entries.
    bad_offset: Option<u32>,
}

impl EntrySpec {
    fn raw(name: &'static str, data: &[u8]) -> Self {
        Self {
            name,
            data: data.to_vec(),
            total_size: data.len() as u32,
            bad_offset: None,
        }
    }
}

fn push_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn build_archive(entries: &[EntrySpec]) -> Vec<u8> {
    let table_len: usize = 4 + entries
        .iter()
        .map(|e| 4 + e.name.len() + 8)
        .sum::<usize>();

    let mut payloads = Vec::new();
    let mut offsets = Vec::new();
    for entry in entries {
        offsets.push((table_len + payloads.len()) as u32);
        payloads.extend_from_slice(&entry.data);
    }

    let mut archive = Vec::new();
    push_u32(&mut archive, entries.len() as u32);
    for (entry, offset) in entries.iter().zip(&offsets) {
        push_u32(&mut archive, entry.name.len() as u32);
        archive.extend_from_slice(entry.name.as_bytes());
        push_u32(&mut archive, entry.bad_offset.unwrap_or(*offset));
        push_u32(&mut archive, entry.total_size);
    }
    archive.extend_from_slice(&payloads);
    archive
}

/// A compressed block whose payload decodes to "Hi".
fn hi_block(crc: u32) -> Vec<u8> {
    let stream = [0x03, b'H', b'i', 0x00, 0x00];
    let compressed_size = 12 + stream.len() as u32;

    let mut block = Vec::new();
    push_u32(&mut block, 0xbadbeaf);
    push_u32(&mut block, compressed_size);
    block.extend_from_slice(&[0u8; 4]);
    block.extend_from_slice(&stream);
    push_u32(&mut block, crc);
    block
}

fn drain(receiver: impl IntoIterator<Item = ProgressEvent>) -> Vec<ProgressEvent> {
    receiver.into_iter().collect()
}

fn terminal_of(events: &[ProgressEvent]) -> &ProgressEvent {
    events
        .iter()
        .find(|e| e.is_terminal())
        .expect("a terminal event")
}

// ---------------------------------------------------------------------------
// Index scanning
// ---------------------------------------------------------------------------

#[test]
fn scan_round_trips_the_file_table() {
    let entries = [
        EntrySpec::raw("models/rock.o3d", b"RAWDATA0"),
        EntrySpec::raw("textures\\rock.tex\0\0", b"more raw bytes"),
    ];
    let archive = build_archive(&entries);

    let index = scan_index(&mut Cursor::new(&archive)).unwrap();
    assert_eq!(index.len(), 2);

    let first = &index.entries()[0];
    assert_eq!(first.file_name, "models/rock.o3d");
    assert_eq!(first.total_size, 8);
    assert_eq!(&archive[first.offset as usize..][..8], b"RAWDATA0");

    let second = &index.entries()[1];
    assert_eq!(second.file_name, "textures/rock.tex");
    assert_eq!(second.offset, first.offset + 8);
}

#[test]
fn scan_then_reserialize_is_identity_for_clean_names() {
    let entries = [
        EntrySpec::raw("a/b.bin", b"RAWDATA0"),
        EntrySpec::raw("c.bin", b"RAWDATA1"),
    ];
    let archive = build_archive(&entries);
    let index = scan_index(&mut Cursor::new(&archive)).unwrap();

    // rebuild the table from the scanned entries and compare byte-for-byte
    let mut rebuilt = Vec::new();
    push_u32(&mut rebuilt, index.len() as u32);
    for entry in index.entries() {
        push_u32(&mut rebuilt, entry.file_name.len() as u32);
        rebuilt.extend_from_slice(entry.file_name.as_bytes());
        push_u32(&mut rebuilt, entry.offset);
        push_u32(&mut rebuilt, entry.total_size);
    }

    let table_len = rebuilt.len();
    assert_eq!(rebuilt, archive[..table_len]);
}

#[test]
fn scan_rejects_a_table_that_overruns_the_data() {
    let mut archive = build_archive(&[EntrySpec::raw("a.bin", b"1234")]);
    archive[0] = 9; // claims nine records

    assert!(matches!(
        scan_index(&mut Cursor::new(&archive)),
        Err(Error::MalformedIndex(_))
    ));
}

// ---------------------------------------------------------------------------
// Single-entry extraction
// ---------------------------------------------------------------------------

#[test]
fn extract_entry_reads_raw_and_compressed_entries() {
    let good_crc = crc32_of(b"Hi", 2);
    let entries = [
        EntrySpec::raw("raw.bin", b"RAWDATA0"),
        EntrySpec {
            name: "compressed.bin",
            data: hi_block(good_crc),
            total_size: 2,
            bad_offset: None,
        },
    ];
    let archive = build_archive(&entries);
    let mut source = Cursor::new(&archive);

    let index = scan_index(&mut source).unwrap();
    let raw = extract_entry(&mut source, index.find("raw.bin").unwrap()).unwrap();
    assert_eq!(raw, b"RAWDATA0");

    let decoded = extract_entry(&mut source, index.find("compressed.bin").unwrap()).unwrap();
    assert_eq!(decoded, b"Hi");
}

#[test]
fn extract_entry_works_over_a_buffered_file() {
    let archive = build_archive(&[EntrySpec::raw("file.bin", b"on disk")]);
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.mtf");
    std::fs::write(&path, &archive).unwrap();

    let mut source = BufReader::new(File::open(&path).unwrap());
    let index = scan_index(&mut source).unwrap();
    let bytes = extract_entry(&mut source, index.find("file.bin").unwrap()).unwrap();
    assert_eq!(bytes, b"on disk");
}

// ---------------------------------------------------------------------------
// Whole-archive pipeline
// ---------------------------------------------------------------------------

#[test]
fn pipeline_extracts_every_entry_and_reports_done() {
    let good_crc = crc32_of(b"Hi", 2);
    let entries = [
        EntrySpec::raw("sub/dir/raw.bin", b"RAWDATA0"),
        EntrySpec {
            name: "compressed.bin",
            data: hi_block(good_crc),
            total_size: 2,
            bad_offset: None,
        },
    ];
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("sample.mtf");
    std::fs::write(&archive_path, build_archive(&entries)).unwrap();
    let out_root = dir.path().join("out");

    let events = drain(extract_archive(&archive_path, &out_root, CancelToken::new()));
    let terminal = terminal_of(&events);

    assert!(terminal.is_done);
    assert!(!terminal.was_canceled);
    assert_eq!(terminal.extracted_count, 2);
    assert_eq!(terminal.error_count, 0);
    assert_eq!(terminal.total_count, 2);

    let base = out_root.join("sample");
    assert_eq!(std::fs::read(base.join("sub/dir/raw.bin")).unwrap(), b"RAWDATA0");
    assert_eq!(std::fs::read(base.join("compressed.bin")).unwrap(), b"Hi");
}

#[test]
fn per_entry_failures_are_counted_not_fatal() {
    let entries = [
        EntrySpec::raw("good1.bin", b"RAWDATA0"),
        EntrySpec {
            name: "broken.bin",
            data: Vec::new(),
            total_size: 64,
            bad_offset: Some(0x00ff_0000), // points far past the end
        },
        EntrySpec::raw("good2.bin", b"RAWDATA1"),
    ];
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("damaged.mtf");
    std::fs::write(&archive_path, build_archive(&entries)).unwrap();
    let out_root = dir.path().join("out");

    let events = drain(extract_archive(&archive_path, &out_root, CancelToken::new()));
    let terminal = terminal_of(&events);

    assert!(terminal.is_done);
    assert_eq!(terminal.total_count, 3);
    assert_eq!(terminal.extracted_count, 2);
    assert_eq!(terminal.error_count, 1);

    let error_events: Vec<_> = events.iter().filter(|e| e.error.is_some()).collect();
    assert_eq!(error_events.len(), 1);
    assert!(error_events[0].message.as_ref().unwrap().contains("broken.bin"));

    let base = out_root.join("damaged");
    assert!(base.join("good1.bin").exists());
    assert!(base.join("good2.bin").exists());
    assert!(!base.join("broken.bin").exists());
}

#[test]
fn checksum_mismatch_is_a_warning_and_the_file_is_still_written() {
    let entries = [EntrySpec {
        name: "fuzzy.bin",
        data: hi_block(0xdeadbeef),
        total_size: 2,
        bad_offset: None,
    }];
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("fuzzy.mtf");
    std::fs::write(&archive_path, build_archive(&entries)).unwrap();
    let out_root = dir.path().join("out");

    let events = drain(extract_archive(&archive_path, &out_root, CancelToken::new()));
    let terminal = terminal_of(&events);

    assert!(terminal.is_done);
    assert_eq!(terminal.extracted_count, 1);
    assert_eq!(terminal.error_count, 0);
    assert_eq!(
        std::fs::read(out_root.join("fuzzy").join("fuzzy.bin")).unwrap(),
        b"Hi"
    );
}

#[test]
fn a_cancelled_run_emits_one_terminal_event_and_writes_nothing() {
    let entries = [
        EntrySpec::raw("a.bin", b"RAWDATA0"),
        EntrySpec::raw("b.bin", b"RAWDATA1"),
    ];
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("sample.mtf");
    std::fs::write(&archive_path, build_archive(&entries)).unwrap();
    let out_root = dir.path().join("out");

    let cancel = CancelToken::new();
    cancel.cancel();

    let events = drain(extract_archive(&archive_path, &out_root, cancel));

    let canceled: Vec<_> = events.iter().filter(|e| e.was_canceled).collect();
    assert_eq!(canceled.len(), 1);
    assert!(events.iter().all(|e| !e.is_done));
    assert!(events.iter().all(|e| e.extracted_count == 0));
    assert!(!out_root.join("sample").exists());
}

#[test]
fn a_missing_archive_surfaces_as_a_terminal_error_event() {
    let dir = tempdir().unwrap();

    let events = drain(extract_archive(
        dir.path().join("absent.mtf"),
        dir.path().join("out"),
        CancelToken::new(),
    ));

    assert_eq!(events.len(), 1);
    assert!(events[0].is_done);
    assert_eq!(events[0].error_count, 1);
    assert!(events[0].error.is_some());
}

#[test]
fn progress_fold_tracks_a_real_run() {
    let entries = [
        EntrySpec::raw("one.bin", b"RAWDATA0"),
        EntrySpec::raw("two.bin", b"RAWDATA1"),
    ];
    let dir = tempdir().unwrap();
    let archive_path = dir.path().join("sample.mtf");
    std::fs::write(&archive_path, build_archive(&entries)).unwrap();

    let mut progress = ExtractionProgress::new();
    for event in extract_archive(&archive_path, dir.path().join("out"), CancelToken::new()) {
        progress.update(&event);
    }

    assert!(progress.is_done());
    assert!(!progress.was_canceled());
    assert!((progress.percent() - 1.0).abs() < f64::EPSILON);
    assert!(progress.errors().is_empty());
    assert!(progress.time_taken() >= chrono::Duration::zero());
}

// ---------------------------------------------------------------------------
// Discovery and batch extraction
// ---------------------------------------------------------------------------

#[test]
fn find_mtf_files_filters_and_sorts() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir_all(&nested).unwrap();

    let archive = build_archive(&[EntrySpec::raw("x.bin", b"RAWDATA0")]);
    std::fs::write(dir.path().join("b.mtf"), &archive).unwrap();
    std::fs::write(nested.join("a.MTF"), &archive).unwrap();
    std::fs::write(dir.path().join("readme.txt"), b"not an archive").unwrap();

    let found = find_mtf_files(dir.path());
    assert_eq!(found.len(), 2);
    assert!(found[0].ends_with(Path::new("b.mtf")) || found[0].ends_with(Path::new("nested/a.MTF")));
    assert!(found.iter().all(|p| p
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("mtf"))));
}

#[test]
fn batch_extract_reports_per_archive_outcomes() {
    let dir = tempdir().unwrap();
    let archive = build_archive(&[EntrySpec::raw("x.bin", b"RAWDATA0")]);
    std::fs::write(dir.path().join("a.mtf"), &archive).unwrap();
    std::fs::write(dir.path().join("b.mtf"), &archive).unwrap();
    std::fs::write(dir.path().join("c.mtf"), b"\xff\xff\xff\xff").unwrap();

    let out_root = dir.path().join("out");
    let archives = find_mtf_files(dir.path());
    assert_eq!(archives.len(), 3);

    let mut seen_events = 0;
    let batch = batch_extract(&archives, &out_root, &CancelToken::new(), |_| {
        seen_events += 1;
    });

    assert_eq!(batch.success_count, 2);
    assert_eq!(batch.fail_count, 1);
    assert_eq!(batch.results.len(), 3);
    assert!(seen_events >= 3);

    assert!(out_root.join("a").join("x.bin").exists());
    assert!(out_root.join("b").join("x.bin").exists());
}

#[test]
fn batch_extract_stops_once_cancelled() {
    let dir = tempdir().unwrap();
    let archive = build_archive(&[EntrySpec::raw("x.bin", b"RAWDATA0")]);
    std::fs::write(dir.path().join("a.mtf"), &archive).unwrap();
    std::fs::write(dir.path().join("b.mtf"), &archive).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();

    let batch = batch_extract(
        &find_mtf_files(dir.path()),
        &dir.path().join("out"),
        &cancel,
        |_| {},
    );

    assert_eq!(batch.success_count, 0);
    assert_eq!(batch.results, ["Batch canceled."]);
}
