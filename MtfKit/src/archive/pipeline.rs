//! Concurrent whole-archive extraction
//!
//! [`extract_archive`] scans the index, then fans one task per entry onto
//! the rayon pool. Every task reads through its own cursor over a single
//! immutable copy of the archive bytes and reports through a rendezvous
//! channel; the consumer of the returned receiver folds events with
//! [`ExtractionProgress`]. Cancellation is cooperative: each task checks
//! the shared token before extracting, before writing, and before
//! reporting. Files written before a cancellation stay on disk.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, bounded};
use rayon::prelude::*;

use super::extractor::extract_entry;
use super::index::{VirtualFileEntry, scan_index};

/// Shared cancellation signal, checked cooperatively by extraction tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Running tasks stop at their next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One update from an extraction run.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Entries successfully written so far.
    pub extracted_count: u64,
    /// Entries in the archive index.
    pub total_count: u64,
    /// Set on the terminal event of a completed run.
    pub is_done: bool,
    /// Set on the terminal event of a cancelled run. Never set together
    /// with `is_done`.
    pub was_canceled: bool,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Human-readable description of what just happened.
    pub message: Option<String>,
    /// Error text when the event reports a failure.
    pub error: Option<String>,
    /// Failed entries at emission time.
    pub error_count: u64,
}

impl ProgressEvent {
    fn snapshot(extracted: u64, total: u64, errors: u64) -> Self {
        Self {
            extracted_count: extracted,
            total_count: total,
            is_done: false,
            was_canceled: false,
            timestamp: Utc::now(),
            message: None,
            error: None,
            error_count: errors,
        }
    }

    /// True for the event that ends a run, successful or cancelled.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.is_done || self.was_canceled
    }
}

/// Start extracting a whole archive.
///
/// Returns the event stream immediately; the run executes on a background
/// thread and the rayon pool. The channel is a rendezvous: a producer
/// blocks until the consumer takes its event, so reading the stream is
/// also the pipeline's backpressure. Dropping the receiver mutes the
/// stream without stopping the run - use the token to stop it.
///
/// The terminal event carries either `is_done` or `was_canceled`, never
/// both. Output lands under `<output_root>/<archive stem>/`, parent
/// directories created as needed. Failures to open or scan the archive
/// surface as a terminal error event, not a panic.
pub fn extract_archive(
    archive_path: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    cancel: CancelToken,
) -> Receiver<ProgressEvent> {
    let archive_path = archive_path.as_ref().to_path_buf();
    let output_root = output_root.as_ref().to_path_buf();
    let (sender, receiver) = bounded(0);

    thread::spawn(move || run_extraction(&archive_path, &output_root, &cancel, sender));

    receiver
}

fn run_extraction(
    archive_path: &Path,
    output_root: &Path,
    cancel: &CancelToken,
    sender: Sender<ProgressEvent>,
) {
    let data = match std::fs::read(archive_path) {
        Ok(data) => data,
        Err(e) => {
            fail_run(
                &sender,
                format!("Error opening `{}`: {e}", archive_path.display()),
            );
            return;
        }
    };

    let index = match scan_index(&mut Cursor::new(&data)) {
        Ok(index) => index,
        Err(e) => {
            fail_run(
                &sender,
                format!("Error scanning `{}`: {e}", archive_path.display()),
            );
            return;
        }
    };

    let reporter = Reporter {
        sender,
        total: index.len() as u64,
        extracted: AtomicUsize::new(0),
        errors: AtomicUsize::new(0),
    };
    reporter.progress(format!(
        "Indexed {} entries in `{}`",
        index.len(),
        archive_path.display()
    ));

    let output_dir = output_root.join(archive_stem(archive_path));

    index
        .entries()
        .par_iter()
        .for_each(|entry| extract_one(entry, &data, &output_dir, cancel, &reporter));

    // join point: every task has finished or bailed at a checkpoint
    if cancel.is_canceled() {
        reporter.canceled();
    } else {
        reporter.done();
    }
}

/// One entry's task: extract, write, report, with a cancellation
/// checkpoint between each step.
fn extract_one(
    entry: &VirtualFileEntry,
    data: &[u8],
    output_dir: &Path,
    cancel: &CancelToken,
    reporter: &Reporter,
) {
    if cancel.is_canceled() {
        return;
    }

    let bytes = match extract_entry(&mut Cursor::new(data), entry) {
        Ok(bytes) => bytes,
        Err(e) => {
            reporter.failure(format!("Error extracting `{}`: {e}", entry.file_name));
            return;
        }
    };

    if cancel.is_canceled() {
        return;
    }

    let target = output_dir.join(&entry.file_name);
    if let Err(e) = write_output(&target, &bytes) {
        reporter.failure(format!("Error writing `{}`: {e}", target.display()));
        return;
    }

    if cancel.is_canceled() {
        return;
    }

    reporter.success(format!("{} ({} bytes)", target.display(), bytes.len()));
}

fn write_output(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, bytes)
}

fn archive_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// A run that never got to the fan-out: one terminal event, then silence.
fn fail_run(sender: &Sender<ProgressEvent>, message: String) {
    let _ = sender.send(ProgressEvent {
        extracted_count: 0,
        total_count: 0,
        is_done: true,
        was_canceled: false,
        timestamp: Utc::now(),
        message: Some(message.clone()),
        error: Some(message),
        error_count: 1,
    });
}

/// Shared event emitter for one run.
///
/// The counters are atomics so concurrent tasks can stamp accurate
/// snapshots onto their events; the authoritative fold still happens in
/// the single consumer.
struct Reporter {
    sender: Sender<ProgressEvent>,
    total: u64,
    extracted: AtomicUsize,
    errors: AtomicUsize,
}

impl Reporter {
    fn snapshot(&self) -> ProgressEvent {
        ProgressEvent::snapshot(
            self.extracted.load(Ordering::SeqCst) as u64,
            self.total,
            self.errors.load(Ordering::SeqCst) as u64,
        )
    }

    fn send(&self, event: ProgressEvent) {
        // a consumer that stopped listening only mutes reporting
        let _ = self.sender.send(event);
    }

    fn progress(&self, message: String) {
        let mut event = self.snapshot();
        event.message = Some(message);
        self.send(event);
    }

    fn success(&self, message: String) {
        self.extracted.fetch_add(1, Ordering::SeqCst);
        let mut event = self.snapshot();
        event.message = Some(message);
        self.send(event);
    }

    fn failure(&self, message: String) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let mut event = self.snapshot();
        event.message = Some(message.clone());
        event.error = Some(message);
        self.send(event);
    }

    fn done(&self) {
        let mut event = self.snapshot();
        event.is_done = true;
        event.message = Some(format!(
            "Complete. {} of {} entries extracted, {} errors.",
            event.extracted_count, self.total, event.error_count
        ));
        self.send(event);
    }

    fn canceled(&self) {
        let mut event = self.snapshot();
        event.was_canceled = true;
        event.message = Some("Extraction canceled.".to_string());
        self.send(event);
    }
}

const RECENT_LIMIT: usize = 10;

/// Consumer-side fold of the event stream.
///
/// Percent only moves forward, `is_done` and `was_canceled` latch once
/// observed, and the rolling message and error lists keep the most recent
/// lines (newest first, consecutive repeats collapsed).
#[derive(Debug, Clone, Default)]
pub struct ExtractionProgress {
    percent: f64,
    is_done: bool,
    was_canceled: bool,
    messages: Vec<String>,
    errors: Vec<String>,
    earliest: Option<DateTime<Utc>>,
    latest: Option<DateTime<Utc>>,
}

impl ExtractionProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the aggregate.
    pub fn update(&mut self, event: &ProgressEvent) {
        if event.total_count > 0 {
            self.advance_percent(event.extracted_count as f64 / event.total_count as f64);
        }
        self.observe_time(event.timestamp);

        if let Some(message) = &event.message {
            let list = if event.error.is_some() {
                &mut self.errors
            } else {
                &mut self.messages
            };
            if list.first() != Some(message) {
                list.insert(0, message.clone());
                list.truncate(RECENT_LIMIT);
            }
        }

        // latch only; out-of-order events must never unset these
        if event.is_done {
            self.is_done = true;
        }
        if event.was_canceled {
            self.was_canceled = true;
        }
    }

    /// Completed fraction, 0.0 through 1.0, non-decreasing.
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.percent
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.is_done
    }

    #[must_use]
    pub fn was_canceled(&self) -> bool {
        self.was_canceled
    }

    /// Most recent non-error messages, newest first.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Most recent error messages, newest first.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Wall-clock span between the earliest and latest observed events.
    #[must_use]
    pub fn time_taken(&self) -> chrono::Duration {
        match (self.earliest, self.latest) {
            (Some(first), Some(last)) => last - first,
            _ => chrono::Duration::zero(),
        }
    }

    fn advance_percent(&mut self, raw: f64) {
        let clamped = raw.min(1.0);
        if clamped > self.percent {
            self.percent = clamped;
        }
    }

    fn observe_time(&mut self, at: DateTime<Utc>) {
        if self.earliest.is_none_or(|t| t > at) {
            self.earliest = Some(at);
        }
        if self.latest.is_none_or(|t| t < at) {
            self.latest = Some(at);
        }
    }
}
