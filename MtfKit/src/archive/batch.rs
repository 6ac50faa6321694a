//! Batch operations over directories of archives

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::pipeline::{CancelToken, ProgressEvent, extract_archive};

/// Result of extracting a set of archives.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Archives whose runs finished without per-entry errors.
    pub success_count: usize,
    /// Archives that finished with errors or never produced a result.
    pub fail_count: usize,
    /// One summary line per archive processed.
    pub results: Vec<String>,
}

/// Find all `.mtf` archives under a directory recursively.
///
/// # Returns
/// A sorted list of paths to archives found in the directory tree.
pub fn find_mtf_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut archives: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("mtf"))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    archives.sort();
    archives
}

/// Extract every archive in `archives` under `output_root`.
///
/// Each archive runs through [`extract_archive`] in turn; every event is
/// forwarded to `on_event`. A cancelled token stops the batch between
/// archives (and the in-flight run at its own checkpoints).
pub fn batch_extract<F>(
    archives: &[PathBuf],
    output_root: &Path,
    cancel: &CancelToken,
    mut on_event: F,
) -> BatchResult
where
    F: FnMut(&ProgressEvent),
{
    let mut batch = BatchResult::default();

    for archive in archives {
        if cancel.is_canceled() {
            batch.results.push("Batch canceled.".to_string());
            break;
        }

        let receiver = extract_archive(archive, output_root, cancel.clone());
        let mut terminal: Option<ProgressEvent> = None;
        for event in receiver {
            on_event(&event);
            if event.is_terminal() {
                terminal = Some(event);
            }
        }

        match terminal {
            Some(event) if event.was_canceled => {
                batch.results.push(format!("Canceled: {}", archive.display()));
            }
            Some(event) if event.error_count == 0 => {
                batch.success_count += 1;
                batch.results.push(format!("Extracted: {}", archive.display()));
            }
            Some(event) => {
                batch.fail_count += 1;
                batch.results.push(format!(
                    "Finished with {} errors: {}",
                    event.error_count,
                    archive.display()
                ));
            }
            None => {
                batch.fail_count += 1;
                batch
                    .results
                    .push(format!("No result: {}", archive.display()));
            }
        }
    }

    batch
}
