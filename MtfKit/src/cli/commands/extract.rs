//! CLI command for archive extraction

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use crate::archive::{
    CancelToken, ExtractionProgress, batch_extract, extract_archive, extract_entry,
    find_mtf_files, scan_index,
};
use crate::cli::progress::{LOOKING_GLASS, PACKAGE, print_done, print_step, simple_bar, simple_spinner};
use crate::error::Error;

pub fn execute(
    source: &Path,
    destination: &Path,
    file: Option<&str>,
    quiet: bool,
) -> anyhow::Result<()> {
    if let Some(entry_name) = file {
        return extract_single(source, destination, entry_name);
    }

    if source.is_dir() {
        return extract_directory(source, destination, quiet);
    }

    extract_one_archive(source, destination, quiet)
}

/// Extract one named entry to `destination`, nothing else.
fn extract_single(source: &Path, destination: &Path, entry_name: &str) -> anyhow::Result<()> {
    let file = File::open(source).with_context(|| format!("opening {}", source.display()))?;
    let mut archive = BufReader::new(file);

    print_step(1, 2, LOOKING_GLASS, "Scanning archive index...");
    let index = scan_index(&mut archive)?;
    let entry = index
        .find(entry_name)
        .ok_or_else(|| Error::EntryNotFound(entry_name.to_string()))?;

    print_step(2, 2, PACKAGE, &format!("Extracting `{entry_name}`..."));
    let bytes = extract_entry(&mut archive, entry)?;

    let target = destination.join(&entry.file_name);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, &bytes)?;

    println!("Wrote {} ({} bytes)", target.display(), bytes.len());
    Ok(())
}

/// Extract a whole archive, rendering the event stream.
fn extract_one_archive(source: &Path, destination: &Path, quiet: bool) -> anyhow::Result<()> {
    let started = Instant::now();
    let receiver = extract_archive(source, destination, CancelToken::new());

    let mut progress = ExtractionProgress::new();
    let mut bar = None;
    let mut terminal = None;

    for event in receiver {
        if !quiet {
            let bar = bar.get_or_insert_with(|| simple_bar(event.total_count, "Extracting"));
            bar.set_position(event.extracted_count);
            if let Some(message) = &event.message {
                bar.set_message(short_message(message));
            }
        }
        let is_terminal = event.is_terminal();
        progress.update(&event);
        if is_terminal {
            terminal = Some(event);
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let terminal = terminal.context("extraction ended without a terminal event")?;
    if let Some(message) = &terminal.message {
        println!("{message}");
    }
    for error in progress.errors() {
        eprintln!("  {error}");
    }
    if !quiet {
        print_done(started.elapsed());
    }

    if terminal.error_count > 0 {
        anyhow::bail!("{} entries failed", terminal.error_count);
    }
    Ok(())
}

/// Extract every `.mtf` archive found under `source`.
fn extract_directory(source: &Path, destination: &Path, quiet: bool) -> anyhow::Result<()> {
    let archives = find_mtf_files(source);
    if archives.is_empty() {
        println!("No .mtf archives under {}", source.display());
        return Ok(());
    }

    println!(
        "Extracting {} archives to {}",
        archives.len(),
        destination.display()
    );

    let started = Instant::now();
    let cancel = CancelToken::new();
    let batch = if quiet {
        batch_extract(&archives, destination, &cancel, |_| {})
    } else {
        let spinner = simple_spinner("Extracting archives");
        let batch = batch_extract(&archives, destination, &cancel, |event| {
            if let Some(message) = &event.message {
                spinner.set_message(short_message(message));
            }
        });
        spinner.finish_and_clear();
        batch
    };

    for line in &batch.results {
        println!("  {line}");
    }
    println!(
        "{} archives extracted, {} with errors",
        batch.success_count, batch.fail_count
    );
    if !quiet {
        print_done(started.elapsed());
    }

    if batch.fail_count > 0 {
        anyhow::bail!("{} archives had errors", batch.fail_count);
    }
    Ok(())
}

/// Trim a progress message to its last path segment for the bar line.
fn short_message(message: &str) -> String {
    message.rsplit('/').next().unwrap_or(message).to_string()
}
