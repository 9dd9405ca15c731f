pub mod report;
pub mod sampler;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::corpus::queue::{QUEUE_SUBDIR, scan_queue};
use crate::coverage::sampler::{CoverageSample, cumulative_coverage};
use crate::runner::replay::replay_corpus;

/// Scratch directory holding one run's raw profiles while it is analyzed.
pub fn profile_dir_for(run: &str) -> PathBuf {
    PathBuf::from(format!("temp_{}_profraw", run.replace('/', "_")))
}

/// Produce the cumulative coverage curve for one fuzzer run directory.
///
/// Scans `<run>/default/queue`, replays every timed entry through the
/// harness, then samples branch coverage at the configured checkpoints.
/// The per-run profile directory is deleted on success.
pub fn analyze_run(
    run: &str,
    harness: &Path,
    time_shift: i64,
    base_checkpoints: &[usize],
) -> Result<Vec<CoverageSample>> {
    let queue_dir = Path::new(run).join(QUEUE_SUBDIR);
    let entries = scan_queue(&queue_dir)?;
    if entries.is_empty() {
        bail!("no queue entries with a time token in {:?}", queue_dir);
    }
    println!("[+] Found {} queue files", entries.len());
    if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
        println!(
            "    Time range: {:.1}s to {:.1}s",
            first.time_sec, last.time_sec
        );
    }

    let profraw_dir = profile_dir_for(run);
    let profiles = replay_corpus(harness, &entries, &profraw_dir)?;
    let samples = cumulative_coverage(&profiles, harness, &entries, time_shift, base_checkpoints)?;
    fs::remove_dir_all(&profraw_dir)
        .with_context(|| format!("failed to remove profile directory {:?}", profraw_dir))?;
    Ok(samples)
}
