use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TIME_TOKEN: Regex = Regex::new(r"time:(\d+)").unwrap();
}

/// Relative location of the queue inside an AFL++ output directory.
pub const QUEUE_SUBDIR: &str = "default/queue";

/// One corpus entry: the file the fuzzer saved plus the moment it found it.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Seconds since the fuzzing run started, parsed from the filename.
    pub time_sec: f64,
    pub path: PathBuf,
}

/// Extract the elapsed time encoded in a queue filename.
///
/// AFL++ names entries like `id:000123,src:000042,time:4567,op:havoc`; the
/// `time:` value is milliseconds since the run started. Returns seconds, or
/// `None` when the name carries no token (or a value too large for a u64).
pub fn parse_entry_time(name: &str) -> Option<f64> {
    let caps = TIME_TOKEN.captures(name)?;
    let ms: u64 = caps[1].parse().ok()?;
    Some(ms as f64 / 1000.0)
}

/// Scan a queue directory into entries ordered by elapsed time.
///
/// Regular files without a `time:` token are silently skipped. Ordering is
/// ascending by time, ties broken by filename.
pub fn scan_queue(queue_dir: &Path) -> Result<Vec<QueueEntry>> {
    let dir = fs::read_dir(queue_dir)
        .with_context(|| format!("queue directory not found: {:?}", queue_dir))?;

    let mut entries = Vec::new();
    for item in dir {
        let item =
            item.with_context(|| format!("failed to read queue directory {:?}", queue_dir))?;
        let file_type = item
            .file_type()
            .with_context(|| format!("failed to stat queue entry {:?}", item.path()))?;
        if !file_type.is_file() {
            continue;
        }
        let name = item.file_name();
        let Some(time_sec) = parse_entry_time(&name.to_string_lossy()) else {
            continue;
        };
        entries.push(QueueEntry {
            time_sec,
            path: item.path(),
        });
    }

    // Name order first, then a stable sort by time, so equal timestamps keep
    // a deterministic filename order.
    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    entries.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));
    Ok(entries)
}
