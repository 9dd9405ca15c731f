use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::corpus::queue::QueueEntry;

/// Environment variable the instrumented target reads to decide where to
/// write its raw profile.
pub const PROFILE_ENV: &str = "LLVM_PROFILE_FILE";

/// A raw coverage profile tied to the queue entry whose replay produced it.
#[derive(Debug, Clone)]
pub struct ReplayProfile {
    pub entry_index: usize,
    pub path: PathBuf,
}

/// Replay every queue entry through the harness, capturing one profile per
/// replay into a freshly-cleared directory.
///
/// Each entry's bytes go to the harness on stdin; stdout/stderr are
/// discarded. A non-zero exit is not an error, fuzzing corpora are expected
/// to contain crashing inputs. Only profiles that actually exist afterwards
/// are returned, each carrying the index of the entry that produced it.
pub fn replay_corpus(
    harness: &Path,
    entries: &[QueueEntry],
    profraw_dir: &Path,
) -> Result<Vec<ReplayProfile>> {
    println!(
        "[*] Running {} inputs through coverage harness...",
        entries.len()
    );

    if profraw_dir.exists() {
        fs::remove_dir_all(profraw_dir)
            .with_context(|| format!("failed to clear profile directory {:?}", profraw_dir))?;
    }
    fs::create_dir_all(profraw_dir)
        .with_context(|| format!("failed to create profile directory {:?}", profraw_dir))?;

    let mut profiles = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        if (idx + 1) % 100 == 0 {
            println!("    Progress: {}/{}", idx + 1, entries.len());
        }

        let profile_path = profraw_dir.join(format!("{:06}.profraw", idx));
        let input = File::open(&entry.path)
            .with_context(|| format!("failed to open queue entry {:?}", entry.path))?;
        // Exit status deliberately ignored; crashers are part of the corpus.
        Command::new(harness)
            .env(PROFILE_ENV, &profile_path)
            .stdin(Stdio::from(input))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to run harness {:?}", harness))?;

        if profile_path.exists() {
            profiles.push(ReplayProfile {
                entry_index: idx,
                path: profile_path,
            });
        } else {
            eprintln!("[WARN] no profile emitted for {:?}", entry.path);
        }
    }

    println!("[+] Collected {} coverage profiles", profiles.len());
    Ok(profiles)
}
