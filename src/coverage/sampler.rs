use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::corpus::queue::QueueEntry;
use crate::coverage::report::branch_coverage;
use crate::runner::replay::ReplayProfile;

/// Queue positions at which coverage is sampled, besides the final entry.
pub const DEFAULT_CHECKPOINTS: &[usize] = &[0, 10, 20, 50, 100, 200, 500, 1000];

/// One point on a run's cumulative coverage curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageSample {
    pub time_sec: f64,
    pub branches_covered: u64,
    pub branches_total: u64,
}

/// Select which profile indices get a merge + report pass.
///
/// Keeps the base checkpoints that fall inside the corpus, always includes
/// the first and last profile, and returns the result sorted and deduplicated.
pub fn checkpoint_indices(profile_count: usize, base: &[usize]) -> Vec<usize> {
    if profile_count == 0 {
        return Vec::new();
    }
    let mut indices: Vec<usize> = base
        .iter()
        .copied()
        .filter(|&idx| idx < profile_count)
        .collect();
    indices.push(0);
    indices.push(profile_count - 1);
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn merge_tool() -> String {
    std::env::var("LLVM_PROFDATA").unwrap_or_else(|_| "llvm-profdata".to_string())
}

/// Merge raw profiles into one indexed database at `out`.
///
/// Tool name defaults to `llvm-profdata`, overridable with the
/// `LLVM_PROFDATA` environment variable.
pub fn merge_profiles(out: &Path, inputs: &[ReplayProfile]) -> Result<()> {
    let tool = merge_tool();
    let mut command = Command::new(&tool);
    command.arg("merge").arg("-o").arg(out);
    for profile in inputs {
        command.arg(&profile.path);
    }
    let status = command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to run {} merge", tool))?;
    if !status.success() {
        bail!("{} merge failed with {}", tool, status);
    }
    Ok(())
}

/// Walk the checkpoints and compute the coverage reached by each prefix of
/// the corpus.
///
/// Each sample is stamped with the submission time of the checkpoint's queue
/// entry, shifted by `time_shift` seconds and clamped to at least one second
/// so log-scale plots stay valid. The merged database is written next to the
/// checkpoint's raw profile and removed once reported.
pub fn cumulative_coverage(
    profiles: &[ReplayProfile],
    harness: &Path,
    entries: &[QueueEntry],
    time_shift: i64,
    base_checkpoints: &[usize],
) -> Result<Vec<CoverageSample>> {
    if profiles.is_empty() {
        return Ok(Vec::new());
    }
    let checkpoints = checkpoint_indices(profiles.len(), base_checkpoints);
    println!(
        "[*] Computing cumulative coverage at {} sample points...",
        checkpoints.len()
    );

    let mut samples = Vec::with_capacity(checkpoints.len());
    for checkpoint in checkpoints {
        let profile = &profiles[checkpoint];
        let merged = profile.path.with_extension("profdata");
        merge_profiles(&merged, &profiles[..=checkpoint])?;
        let (covered, total) = branch_coverage(harness, &merged)?;

        let entry = entries.get(profile.entry_index).with_context(|| {
            format!("profile {} has no matching queue entry", profile.entry_index)
        })?;
        let adjusted = (entry.time_sec + time_shift as f64).max(1.0);

        println!(
            "    File {}/{}: {}/{} branches at {:.1}s",
            checkpoint + 1,
            profiles.len(),
            covered,
            total,
            adjusted
        );
        samples.push(CoverageSample {
            time_sec: adjusted,
            branches_covered: covered,
            branches_total: total,
        });
        fs::remove_file(&merged)
            .with_context(|| format!("failed to remove merged profile {:?}", merged))?;
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ENV_LOCK, scratch_dir, write_script};

    #[test]
    fn test_checkpoints_large_corpus() {
        assert_eq!(
            checkpoint_indices(1500, DEFAULT_CHECKPOINTS),
            vec![0, 10, 20, 50, 100, 200, 500, 1000, 1499]
        );
    }

    #[test]
    fn test_checkpoints_small_corpus() {
        assert_eq!(checkpoint_indices(5, DEFAULT_CHECKPOINTS), vec![0, 4]);
        assert_eq!(checkpoint_indices(1, DEFAULT_CHECKPOINTS), vec![0]);
    }

    #[test]
    fn test_checkpoints_empty_corpus() {
        assert!(checkpoint_indices(0, DEFAULT_CHECKPOINTS).is_empty());
    }

    #[test]
    fn test_checkpoints_custom_base_with_duplicates() {
        assert_eq!(checkpoint_indices(100, &[50, 7, 50]), vec![0, 7, 50, 99]);
    }

    #[test]
    fn test_checkpoints_last_entry_not_duplicated() {
        let indices = checkpoint_indices(1001, DEFAULT_CHECKPOINTS);
        assert_eq!(indices.iter().filter(|&&idx| idx == 1000).count(), 1);
    }

    #[test]
    fn test_merge_failure_is_an_error() {
        let _guard = ENV_LOCK.lock().expect("failed to lock env mutex");
        let dir = scratch_dir("sampler_merge_fail");
        let tool = dir.join("llvm-profdata");
        write_script(&tool, "#!/bin/sh\nexit 1\n");

        unsafe {
            std::env::set_var("LLVM_PROFDATA", &tool);
        }
        let profiles = vec![ReplayProfile {
            entry_index: 0,
            path: dir.join("000000.profraw"),
        }];
        let result = merge_profiles(&dir.join("out.profdata"), &profiles);
        unsafe {
            std::env::remove_var("LLVM_PROFDATA");
        }

        let err = result.expect_err("merge should fail");
        assert!(format!("{}", err).contains("merge failed"));
    }
}
