use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::coverage::sampler::CoverageSample;

/// One analyzed run as it appears in the exported JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportedRun {
    pub name: String,
    pub label: String,
    pub time_shift: i64,
    pub samples: Vec<CoverageSample>,
}

/// Top-level document written by `--export-data`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportedComparison {
    pub generated_at: String,
    pub harness: String,
    pub log_scale: bool,
    pub runs: Vec<ExportedRun>,
}

/// Write the sampled curves as pretty-printed JSON, atomically.
pub fn write_samples(
    path: &Path,
    harness: &Path,
    log_scale: bool,
    runs: Vec<ExportedRun>,
) -> Result<()> {
    let data = ExportedComparison {
        generated_at: Utc::now().to_rfc3339(),
        harness: harness.display().to_string(),
        log_scale,
        runs,
    };
    let blob = serde_json::to_vec_pretty(&data)
        .with_context(|| "failed to serialize coverage samples".to_string())?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, blob)
        .with_context(|| format!("failed to write temp export {:?}", temp_path))?;
    fs::rename(&temp_path, path)
        .with_context(|| "failed to atomically update export file".to_string())?;
    Ok(())
}
