use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, bail};

/// Counters reported after a derivation pass.
#[derive(Debug, Default)]
pub struct DeriveStats {
    pub files_written: usize,
    pub entries_written: usize,
}

/// Flatten the `:` separators of AFL queue names for the artifact files.
pub fn sanitize_name(name: &str) -> String {
    name.replace(':', "_")
}

/// Pipe one payload through the encoder and return its stdout lines.
///
/// A non-zero exit is reported on stderr and yields `Ok(None)` so a single
/// bad queue entry does not stop the pass. Spawn failures are real errors.
pub fn run_encoder(encoder: &Path, payload: Vec<u8>) -> Result<Option<Vec<String>>> {
    let mut child = Command::new(encoder)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn encoder {:?}", encoder))?;

    let mut stdin = child.stdin.take().context("encoder stdin not piped")?;
    // Feed from a separate thread, the encoder can fill its stdout pipe
    // before it drains stdin.
    let feeder = thread::spawn(move || {
        let _ = stdin.write_all(&payload);
    });
    let output = child
        .wait_with_output()
        .with_context(|| format!("failed to wait for encoder {:?}", encoder))?;
    let _ = feeder.join();

    if !output.status.success() {
        eprintln!(
            "[WARN] encoder failed (code {})",
            output.status.code().unwrap_or(-1)
        );
        if !output.stderr.is_empty() {
            eprint!("{}", String::from_utf8_lossy(&output.stderr));
        }
        return Ok(None);
    }
    let lines = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect();
    Ok(Some(lines))
}

/// Run every queue entry through the encoder and write one artifact per
/// entry that produced output.
///
/// Artifacts are named after the queue entry with `:` flattened to `_`;
/// entries whose names are not valid UTF-8 are skipped with a warning. Two
/// entries collapsing onto the same artifact name is an error, silently
/// overwriting earlier output would corrupt the seed set.
pub fn derive_seeds(queue_dir: &Path, encoder: &Path, output_dir: &Path) -> Result<DeriveStats> {
    if !queue_dir.is_dir() {
        bail!("queue directory not found: {:?}", queue_dir);
    }
    if !encoder.is_file() {
        bail!("encoder binary not found: {:?}", encoder);
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory {:?}", output_dir))?;

    let mut paths = Vec::new();
    for entry in fs::read_dir(queue_dir)
        .with_context(|| format!("failed to read queue directory {:?}", queue_dir))?
    {
        let entry = entry.with_context(|| "failed to read queue directory entry".to_string())?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat queue entry {:?}", entry.path()))?;
        if file_type.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut stats = DeriveStats::default();
    let mut emitted: HashSet<String> = HashSet::new();
    for path in paths {
        let payload =
            fs::read(&path).with_context(|| format!("failed to read queue entry {:?}", path))?;
        let Some(outputs) = run_encoder(encoder, payload)? else {
            continue;
        };
        if outputs.is_empty() {
            continue;
        }

        let Some(name) = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(sanitize_name)
        else {
            eprintln!("[WARN] skipping queue entry with non-UTF-8 name {:?}", path);
            continue;
        };
        if !emitted.insert(name.clone()) {
            bail!(
                "sanitized name {:?} already written; refusing to overwrite (source {:?})",
                name,
                path
            );
        }
        let out_path = output_dir.join(&name);
        fs::write(&out_path, outputs.join("\n") + "\n")
            .with_context(|| format!("failed to write seed file {:?}", out_path))?;
        stats.entries_written += outputs.len();
        stats.files_written += 1;
    }
    Ok(stats)
}
