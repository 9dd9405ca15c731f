use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Marker of the aggregate row in `llvm-cov report` output.
const TOTAL_MARKER: &str = "TOTAL";

// Whitespace-split field positions in the aggregate row.
const BRANCH_TOTAL_FIELD: usize = 10;
const BRANCH_MISSED_FIELD: usize = 11;
const MIN_REPORT_FIELDS: usize = 13;

fn report_tool() -> String {
    std::env::var("LLVM_COV").unwrap_or_else(|_| "llvm-cov".to_string())
}

/// Parse the aggregate row of an `llvm-cov report` summary.
///
/// Contract: scan lines in reverse and take the first one starting with
/// `TOTAL`; split it on whitespace; require at least 13 fields; field 10 is
/// the branch total and field 11 the missed count. Returns
/// `(branches covered, branches total)`. Any deviation, no aggregate row,
/// too few fields, non-numeric or inconsistent counts, yields `(0, 0)` so a
/// single malformed report cannot abort a long comparison run.
pub fn parse_branch_summary(report: &str) -> (u64, u64) {
    for line in report.lines().rev() {
        if !line.starts_with(TOTAL_MARKER) {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_REPORT_FIELDS {
            return (0, 0);
        }
        let total: u64 = match fields[BRANCH_TOTAL_FIELD].parse() {
            Ok(value) => value,
            Err(_) => return (0, 0),
        };
        let missed: u64 = match fields[BRANCH_MISSED_FIELD].parse() {
            Ok(value) => value,
            Err(_) => return (0, 0),
        };
        if missed > total {
            return (0, 0);
        }
        return (total - missed, total);
    }
    (0, 0)
}

/// Ask the report tool for the branch totals of a merged profile database.
///
/// The tool name defaults to `llvm-cov` and can be overridden with the
/// `LLVM_COV` environment variable. Invocation failures are errors and abort
/// the current run's analysis; parse problems are not, per
/// [`parse_branch_summary`].
pub fn branch_coverage(harness: &Path, profdata: &Path) -> Result<(u64, u64)> {
    let tool = report_tool();
    let output = Command::new(&tool)
        .arg("report")
        .arg(harness)
        .arg(format!("-instr-profile={}", profdata.display()))
        .output()
        .with_context(|| format!("failed to run {} report", tool))?;
    if !output.status.success() {
        bail!(
            "{} report failed with {}: {}",
            tool,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(parse_branch_summary(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ENV_LOCK, scratch_dir, write_script};

    const REPORT: &str = "\
Filename    Regions  Missed Regions  Cover  Functions  Missed Functions  Executed  Lines  Missed Lines  Cover  Branches  Missed Branches  Cover
-----------------------------------------------------------------------------------------------------------------------------------------------
parser.cpp      120              30 75.00%         25                 5    80.00%    400            80 80.00%        96               24 75.00%
-----------------------------------------------------------------------------------------------------------------------------------------------
TOTAL           120              30 75.00%         25                 5    80.00%    400            80 80.00%        96               24 75.00%";

    #[test]
    fn test_parse_aggregate_row() {
        assert_eq!(parse_branch_summary(REPORT), (72, 96));
    }

    #[test]
    fn test_parse_takes_last_total_row() {
        let doubled = format!(
            "TOTAL 1 1 0% 1 1 0% 1 1 0% 10 10 0%\n{}",
            REPORT
        );
        assert_eq!(parse_branch_summary(&doubled), (72, 96));
    }

    #[test]
    fn test_parse_truncated_row_yields_zero() {
        assert_eq!(parse_branch_summary("TOTAL 120 30 75.00%"), (0, 0));
    }

    #[test]
    fn test_parse_non_numeric_yields_zero() {
        let report = "TOTAL a b c d e f g h i junk junk 0%";
        assert_eq!(parse_branch_summary(report), (0, 0));
    }

    #[test]
    fn test_parse_missed_exceeding_total_yields_zero() {
        let report = "TOTAL 120 30 75.00% 25 5 80.00% 400 80 80.00% 10 24 75.00%";
        assert_eq!(parse_branch_summary(report), (0, 0));
    }

    #[test]
    fn test_parse_without_aggregate_row_yields_zero() {
        assert_eq!(parse_branch_summary("no totals here\nat all"), (0, 0));
        assert_eq!(parse_branch_summary(""), (0, 0));
    }

    #[test]
    fn test_report_failure_is_an_error() {
        let _guard = ENV_LOCK.lock().expect("failed to lock env mutex");
        let dir = scratch_dir("report_fail");
        let tool = dir.join("llvm-cov");
        write_script(&tool, "#!/bin/sh\necho 'no profile data' >&2\nexit 1\n");

        unsafe {
            std::env::set_var("LLVM_COV", &tool);
        }
        let result = branch_coverage(Path::new("harness"), &dir.join("merged.profdata"));
        unsafe {
            std::env::remove_var("LLVM_COV");
        }

        let err = result.expect_err("report should fail");
        let message = format!("{}", err);
        assert!(message.contains("report failed"));
        assert!(message.contains("no profile data"));
    }
}
