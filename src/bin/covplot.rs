use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use covplot::coverage::analyze_run;
use covplot::coverage::sampler::DEFAULT_CHECKPOINTS;
use covplot::export::{ExportedRun, write_samples};
use covplot::plot::{RunSeries, render_comparison};

/// Command-line arguments for the coverage plotter
#[derive(Parser, Debug)]
#[clap(author, version, about = "Plot cumulative branch coverage for AFL++ runs")]
struct Cli {
    /// Colon-separated list of fuzzer output directories
    #[clap(long)]
    runs: String,

    /// Colon-separated list of plot labels, aligned with --runs
    #[clap(long)]
    labels: Option<String>,

    /// Colon-separated list of time shifts in seconds, aligned with --runs
    #[clap(long)]
    time_shifts: Option<String>,

    /// Output filename for the rendered chart
    #[clap(long, default_value = "coverage_comparison.png")]
    output: PathBuf,

    /// Coverage-instrumented harness binary
    #[clap(long)]
    harness: PathBuf,

    /// Use a logarithmic scale for the time axis
    #[clap(long)]
    log_scale: bool,

    /// Comma-separated queue positions to sample, besides first and last
    #[clap(long)]
    checkpoints: Option<String>,

    /// Also write the sampled curves as JSON
    #[clap(long)]
    export_data: Option<PathBuf>,
}

fn resolve_labels(runs: &[String], raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) => {
            let given: Vec<&str> = raw.split(':').collect();
            runs.iter()
                .enumerate()
                .map(|(idx, run)| match given.get(idx) {
                    Some(label) => label.to_string(),
                    None => run.clone(),
                })
                .collect()
        }
        None => runs.iter().map(|run| format!("Run {}", run)).collect(),
    }
}

fn resolve_time_shifts(runs: &[String], raw: Option<&str>) -> Result<Vec<i64>> {
    let mut shifts = match raw {
        Some(raw) => {
            let mut shifts = Vec::new();
            for part in raw.split(':') {
                let shift = part
                    .parse::<i64>()
                    .with_context(|| format!("invalid time shift {:?}", part))?;
                shifts.push(shift);
            }
            shifts
        }
        None => Vec::new(),
    };
    shifts.resize(runs.len(), 0);
    Ok(shifts)
}

fn resolve_checkpoints(raw: Option<&str>) -> Result<Vec<usize>> {
    match raw {
        Some(raw) => {
            let mut points = Vec::new();
            for part in raw.split(',') {
                let point = part
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("invalid checkpoint {:?}", part))?;
                points.push(point);
            }
            Ok(points)
        }
        None => Ok(DEFAULT_CHECKPOINTS.to_vec()),
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let runs: Vec<String> = args.runs.split(':').map(str::to_string).collect();
    let labels = resolve_labels(&runs, args.labels.as_deref());
    let time_shifts = resolve_time_shifts(&runs, args.time_shifts.as_deref())?;
    let checkpoints = resolve_checkpoints(args.checkpoints.as_deref())?;

    if !args.harness.exists() {
        eprintln!("[!] Harness not found: {:?}", args.harness);
        process::exit(1);
    }
    let harness = fs::canonicalize(&args.harness)
        .with_context(|| format!("failed to resolve harness path {:?}", args.harness))?;
    println!("[*] Using harness: {:?}", harness);

    let mut collected: Vec<RunSeries> = Vec::new();
    let mut exported: Vec<ExportedRun> = Vec::new();
    for (idx, run) in runs.iter().enumerate() {
        println!("\n{}", "=".repeat(60));
        println!("Analyzing: {}", run);
        println!("{}", "=".repeat(60));

        match analyze_run(run, &harness, time_shifts[idx], &checkpoints) {
            Ok(samples) => {
                exported.push(ExportedRun {
                    name: run.clone(),
                    label: labels[idx].clone(),
                    time_shift: time_shifts[idx],
                    samples: samples.clone(),
                });
                collected.push(RunSeries {
                    name: run.clone(),
                    label: labels[idx].clone(),
                    samples,
                });
            }
            Err(err) => {
                eprintln!("[!] Error analyzing {}: {:?}", run, err);
                continue;
            }
        }
    }

    if collected.is_empty() {
        println!("[!] No data collected from any runs");
        return Ok(());
    }

    render_comparison(&args.output, &collected, args.log_scale)?;
    println!("\n[+] Plot saved to: {:?}", args.output);

    if let Some(export_path) = &args.export_data {
        write_samples(export_path, &harness, args.log_scale, exported)?;
        println!("[+] Samples exported to: {:?}", export_path);
    }
    println!("\n[+] Done!");
    Ok(())
}
