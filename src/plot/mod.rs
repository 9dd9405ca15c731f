use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::{Ranged, ValueFormatter};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::coverage::sampler::CoverageSample;

/// Per-series palette, applied by run position.
pub const SERIES_COLORS: [RGBColor; 5] = [
    RGBColor(0x2e, 0x86, 0xab),
    RGBColor(0xa2, 0x3b, 0x72),
    RGBColor(0xf1, 0x8f, 0x01),
    RGBColor(0xc7, 0x3e, 0x1d),
    RGBColor(0x6a, 0x99, 0x4e),
];

const PLOT_SIZE: (u32, u32) = (1200, 700);

/// One run's curve as it appears on the comparison chart.
#[derive(Debug, Clone)]
pub struct RunSeries {
    pub name: String,
    pub label: String,
    pub samples: Vec<CoverageSample>,
}

fn axis_ranges(runs: &[RunSeries]) -> (Range<f64>, Range<f64>) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_max = 0.0f64;
    for run in runs {
        for sample in &run.samples {
            x_min = x_min.min(sample.time_sec);
            x_max = x_max.max(sample.time_sec);
            y_max = y_max.max(sample.branches_covered as f64);
        }
    }
    if !x_min.is_finite() {
        return (1.0..10.0, 0.0..10.0);
    }
    // Pad the data envelope, keeping the x axis strictly positive for the
    // log-scale variant.
    let x_start = (x_min * 0.9).max(0.5);
    let x_end = (x_max * 1.1).max(x_start + 1.0);
    let y_end = (y_max * 1.1).max(10.0);
    (x_start..x_end, 0.0..y_end)
}

fn draw_series_set<'a, DB, X>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<X, RangedCoordf64>>,
    runs: &[RunSeries],
    x_desc: &str,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    X: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Branch Coverage")
        .label_style(("sans-serif", 15))
        .axis_desc_style(("sans-serif", 18))
        .light_line_style(BLACK.mix(0.08))
        .bold_line_style(BLACK.mix(0.18))
        .draw()?;

    for (idx, run) in runs.iter().enumerate() {
        if run.samples.is_empty() {
            continue;
        }
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        let points: Vec<(f64, f64)> = run
            .samples
            .iter()
            .map(|sample| (sample.time_sec, sample.branches_covered as f64))
            .collect();
        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(run.label.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
            });
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 16))
        .draw()?;
    Ok(())
}

/// Render every run's coverage curve into one PNG at `output`.
///
/// Runs without samples are skipped but still consume their palette slot so
/// colors stay stable across reruns of the same command line.
pub fn render_comparison(output: &Path, runs: &[RunSeries], log_scale: bool) -> Result<()> {
    let root = BitMapBackend::new(output, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (x_range, y_range) = axis_ranges(runs);

    let mut builder = ChartBuilder::on(&root);
    builder
        .caption("Fuzzer Coverage Comparison Over Time", ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(64);

    if log_scale {
        let mut chart = builder.build_cartesian_2d(x_range.log_scale(), y_range)?;
        draw_series_set(&mut chart, runs, "Time (seconds, log scale)")?;
    } else {
        let mut chart = builder.build_cartesian_2d(x_range, y_range)?;
        draw_series_set(&mut chart, runs, "Time (seconds)")?;
    }
    root.present()
        .with_context(|| format!("failed to write plot to {:?}", output))?;
    Ok(())
}
