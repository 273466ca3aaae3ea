//! Training-history charts (`loss.png`, `accuracy.png`).
//!
//! One line per series over boosting rounds: blue is train, red is validation.
//! Validation series are drawn only when a validation split was used.
//!
//! No font backend is compiled into plotters, so charts carry grid lines but no
//! text; series names and files are reported through the log instead.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::domain::RoundMetrics;
use crate::error::AppError;

pub const LOSS_FILE: &str = "loss.png";
pub const ACCURACY_FILE: &str = "accuracy.png";

const SIZE: (u32, u32) = (800, 600);

/// Paths of the written charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotPaths {
    pub loss: PathBuf,
    pub accuracy: PathBuf,
}

struct Series {
    label: &'static str,
    points: Vec<(f64, f64)>,
    color: RGBColor,
}

/// Write `loss.png` and `accuracy.png` into `dir`.
pub fn plot_history(history: &[RoundMetrics], dir: &Path) -> Result<PlotPaths, AppError> {
    if history.is_empty() {
        return Err(AppError::insufficient_data("No training history to plot."));
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create plot dir '{}': {e}", dir.display())))?;

    let round = |m: &RoundMetrics| m.round as f64;

    let loss_series = vec![
        Series {
            label: "Train Loss",
            points: history.iter().map(|m| (round(m), m.train_loss)).collect(),
            color: BLUE,
        },
        Series {
            label: "Validation Loss",
            points: history.iter().filter_map(|m| Some((round(m), m.val_loss?))).collect(),
            color: RED,
        },
    ];
    let accuracy_series = vec![
        Series {
            label: "Train Accuracy",
            points: history.iter().map(|m| (round(m), m.train_accuracy)).collect(),
            color: BLUE,
        },
        Series {
            label: "Validation Accuracy",
            points: history.iter().filter_map(|m| Some((round(m), m.val_accuracy?))).collect(),
            color: RED,
        },
    ];

    let paths = PlotPaths {
        loss: dir.join(LOSS_FILE),
        accuracy: dir.join(ACCURACY_FILE),
    };
    draw_chart(&paths.loss, &loss_series)?;
    draw_chart(&paths.accuracy, &accuracy_series)?;

    tracing::info!(loss = %paths.loss.display(), accuracy = %paths.accuracy.display(), "wrote training plots");
    Ok(paths)
}

fn draw_chart(path: &Path, series: &[Series]) -> Result<(), AppError> {
    let series: Vec<&Series> = series.iter().filter(|s| !s.points.is_empty()).collect();
    let (x_range, y_range) = bounds(&series);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    // Without label areas the mesh draws grid lines only.
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err)?;
    chart.configure_mesh().draw().map_err(plot_err)?;

    for s in &series {
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), s.color.stroke_width(2)))
            .map_err(plot_err)?;
        tracing::debug!(path = %path.display(), series = s.label, points = s.points.len(), "drew series");
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Axis ranges covering every point, padded so flat lines stay visible.
fn bounds(series: &[&Series]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let points = series.iter().flat_map(|s| s.points.iter());
    let (mut x0, mut x1, mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    }
    if !(x0.is_finite() && x1.is_finite()) {
        (x0, x1) = (0.0, 1.0);
    }
    if !(y0.is_finite() && y1.is_finite()) {
        (y0, y1) = (0.0, 1.0);
    }
    if x1 - x0 < 1.0 {
        x1 = x0 + 1.0;
    }
    let pad = if y1 > y0 { 0.05 * (y1 - y0) } else { 0.5 * y0.abs().max(1.0) };
    (x0..x1, (y0 - pad)..(y1 + pad))
}

fn plot_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::numeric(format!("Failed to draw chart: {e}"))
}
