//! Formatted run summary.
//!
//! Formatting lives here so the pipeline only returns data. The summary always
//! ends with the `acc is <value>` line.

use crate::app::pipeline::{ModelSource, RunOutput};
use crate::domain::{DivisorMode, Interval, RunConfig, ScoredSample};

/// Number of held-out predictions echoed in the summary.
pub const PREVIEW_ROWS: usize = 5;

/// Format the full run summary (data, split, model, test metrics, accuracy).
pub fn format_run_summary(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str("=== salary - salary range predictor ===\n");
    match config.synthetic {
        Some(n) => out.push_str(&format!("Data: synthetic ({n} records, seed {})\n", config.seed)),
        None => out.push_str(&format!("Data: {}\n", config.data_path.display())),
    }
    let stats = &run.ingest.stats;
    out.push_str(&format!(
        "Records: n={} (rows read {}, skipped {}) | lower>={:.0} upper<={:.0} mean width {:.0}\n",
        stats.n_records,
        run.ingest.rows_read,
        run.ingest.row_errors.len(),
        stats.lower_min,
        stats.upper_max,
        stats.mean_width
    ));
    out.push_str(&format!(
        "Tokenizer: {} | max_len={}\n",
        config
            .tokenizer_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("corpus vocabulary ({} ids max)", config.vocab_size)),
        config.max_len
    ));
    out.push_str(&format!(
        "Split: train={} validation={} test={} (seed {})\n",
        run.split.train, run.split.validation, run.split.test, config.seed
    ));

    out.push_str("\nModel:\n");
    match &run.source {
        ModelSource::Trained {
            history,
            best_round,
            stopped_early,
        } => {
            out.push_str(&format!(
                "- gradient boosting x2, rounds={} shrinkage={} max_depth={}\n",
                run.model.rounds(),
                config.boost.learning_rate,
                config.boost.max_depth
            ));
            if *stopped_early {
                out.push_str(&format!(
                    "- stopped early after {} rounds, kept round {best_round}\n",
                    history.len()
                ));
            }
            if let Some(last) = history.get(best_round.saturating_sub(1)) {
                out.push_str(&format!(
                    "- train loss={:.3} acc={:.4}\n",
                    last.train_loss, last.train_accuracy
                ));
                if let (Some(loss), Some(acc)) = (last.val_loss, last.val_accuracy) {
                    out.push_str(&format!("- validation loss={loss:.3} acc={acc:.4}\n"));
                }
            }
        }
        ModelSource::Loaded { path, best_round } => {
            out.push_str(&format!(
                "- loaded from {} (rounds={}, best round {best_round})\n",
                path.display(),
                run.model.rounds()
            ));
        }
    }

    out.push_str(&format!("\nTest ({:?} loss): {:.3}\n", config.loss, run.test_loss));
    out.push_str(&format_preview(&run.scored, PREVIEW_ROWS));

    if let Some(paths) = &run.plots {
        out.push_str(&format!(
            "\nPlots: {}, {}\n",
            paths.loss.display(),
            paths.accuracy.display()
        ));
    }
    if let (Some(path), Some(iv)) = (&config.predict, run.prediction) {
        out.push_str(&format!("\nPredicted range for {}: {}\n", path.display(), fmt_interval(iv)));
    }

    if config.divisor == DivisorMode::LastIndex {
        out.push_str("\n(accuracy divides by N-1)\n");
    }
    out.push_str(&format!("acc is {}\n", run.accuracy));
    out
}

/// First `rows` held-out predictions as a small table.
pub fn format_preview(scored: &[ScoredSample], rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>6} {:>24} {:>24} {:>8}\n", "#", "target", "prediction", "overlap"));
    out.push_str(&format!("{:->6} {:->24} {:->24} {:->8}\n", "", "", "", ""));
    for (i, s) in scored.iter().take(rows).enumerate() {
        out.push_str(&format!(
            "{i:>6} {:>24} {:>24} {:>8.4}\n",
            fmt_interval(s.target),
            fmt_interval(s.prediction),
            s.score
        ));
    }
    if scored.len() > rows {
        out.push_str(&format!("{:>6}\n", format!("+{}", scored.len() - rows)));
    }
    out
}

fn fmt_interval(iv: Interval) -> String {
    format!("[{:.0}, {:.0}]", iv.lo, iv.hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(lo: f64, hi: f64, score: f64) -> ScoredSample {
        ScoredSample {
            prediction: Interval::new(lo, hi),
            target: Interval::new(40_000.0, 60_000.0),
            score,
        }
    }

    #[test]
    fn preview_truncates_and_counts_the_rest() {
        let scored: Vec<ScoredSample> = (0..8).map(|i| sample(50_000.0, 70_000.0 + i as f64, 0.3)).collect();
        let table = format_preview(&scored, 3);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2 + 3 + 1);
        assert!(lines[2].contains("[40000, 60000]"));
        assert!(lines[2].contains("[50000, 70000]"));
        assert!(lines[5].trim() == "+5");
    }

    #[test]
    fn preview_of_short_list_has_no_remainder() {
        let table = format_preview(&[sample(1.0, 2.0, 0.0)], 5);
        assert_eq!(table.lines().count(), 3);
    }
}
