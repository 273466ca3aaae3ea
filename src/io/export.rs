//! Export per-sample test predictions to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::ScoredSample;
use crate::error::AppError;

/// Write one row per held-out sample.
pub fn write_predictions_csv(path: &Path, scored: &[ScoredSample]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_predictions(file, scored)
}

pub fn write_predictions<W: Write>(mut out: W, scored: &[ScoredSample]) -> Result<(), AppError> {
    writeln!(out, "index,target_l,target_u,pred_l,pred_u,overlap")
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;

    for (idx, s) in scored.iter().enumerate() {
        writeln!(
            out,
            "{},{:.2},{:.2},{:.2},{:.2},{:.6}",
            idx, s.target.lo, s.target.hi, s.prediction.lo, s.prediction.hi, s.score,
        )
        .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Interval;

    #[test]
    fn writes_header_and_rows() {
        let scored = [ScoredSample {
            prediction: Interval::new(40_000.0, 60_000.0),
            target: Interval::new(50_000.0, 70_000.0),
            score: 1.0 / 3.0,
        }];
        let mut buf = Vec::new();
        write_predictions(&mut buf, &scored).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "index,target_l,target_u,pred_l,pred_u,overlap");
        assert_eq!(lines[1], "0,50000.00,70000.00,40000.00,60000.00,0.333333");
    }
}
