//! Seeded train/validation/test partitioning.
//!
//! Samples are shuffled once with a `StdRng` seeded from the run config, then
//! cut into contiguous blocks. Same seed + same input order = same split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::AppError;

/// Disjoint partitions of a dataset.
#[derive(Debug, Clone)]
pub struct DataSplit<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
    pub test: Vec<T>,
}

/// Shuffle `samples` and split off `test_fraction` for testing and
/// `val_fraction` (of the full set) for validation. The rest is training data.
///
/// The test block size is rounded up and the validation size rounded; the test
/// block is taken first so that `val_fraction = 0` reproduces a plain
/// train/test split.
pub fn split_dataset<T>(
    mut samples: Vec<T>,
    test_fraction: f64,
    val_fraction: f64,
    seed: u64,
) -> Result<DataSplit<T>, AppError> {
    validate_fractions(test_fraction, val_fraction)?;

    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let n_test = ((total as f64) * test_fraction).ceil() as usize;
    let n_val = ((total as f64) * val_fraction).round() as usize;
    let n_test = n_test.min(total);
    let n_val = n_val.min(total - n_test);

    let test = samples.split_off(total - n_test);
    let validation = samples.split_off(samples.len() - n_val);
    let train = samples;

    tracing::debug!(
        train = train.len(),
        validation = validation.len(),
        test = test.len(),
        seed,
        "dataset split"
    );

    Ok(DataSplit {
        train,
        validation,
        test,
    })
}

fn validate_fractions(test_fraction: f64, val_fraction: f64) -> Result<(), AppError> {
    let in_unit = |v: f64| v.is_finite() && (0.0..1.0).contains(&v);
    if !in_unit(test_fraction) {
        return Err(AppError::input(format!(
            "Invalid test fraction {test_fraction} (expected 0 <= f < 1)."
        )));
    }
    if !in_unit(val_fraction) {
        return Err(AppError::input(format!(
            "Invalid validation fraction {val_fraction} (expected 0 <= f < 1)."
        )));
    }
    if test_fraction + val_fraction >= 1.0 {
        return Err(AppError::input(
            "Test + validation fractions must leave some training data.",
        ));
    }
    Ok(())
}
