//! Scoring math: the paired-target loss and the interval-overlap accuracy.

pub mod loss;
pub mod overlap;

pub use loss::*;
pub use overlap::*;
