//! Regression fitting.
//!
//! Responsibilities:
//!
//! - grow least-squares regression trees (parallel split search)
//! - boost trees per output channel
//! - fit/predict the two-channel (lower/upper) model with per-round history

pub mod boosting;
pub mod multi_output;
pub mod tree;

pub use boosting::*;
pub use multi_output::*;
pub use tree::*;
