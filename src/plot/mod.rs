//! Chart rendering for training history.

pub mod history;

pub use history::*;
