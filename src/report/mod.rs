//! Terminal output for a finished run.

pub mod format;

pub use format::*;
