//! `salary-range` library crate.
//!
//! The binary (`salary`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - scoring, tokenization and fitting are usable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod text;
