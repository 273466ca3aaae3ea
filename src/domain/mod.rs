//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input rows and encoded samples (`Record`, `EncodedSample`)
//! - the interval type shared by targets and predictions (`Interval`)
//! - scoring/loss policy enums (`LossKind`, `OrderingPolicy`, `DivisorMode`)
//! - the explicit run configuration (`RunConfig`, `BoostParams`)

pub mod types;

pub use types::*;
