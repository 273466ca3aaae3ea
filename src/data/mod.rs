//! Dataset utilities: seeded splitting and synthetic record generation.

pub mod split;
pub mod synthetic;

pub use split::*;
pub use synthetic::*;
