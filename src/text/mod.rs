//! Text → token ids.

pub mod encoder;
pub mod vocab;

pub use encoder::*;
pub use vocab::*;
