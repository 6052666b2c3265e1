//! Dialect-aware SQL helpers: identifiers from model declarations only, values as parameters.

pub mod dialect;
pub mod params;
pub use dialect::*;
pub use params::*;
