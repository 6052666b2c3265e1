//! Micro ORM: field declarations, model descriptors, instances and persistence.

pub mod field;
pub mod instance;
pub mod model;
mod persist;

pub use field::{next_id, now_timestamp, DefaultRule, Field};
pub use instance::Model;
pub use model::{ModelBuilder, ModelDescriptor};
