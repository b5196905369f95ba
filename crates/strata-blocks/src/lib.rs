//! Block record and material catalog.
#![forbid(unsafe_code)]

pub mod material;
pub mod types;

pub use material::MaterialCatalog;
pub use types::{Block, MAX_LIGHT, MaterialId};
