//! Seeded noise, worldgen parameters, and per-chunk generation info.
#![forbid(unsafe_code)]

pub mod chunk_coord;
pub mod chunk_info;
pub mod noise;
pub mod worldgen;

pub use chunk_coord::ChunkCoord;
pub use chunk_info::{ChunkInfo, HeightMap, Node, Worm, generate_chunk_info};
pub use noise::Fractal;
pub use worldgen::{ConfigError, StrataConfig, WorldGenParams};
