//! Background generation workers and the memoized ChunkInfo cache.
#![forbid(unsafe_code)]

mod chunk_info_cache;
mod memo;

pub use chunk_info_cache::ChunkInfoCache;
pub use memo::{EntryState, MemoMap, MemoStats};
