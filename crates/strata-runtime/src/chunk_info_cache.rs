use std::sync::Arc;
use std::time::Duration;

use strata_world::{ChunkCoord, ChunkInfo, WorldGenParams, generate_chunk_info};

use crate::memo::{EntryState, MemoMap, MemoStats};

/// ChunkInfo for every coordinate around a chunk that a worm could reach it from.
pub type Neighborhood = Vec<(ChunkCoord, Arc<ChunkInfo>)>;

/// `MemoMap<ChunkCoord, ChunkInfo>` driven by the world generator.
pub struct ChunkInfoCache {
    map: MemoMap<ChunkCoord, ChunkInfo>,
    params: Arc<WorldGenParams>,
    seed: u64,
}

impl ChunkInfoCache {
    pub fn new(seed: u64, params: Arc<WorldGenParams>, workers: usize) -> Self {
        let gen_params = params.clone();
        let map = MemoMap::new("strata-gen", workers, move |coord: &ChunkCoord| {
            generate_chunk_info(*coord, seed, &gen_params)
        });
        log::info!(
            "chunk info cache: seed {} with {} workers, carve radius {}",
            seed,
            map.worker_count(),
            params.carve_radius()
        );
        Self { map, params, seed }
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn params(&self) -> &Arc<WorldGenParams> {
        &self.params
    }

    #[inline]
    pub fn carve_radius(&self) -> i32 {
        self.params.carve_radius()
    }

    pub fn try_get(&self, coord: ChunkCoord) -> Option<Arc<ChunkInfo>> {
        self.map.try_get(&coord)
    }

    pub fn peek(&self, coord: ChunkCoord) -> Option<Arc<ChunkInfo>> {
        self.map.peek(&coord)
    }

    pub fn state(&self, coord: ChunkCoord) -> EntryState {
        self.map.state(&coord)
    }

    pub fn wait_for(&self, coord: ChunkCoord, timeout: Duration) -> Option<Arc<ChunkInfo>> {
        self.map.wait_for(&coord, timeout)
    }

    /// True when every coordinate in the carve neighbourhood is Ready.
    /// Schedules nothing.
    pub fn neighborhood_ready(&self, coord: ChunkCoord) -> bool {
        coord
            .neighborhood(self.carve_radius())
            .all(|c| self.map.state(&c) == EntryState::Ready)
    }

    /// All infos of the carve neighbourhood, or the coordinates still missing.
    /// Missing coordinates are scheduled.
    pub fn neighborhood(&self, coord: ChunkCoord) -> Result<Neighborhood, Vec<ChunkCoord>> {
        let mut ready = Vec::new();
        let mut missing = Vec::new();
        for c in coord.neighborhood(self.carve_radius()) {
            match self.map.try_get(&c) {
                Some(info) => ready.push((c, info)),
                None => missing.push(c),
            }
        }
        if missing.is_empty() {
            Ok(ready)
        } else {
            Err(missing)
        }
    }

    pub fn drain_completed(&self) -> Vec<ChunkCoord> {
        self.map.drain_completed()
    }

    pub fn stats(&self) -> MemoStats {
        self.map.stats()
    }

    /// Cumulative time workers spent generating.
    pub fn generation_time(&self) -> Duration {
        self.map.stats().compute_time
    }

    pub fn shutdown(&self) {
        self.map.shutdown();
    }
}
