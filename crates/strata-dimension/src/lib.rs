//! A dimension: generated chunks, block access, lighting, and remesh signals.
#![forbid(unsafe_code)]

mod chunk_map;

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use strata_blocks::Block;
use strata_chunk::{ChunkData, materialize};
use strata_geom::BlockPos;
use strata_lighting::{LightQueue, LightWorld, LightingEngine, StepReport};
use strata_runtime::{ChunkInfoCache, MemoStats};
use strata_world::{ChunkCoord, StrataConfig, WorldGenParams};

pub use chunk_map::ChunkMap;

/// Block-level read/write access to generated terrain.
pub trait BlockAccessor {
    /// `None` when the owning chunk is not generated or `p` is outside the
    /// vertical range.
    fn get_block(&self, p: BlockPos) -> Option<Block>;

    /// Returns false (and changes nothing) where `get_block` would be `None`.
    fn set_block(&mut self, p: BlockPos, b: Block) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateError {
    /// Some ChunkInfo in the carve neighbourhood is not Ready yet. The
    /// listed coordinates have been scheduled.
    NotReady { missing: Vec<ChunkCoord> },
    AlreadyGenerated,
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::NotReady { missing } => {
                write!(f, "waiting on chunk info for {} chunks", missing.len())
            }
            GenerateError::AlreadyGenerated => write!(f, "chunk already generated"),
        }
    }
}

impl Error for GenerateError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshInvalidation {
    /// Geometry changed: materialization or an edit.
    Major,
    /// Only light or cosmetic state changed.
    Minor,
}

#[derive(Clone, Debug)]
pub struct DimensionOptions {
    pub workers: usize,
    pub light_budget: usize,
    pub parallel_threshold: usize,
    pub minor_remesh_interval: Duration,
}

impl Default for DimensionOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            light_budget: 65_536,
            parallel_threshold: 1024,
            minor_remesh_interval: Duration::from_secs(5),
        }
    }
}

impl DimensionOptions {
    pub fn from_config(cfg: &StrataConfig) -> Self {
        Self {
            workers: cfg.runtime.workers,
            light_budget: cfg.lighting.budget,
            parallel_threshold: cfg.lighting.parallel_threshold,
            minor_remesh_interval: Duration::from_secs_f32(
                cfg.lighting.minor_remesh_interval_secs.max(0.0),
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DimensionStats {
    pub chunks: usize,
    pub pending_light: usize,
    pub light_commits: u64,
    pub cache: MemoStats,
}

pub struct Dimension {
    chunks: ChunkMap,
    cache: ChunkInfoCache,
    light_queue: LightQueue,
    engine: LightingEngine,
    minor_remesh_interval: Duration,
}

impl Dimension {
    pub fn new(seed: u64, params: Arc<WorldGenParams>, opts: DimensionOptions) -> Self {
        let chunks = ChunkMap::new(params.chunk_width, params.world_height);
        let cache = ChunkInfoCache::new(seed, params, opts.workers);
        let engine =
            LightingEngine::new(opts.light_budget).with_parallel_threshold(opts.parallel_threshold);
        Self {
            chunks,
            cache,
            light_queue: LightQueue::new(),
            engine,
            minor_remesh_interval: opts.minor_remesh_interval,
        }
    }

    /// Builds a dimension from a full config. Fails on semantic config errors.
    pub fn from_config(cfg: &StrataConfig) -> Result<Self, Box<dyn Error>> {
        let catalog = cfg.catalog();
        let params = WorldGenParams::from_config(cfg, &catalog)?;
        Ok(Self::new(
            cfg.world.seed,
            Arc::new(params),
            DimensionOptions::from_config(cfg),
        ))
    }

    #[inline]
    pub fn params(&self) -> &Arc<WorldGenParams> {
        self.cache.params()
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.cache.seed()
    }

    #[inline]
    pub fn cache(&self) -> &ChunkInfoCache {
        &self.cache
    }

    #[inline]
    pub fn chunks(&self) -> &ChunkMap {
        &self.chunks
    }

    #[inline]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkData> {
        self.chunks.get(coord)
    }

    #[inline]
    pub fn is_generated(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains(coord)
    }

    #[inline]
    pub fn light_queue(&self) -> &LightQueue {
        &self.light_queue
    }

    /// Materializes `coord` once every ChunkInfo in its carve neighbourhood
    /// is Ready. Missing infos are scheduled and reported.
    pub fn generate_chunk(&mut self, coord: ChunkCoord) -> Result<(), GenerateError> {
        if self.chunks.contains(coord) {
            log::warn!(
                "generate_chunk({}, {}): already generated, keeping existing data",
                coord.cx,
                coord.cz
            );
            return Err(GenerateError::AlreadyGenerated);
        }
        let infos = self
            .cache
            .neighborhood(coord)
            .map_err(|missing| GenerateError::NotReady { missing })?;
        let Some(own) = infos.iter().find(|(c, _)| *c == coord).map(|(_, i)| i.clone()) else {
            return Err(GenerateError::NotReady {
                missing: vec![coord],
            });
        };

        let t0 = Instant::now();
        let params = self.cache.params().clone();
        let mut chunk = materialize(coord, &params, &own, infos.iter().map(|(_, i)| i.as_ref()));
        chunk.mark_major();
        let positions: Vec<BlockPos> = chunk.positions().collect();
        self.chunks.insert(chunk);
        for p in positions {
            self.enqueue_light(p);
        }
        self.enqueue_facing_borders(coord);
        log::debug!(
            "generated chunk ({}, {}) in {:.2}ms, {} queued for light",
            coord.cx,
            coord.cz,
            t0.elapsed().as_secs_f64() * 1000.0,
            self.light_queue.len()
        );
        Ok(())
    }

    /// [`generate_chunk`](Self::generate_chunk) collapsed to "did it happen".
    pub fn try_generate(&mut self, coord: ChunkCoord) -> bool {
        self.generate_chunk(coord).is_ok()
    }

    // Blocks of already generated neighbours that face `coord` may have
    // treated it as unloaded (fully lit) and must be recomputed.
    fn enqueue_facing_borders(&mut self, coord: ChunkCoord) {
        let w = self.chunks.width() as i32;
        let h = self.chunks.height() as i32;
        let (bx, bz) = coord.origin(self.chunks.width());
        // (neighbour, fixed coordinate of its facing column, face is normal to x)
        let faces = [
            (coord.offset(-1, 0), bx - 1, true),
            (coord.offset(1, 0), bx + w, true),
            (coord.offset(0, -1), bz - 1, false),
            (coord.offset(0, 1), bz + w, false),
        ];
        for (n, fixed, x_normal) in faces {
            if !self.chunks.contains(n) {
                continue;
            }
            for y in 0..h {
                for i in 0..w {
                    let p = if x_normal {
                        BlockPos::new(fixed, y, bz + i)
                    } else {
                        BlockPos::new(bx + i, y, fixed)
                    };
                    self.enqueue_light(p);
                }
            }
        }
    }

    fn enqueue_light(&mut self, p: BlockPos) -> bool {
        if self.chunks.block(p).is_none() {
            return false;
        }
        if self.light_queue.push(p) {
            self.chunks.light_queued(p);
            true
        } else {
            false
        }
    }

    /// Queues `p` for a light recompute.
    pub fn invalidate(&mut self, p: BlockPos) -> bool {
        self.enqueue_light(p)
    }

    /// Updates the destroy overlay of an existing block. Cosmetic only.
    pub fn set_destroy_level(&mut self, p: BlockPos, level: u8) -> bool {
        let Some(chunk) = self.chunks.chunk_at_mut(p) else {
            return false;
        };
        let Some(b) = chunk.get_world(p) else {
            return false;
        };
        chunk.set_world(p, b.with_destroy_level(level));
        chunk.mark_minor();
        true
    }

    /// One budgeted lighting step.
    pub fn tick_lighting(&mut self) -> StepReport {
        self.engine.step(&mut self.light_queue, &mut self.chunks)
    }

    /// Pending remesh signals. Major signals are always returned and reset
    /// the chunk's throttle; Minor ones only once `minor_remesh_interval`
    /// has passed since the chunk's last remesh.
    pub fn take_mesh_invalidations(&mut self, now: Instant) -> Vec<(ChunkCoord, MeshInvalidation)> {
        let interval = self.minor_remesh_interval;
        let mut out = Vec::new();
        for (coord, chunk) in self.chunks.iter_mut() {
            if chunk.mesh_invalidated_major {
                chunk.mesh_invalidated_major = false;
                chunk.mesh_invalidated_minor = false;
                chunk.last_remesh_time = Some(now);
                out.push((*coord, MeshInvalidation::Major));
            } else if chunk.mesh_invalidated_minor {
                let due = chunk
                    .last_remesh_time
                    .is_none_or(|t| now.saturating_duration_since(t) >= interval);
                if due {
                    chunk.mesh_invalidated_minor = false;
                    chunk.last_remesh_time = Some(now);
                    out.push((*coord, MeshInvalidation::Minor));
                }
            }
        }
        out.sort_by_key(|(c, _)| (c.cx, c.cz));
        out
    }

    /// Coordinates whose ChunkInfo finished since the last call.
    pub fn drain_completed_infos(&self) -> Vec<ChunkCoord> {
        self.cache.drain_completed()
    }

    pub fn stats(&self) -> DimensionStats {
        DimensionStats {
            chunks: self.chunks.len(),
            pending_light: self.light_queue.len(),
            light_commits: self.engine.total_commits(),
            cache: self.cache.stats(),
        }
    }

    pub fn shutdown(&self) {
        self.cache.shutdown();
    }
}

impl BlockAccessor for Dimension {
    fn get_block(&self, p: BlockPos) -> Option<Block> {
        self.chunks.block(p)
    }

    /// Solid blocks are stored dark and their six neighbours are queued;
    /// an empty block queues itself so it can pick up light.
    fn set_block(&mut self, p: BlockPos, b: Block) -> bool {
        let Some(chunk) = self.chunks.chunk_at_mut(p) else {
            return false;
        };
        let placed = if b.is_solid() {
            b.with_light(false, 0)
        } else {
            b
        };
        if !chunk.set_world(p, placed) {
            return false;
        }
        chunk.mark_major();
        if placed.is_solid() {
            for n in p.neighbors() {
                self.enqueue_light(n);
            }
        } else {
            self.enqueue_light(p);
        }
        true
    }
}
