//! Incremental sky/block light propagation over a block world.
#![forbid(unsafe_code)]

mod queue;

use rayon::prelude::*;
use strata_blocks::{Block, MAX_LIGHT};
use strata_geom::BlockPos;

pub use queue::LightQueue;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightState {
    pub sky: bool,
    pub level: u8,
}

impl LightState {
    pub const DARK: LightState = LightState {
        sky: false,
        level: 0,
    };
    pub const SKY: LightState = LightState {
        sky: true,
        level: MAX_LIGHT,
    };

    #[inline]
    pub fn of(b: Block) -> Self {
        Self {
            sky: b.sky(),
            level: b.light(),
        }
    }
}

/// Block storage the engine reads from and commits to.
///
/// `block` returns `None` for positions that are not loaded; those count
/// as fully lit neighbours. Positions below `y = 0` are treated as solid.
pub trait LightWorld: Sync {
    fn height(&self) -> i32;

    fn block(&self, p: BlockPos) -> Option<Block>;

    /// Writes a new light state. Returns false if `p` is not loaded.
    fn commit_light(&mut self, p: BlockPos, state: LightState) -> bool;

    /// Called when `p` enters the engine's queue.
    fn light_queued(&mut self, _p: BlockPos) {}

    /// Called when `p` leaves the engine's queue to be recomputed.
    fn light_settled(&mut self, _p: BlockPos) {}
}

#[inline]
fn neighbor_level<W: LightWorld + ?Sized>(world: &W, n: BlockPos) -> u8 {
    if n.y < 0 {
        return 0;
    }
    if n.y >= world.height() {
        return MAX_LIGHT;
    }
    match world.block(n) {
        Some(b) => b.light(),
        None => MAX_LIGHT,
    }
}

/// Light state `p` should have given its neighbours, or `None` if `p` is
/// not loaded.
pub fn recompute<W: LightWorld + ?Sized>(world: &W, p: BlockPos) -> Option<LightState> {
    let b = world.block(p)?;
    if b.is_solid() {
        return Some(LightState::DARK);
    }
    if p.y == world.height() - 1 {
        return Some(LightState::SKY);
    }
    if world.block(p.above()).is_some_and(|a| a.sky()) {
        return Some(LightState::SKY);
    }
    let mut max = 0u8;
    for n in p.neighbors() {
        max = max.max(neighbor_level(world, n));
        if max >= MAX_LIGHT {
            break;
        }
    }
    Some(LightState {
        sky: false,
        level: max.saturating_sub(1),
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub processed: usize,
    pub changed: usize,
}

/// Budgeted FIFO light solver.
///
/// Each [`step`](LightingEngine::step) takes up to `budget` queued
/// positions, recomputes them all against the same snapshot, then commits
/// the changes and queues the six neighbours of every changed position.
#[derive(Clone, Debug)]
pub struct LightingEngine {
    pub budget: usize,
    pub parallel_threshold: usize,
    total_commits: u64,
}

impl LightingEngine {
    pub fn new(budget: usize) -> Self {
        Self {
            budget: budget.max(1),
            parallel_threshold: 1024,
            total_commits: 0,
        }
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    #[inline]
    pub fn total_commits(&self) -> u64 {
        self.total_commits
    }

    pub fn step<W: LightWorld>(&mut self, queue: &mut LightQueue, world: &mut W) -> StepReport {
        let batch = queue.pop_batch(self.budget);
        if batch.is_empty() {
            return StepReport::default();
        }
        for &p in &batch {
            world.light_settled(p);
        }

        let changes: Vec<(BlockPos, LightState)> = {
            let view: &W = world;
            let diff = |p: &BlockPos| {
                let cur = LightState::of(view.block(*p)?);
                let next = recompute(view, *p)?;
                (cur != next).then_some((*p, next))
            };
            if batch.len() >= self.parallel_threshold {
                batch.par_iter().filter_map(diff).collect()
            } else {
                batch.iter().filter_map(diff).collect()
            }
        };

        let mut changed = 0usize;
        for (p, state) in changes {
            if !world.commit_light(p, state) {
                continue;
            }
            changed += 1;
            let h = world.height();
            for n in p.neighbors() {
                if n.y < 0 || n.y >= h || world.block(n).is_none() {
                    continue;
                }
                if queue.push(n) {
                    world.light_queued(n);
                }
            }
        }
        self.total_commits += changed as u64;
        log::trace!(
            "light step: {} processed, {} changed, {} queued",
            batch.len(),
            changed,
            queue.len()
        );
        StepReport {
            processed: batch.len(),
            changed,
        }
    }

    /// Steps until the queue drains or `max_steps` passes. Returns the
    /// number of steps taken.
    pub fn run_until_idle<W: LightWorld>(
        &mut self,
        queue: &mut LightQueue,
        world: &mut W,
        max_steps: usize,
    ) -> usize {
        let mut steps = 0;
        while !queue.is_empty() && steps < max_steps {
            self.step(queue, world);
            steps += 1;
        }
        steps
    }
}
