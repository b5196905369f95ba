use std::collections::VecDeque;

use hashbrown::HashSet;
use strata_geom::BlockPos;

/// FIFO of positions awaiting a light recompute. A position is held at
/// most once; re-pushing a queued position keeps its original slot.
#[derive(Debug, Default)]
pub struct LightQueue {
    fifo: VecDeque<BlockPos>,
    members: HashSet<BlockPos>,
}

impl LightQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `p` was already queued.
    pub fn push(&mut self, p: BlockPos) -> bool {
        if self.members.insert(p) {
            self.fifo.push_back(p);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<BlockPos> {
        let p = self.fifo.pop_front()?;
        self.members.remove(&p);
        Some(p)
    }

    /// Removes up to `max` positions from the front.
    pub fn pop_batch(&mut self, max: usize) -> Vec<BlockPos> {
        let n = max.min(self.fifo.len());
        let batch: Vec<BlockPos> = self.fifo.drain(..n).collect();
        for p in &batch {
            self.members.remove(p);
        }
        batch
    }

    #[inline]
    pub fn contains(&self, p: BlockPos) -> bool {
        self.members.contains(&p)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }
}
