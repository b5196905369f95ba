//! Chunk block volume and the terrain/cave materializer.
#![forbid(unsafe_code)]

pub mod materialize;

use std::time::Instant;

use hashbrown::HashSet;
use strata_blocks::Block;
use strata_geom::BlockPos;
use strata_world::ChunkCoord;

pub use materialize::{carve_caves, fill_terrain, materialize};

/// Dense `H×W×W` block column for one chunk, indexed `(y * W + z) * W + x`.
#[derive(Clone, Debug)]
pub struct ChunkData {
    pub coord: ChunkCoord,
    pub width: usize,
    pub height: usize,
    pub blocks: Vec<Block>,
    pub mesh_invalidated_major: bool,
    pub mesh_invalidated_minor: bool,
    pub last_remesh_time: Option<Instant>,
    pending_light: HashSet<usize>,
}

impl ChunkData {
    pub fn new_empty(coord: ChunkCoord, width: usize, height: usize) -> Self {
        Self::from_blocks_local(coord, width, height, Vec::new())
    }

    pub fn from_blocks_local(
        coord: ChunkCoord,
        width: usize,
        height: usize,
        blocks: Vec<Block>,
    ) -> Self {
        let mut b = blocks;
        let expect = width * width * height;
        if b.len() != expect {
            b.resize(expect, Block::NONE);
        }
        ChunkData {
            coord,
            width,
            height,
            blocks: b,
            mesh_invalidated_major: false,
            mesh_invalidated_minor: false,
            last_remesh_time: None,
            pending_light: HashSet::new(),
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.width + z) * self.width + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set_local(&mut self, x: usize, y: usize, z: usize, b: Block) {
        let i = self.idx(x, y, z);
        self.blocks[i] = b;
    }

    #[inline]
    pub fn base(&self) -> (i32, i32) {
        self.coord.origin(self.width)
    }

    /// Local `(x, y, z)` of a world position, if it lies in this chunk.
    #[inline]
    pub fn local_of(&self, p: BlockPos) -> Option<(usize, usize, usize)> {
        let (bx, bz) = self.base();
        let w = self.width as i32;
        if p.y < 0 || p.y >= self.height as i32 {
            return None;
        }
        if p.x < bx || p.x >= bx + w || p.z < bz || p.z >= bz + w {
            return None;
        }
        Some(((p.x - bx) as usize, p.y as usize, (p.z - bz) as usize))
    }

    #[inline]
    pub fn contains_world(&self, p: BlockPos) -> bool {
        self.local_of(p).is_some()
    }

    #[inline]
    pub fn get_world(&self, p: BlockPos) -> Option<Block> {
        let (x, y, z) = self.local_of(p)?;
        Some(self.get_local(x, y, z))
    }

    #[inline]
    pub fn set_world(&mut self, p: BlockPos, b: Block) -> bool {
        match self.local_of(p) {
            Some((x, y, z)) => {
                self.set_local(x, y, z, b);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn world_pos(&self, x: usize, y: usize, z: usize) -> BlockPos {
        let (bx, bz) = self.base();
        BlockPos::new(bx + x as i32, y as i32, bz + z as i32)
    }

    /// Every world position of the chunk in storage order.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width)
                .flat_map(move |z| (0..self.width).map(move |x| self.world_pos(x, y, z)))
        })
    }

    pub fn mark_major(&mut self) {
        self.mesh_invalidated_major = true;
    }

    pub fn mark_minor(&mut self) {
        self.mesh_invalidated_minor = true;
    }

    /// Records that `p` waits in the lighting queue. Returns false when it
    /// was already pending or lies outside the chunk.
    pub fn mark_light_pending(&mut self, p: BlockPos) -> bool {
        match self.local_of(p) {
            Some((x, y, z)) => {
                let i = self.idx(x, y, z);
                self.pending_light.insert(i)
            }
            None => false,
        }
    }

    pub fn clear_light_pending(&mut self, p: BlockPos) {
        if let Some((x, y, z)) = self.local_of(p) {
            let i = self.idx(x, y, z);
            self.pending_light.remove(&i);
        }
    }

    pub fn is_light_pending(&self, p: BlockPos) -> bool {
        self.local_of(p)
            .is_some_and(|(x, y, z)| self.pending_light.contains(&self.idx(x, y, z)))
    }

    #[inline]
    pub fn pending_light_count(&self) -> usize {
        self.pending_light.len()
    }

    /// Height of the topmost solid block in a local column.
    pub fn top_solid(&self, x: usize, z: usize) -> Option<usize> {
        (0..self.height).rev().find(|&y| self.get_local(x, y, z).is_solid())
    }
}
