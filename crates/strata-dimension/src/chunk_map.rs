use hashbrown::HashMap;
use strata_blocks::Block;
use strata_chunk::ChunkData;
use strata_geom::BlockPos;
use strata_lighting::{LightState, LightWorld};
use strata_world::ChunkCoord;

/// Generated chunks keyed by column coordinate.
pub struct ChunkMap {
    width: usize,
    height: usize,
    chunks: HashMap<ChunkCoord, ChunkData>,
}

impl ChunkMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            chunks: HashMap::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn chunk_key(&self, p: BlockPos) -> ChunkCoord {
        ChunkCoord::containing(p.x, p.z, self.width)
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkData> {
        self.chunks.get(&coord)
    }

    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut ChunkData> {
        self.chunks.get_mut(&coord)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn insert(&mut self, chunk: ChunkData) {
        self.chunks.insert(chunk.coord, chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &ChunkData)> {
        self.chunks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ChunkCoord, &mut ChunkData)> {
        self.chunks.iter_mut()
    }

    pub fn chunk_at(&self, p: BlockPos) -> Option<&ChunkData> {
        self.chunks.get(&self.chunk_key(p))
    }

    pub fn chunk_at_mut(&mut self, p: BlockPos) -> Option<&mut ChunkData> {
        let k = self.chunk_key(p);
        self.chunks.get_mut(&k)
    }
}

impl LightWorld for ChunkMap {
    fn height(&self) -> i32 {
        self.height as i32
    }

    fn block(&self, p: BlockPos) -> Option<Block> {
        self.chunk_at(p)?.get_world(p)
    }

    fn commit_light(&mut self, p: BlockPos, state: LightState) -> bool {
        let Some(chunk) = self.chunk_at_mut(p) else {
            return false;
        };
        let Some(b) = chunk.get_world(p) else {
            return false;
        };
        chunk.set_world(p, b.with_light(state.sky, state.level));
        chunk.mark_minor();
        true
    }

    fn light_queued(&mut self, p: BlockPos) {
        if let Some(chunk) = self.chunk_at_mut(p) {
            chunk.mark_light_pending(p);
        }
    }

    fn light_settled(&mut self, p: BlockPos) {
        if let Some(chunk) = self.chunk_at_mut(p) {
            chunk.clear_light_pending(p);
        }
    }
}
