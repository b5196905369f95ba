//! Turns ChunkInfo into block data.
//!
//! Terrain comes from the chunk's own heightmaps. Caves come from every worm
//! in the carve neighbourhood, so a tunnel that starts next door still
//! cuts through this chunk.

use strata_blocks::Block;
use strata_world::{ChunkCoord, ChunkInfo, WorldGenParams};

use crate::ChunkData;

/// Builds the chunk at `coord` from its own info and the infos of every
/// chunk whose worms may reach it (its own included).
pub fn materialize<'a, I>(
    coord: ChunkCoord,
    params: &WorldGenParams,
    own: &ChunkInfo,
    cave_sources: I,
) -> ChunkData
where
    I: IntoIterator<Item = &'a ChunkInfo>,
{
    let mut chunk = ChunkData::new_empty(coord, params.chunk_width, params.world_height);
    fill_terrain(&mut chunk, params, own);
    let carved = carve_caves(&mut chunk, cave_sources);
    log::trace!(
        "materialized ({}, {}): {} blocks carved",
        coord.cx,
        coord.cz,
        carved
    );
    chunk
}

/// Stacks the layers bottom-up. Layer `i` occupies heights below the
/// cumulative boundary `b_i = Σ_{j≤i} max(h_j, 0)` not claimed by an
/// earlier layer. Everything above the last boundary is open sky.
pub fn fill_terrain(chunk: &mut ChunkData, params: &WorldGenParams, info: &ChunkInfo) {
    let w = chunk.width;
    let h = chunk.height;
    let mut bounds = Vec::with_capacity(params.layers.len());
    for z in 0..w {
        for x in 0..w {
            bounds.clear();
            let mut acc = 0.0f32;
            for (layer, hm) in params.layers.iter().zip(&info.heightmaps) {
                acc += hm.get(x, z).max(0.0);
                bounds.push((acc, layer.material));
            }
            let mut li = 0;
            for y in 0..h {
                let yf = y as f32;
                while li < bounds.len() && bounds[li].0 <= yf {
                    li += 1;
                }
                let b = match bounds.get(li) {
                    Some(&(_, material)) => Block::solid(material),
                    None => Block::SKY,
                };
                chunk.set_local(x, y, z, b);
            }
        }
    }
}

/// Clears every block whose centre lies strictly inside a worm node's
/// sphere. Returns the number of blocks that changed.
pub fn carve_caves<'a, I>(chunk: &mut ChunkData, sources: I) -> usize
where
    I: IntoIterator<Item = &'a ChunkInfo>,
{
    let (bx, bz) = chunk.base();
    let w = chunk.width as i32;
    let h = chunk.height as i32;
    let mut carved = 0usize;
    for info in sources {
        for worm in &info.worms {
            for node in &worm.nodes {
                let r = node.radius;
                if r <= 0.0 {
                    continue;
                }
                let c = node.center;
                let x0 = ((c.x - r).floor() as i32).max(bx);
                let x1 = ((c.x + r).ceil() as i32).min(bx + w - 1);
                let y0 = ((c.y - r).floor() as i32).max(0);
                let y1 = ((c.y + r).ceil() as i32).min(h - 1);
                let z0 = ((c.z - r).floor() as i32).max(bz);
                let z1 = ((c.z + r).ceil() as i32).min(bz + w - 1);
                if x0 > x1 || y0 > y1 || z0 > z1 {
                    continue;
                }
                let r2 = r * r;
                for y in y0..=y1 {
                    let dy = y as f32 + 0.5 - c.y;
                    for z in z0..=z1 {
                        let dz = z as f32 + 0.5 - c.z;
                        for x in x0..=x1 {
                            let dx = x as f32 + 0.5 - c.x;
                            if dx * dx + dy * dy + dz * dz >= r2 {
                                continue;
                            }
                            let (lx, ly, lz) = ((x - bx) as usize, y as usize, (z - bz) as usize);
                            let i = chunk.idx(lx, ly, lz);
                            if chunk.blocks[i] != Block::NONE {
                                chunk.blocks[i] = Block::NONE;
                                carved += 1;
                            }
                        }
                    }
                }
            }
        }
    }
    carved
}
