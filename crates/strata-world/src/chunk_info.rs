//! Per-chunk generation info: layer heightmaps and cave worm paths.
//!
//! `ChunkInfo` is a pure function of `(seed, coord, params)`. It holds no
//! blocks; the chunk materializer turns the infos of a whole neighbourhood
//! into block data.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_geom::Vec3;

use crate::chunk_coord::ChunkCoord;
use crate::noise::hash2;
use crate::worldgen::{CaveParams, LayerParams, WorldGenParams};

/// `W×W` layer thickness samples, indexed `z * W + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    width: usize,
    values: Vec<f32>,
}

impl HeightMap {
    fn generate(coord: ChunkCoord, width: usize, seed: u64, layer: &LayerParams) -> Self {
        let (ox, oz) = coord.origin(width);
        let mut values = Vec::with_capacity(width * width);
        for z in 0..width {
            for x in 0..width {
                let wx = f64::from(ox + x as i32);
                let wz = f64::from(oz + z as i32);
                values.push(layer.base_height + layer.fractal.sample_2d(seed, wx, wz));
            }
        }
        Self { width, values }
    }

    /// Wraps precomputed samples; `values` is padded or truncated to `width²`.
    pub fn from_values(width: usize, values: Vec<f32>) -> Self {
        let mut values = values;
        values.resize(width * width, 0.0);
        Self { width, values }
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.values[z * self.width + x]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Worm {
    pub nodes: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChunkInfo {
    pub heightmaps: Vec<HeightMap>,
    pub worms: Vec<Worm>,
}

impl ChunkInfo {
    pub fn node_count(&self) -> usize {
        self.worms.iter().map(|w| w.nodes.len()).sum()
    }
}

/// Noise seeds drawn from the world seed in a fixed order: cave fields
/// first, then one per layer. Appending a layer leaves every earlier seed
/// untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedPlan {
    pub dig_x: u64,
    pub dig_y: u64,
    pub dig_z: u64,
    pub radius: u64,
    pub layers: Vec<u64>,
}

impl SeedPlan {
    pub fn derive(seed: u64, layer_count: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let dig_x = rng.next_u64();
        let dig_y = rng.next_u64();
        let dig_z = rng.next_u64();
        let radius = rng.next_u64();
        let layers = (0..layer_count).map(|_| rng.next_u64()).collect();
        Self {
            dig_x,
            dig_y,
            dig_z,
            radius,
            layers,
        }
    }
}

pub fn generate_chunk_info(coord: ChunkCoord, seed: u64, params: &WorldGenParams) -> ChunkInfo {
    let seeds = SeedPlan::derive(seed, params.layers.len());
    let heightmaps = params
        .layers
        .iter()
        .zip(&seeds.layers)
        .map(|(layer, &s)| HeightMap::generate(coord, params.chunk_width, s, layer))
        .collect();
    let worms = generate_worms(coord, seed, &seeds, params);
    ChunkInfo { heightmaps, worms }
}

fn generate_worms(
    coord: ChunkCoord,
    seed: u64,
    seeds: &SeedPlan,
    params: &WorldGenParams,
) -> Vec<Worm> {
    let caves = &params.caves;
    let width = params.chunk_width;
    let mut local = ChaCha8Rng::seed_from_u64(hash2(seed, coord.cx, coord.cz));
    let count = local.gen_range(0..=caves.max_worms_per_chunk);
    let (ox, oz) = coord.origin(width);

    let mut worms = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let lx = local.gen_range(0..width) as i32;
        let lz = local.gen_range(0..width) as i32;
        let y = if caves.max_y > caves.min_y {
            local.gen_range(caves.min_y..caves.max_y)
        } else {
            caves.min_y
        };
        let origin = Vec3::new(
            (ox + lx) as f32 + 0.5,
            y,
            (oz + lz) as f32 + 0.5,
        );
        let worm = trace_worm(origin, caves, seeds, params.world_height as f32);
        if !worm.nodes.is_empty() {
            worms.push(worm);
        }
    }
    worms
}

fn trace_worm(origin: Vec3, caves: &CaveParams, seeds: &SeedPlan, height: f32) -> Worm {
    let mut nodes = Vec::with_capacity(caves.max_segments as usize);
    let mut pos = origin;
    for _ in 0..caves.max_segments {
        if pos.y < 0.0 || pos.y >= height {
            break;
        }
        let (x, y, z) = (f64::from(pos.x), f64::from(pos.y), f64::from(pos.z));
        let radius = (caves.radius_base + caves.radius.sample_3d(seeds.radius, x, y, z)).max(0.0);
        nodes.push(Node {
            center: pos,
            radius,
        });
        let dir = Vec3::new(
            caves.dig.sample_3d(seeds.dig_x, x, y, z),
            caves.dig.sample_3d(seeds.dig_y, x, y, z),
            caves.dig.sample_3d(seeds.dig_z, x, y, z),
        );
        let dir = if dir.length_sq() < 1e-12 {
            Vec3::UP
        } else {
            dir.normalized()
        };
        pos += dir * caves.step;
    }
    Worm { nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::Fractal;
    use crate::worldgen::StrataConfig;

    fn params() -> WorldGenParams {
        let cfg = StrataConfig::default();
        WorldGenParams::from_config(&cfg, &cfg.catalog()).unwrap()
    }

    #[test]
    fn heightmaps_match_layer_count_and_width() {
        let p = params();
        let info = generate_chunk_info(ChunkCoord::new(-3, 5), 99, &p);
        assert_eq!(info.heightmaps.len(), p.layers.len());
        for hm in &info.heightmaps {
            assert_eq!(hm.width(), 16);
            assert_eq!(hm.values().len(), 256);
        }
        // The flat top layer has no noise, only its base height.
        assert!(info.heightmaps[2].values().iter().all(|&h| h == 1.0));
    }

    #[test]
    fn worm_nodes_stay_in_vertical_range_and_step_apart() {
        let mut p = params();
        p.caves.max_worms_per_chunk = 6;
        let h = p.world_height as f32;
        for c in ChunkCoord::new(0, 0).neighborhood(2) {
            let info = generate_chunk_info(c, 5, &p);
            assert!(info.worms.len() <= 6);
            for worm in &info.worms {
                assert!(worm.nodes.len() <= p.caves.max_segments as usize);
                for n in &worm.nodes {
                    assert!(n.center.y >= 0.0 && n.center.y < h);
                    assert!(n.radius >= 0.0);
                }
                for pair in worm.nodes.windows(2) {
                    let d = (pair[1].center - pair[0].center).length();
                    assert!((d - p.caves.step).abs() < 1e-3);
                }
            }
        }
    }

    #[test]
    fn worm_origins_sit_on_block_centres_inside_chunk() {
        let mut p = params();
        p.caves.max_worms_per_chunk = 8;
        let coord = ChunkCoord::new(2, -1);
        let info = generate_chunk_info(coord, 11, &p);
        let (ox, oz) = coord.origin(p.chunk_width);
        for worm in &info.worms {
            let o = worm.nodes[0].center;
            assert_eq!(o.x - o.x.floor(), 0.5);
            assert_eq!(o.z - o.z.floor(), 0.5);
            assert!(o.x >= ox as f32 && o.x < (ox + 16) as f32);
            assert!(o.z >= oz as f32 && o.z < (oz + 16) as f32);
            assert!(o.y >= p.caves.min_y && o.y < p.caves.max_y);
        }
    }

    #[test]
    fn flat_dig_field_climbs_straight_up() {
        let mut p = params();
        p.caves.max_worms_per_chunk = 4;
        p.caves.dig = Fractal {
            octaves: 0,
            ..Fractal::default()
        };
        let info = generate_chunk_info(ChunkCoord::new(0, 0), 3, &p);
        for worm in &info.worms {
            for pair in worm.nodes.windows(2) {
                assert_eq!(pair[1].center.x, pair[0].center.x);
                assert_eq!(pair[1].center.z, pair[0].center.z);
                assert!(pair[1].center.y > pair[0].center.y);
            }
            // Climbing worms stop at the top of the world.
            let last = worm.nodes.last().unwrap().center.y;
            assert!(last < p.world_height as f32);
        }
    }

    #[test]
    fn seed_plan_prefix_is_stable_when_layers_are_appended() {
        let a = SeedPlan::derive(1234, 2);
        let b = SeedPlan::derive(1234, 5);
        assert_eq!(a.dig_x, b.dig_x);
        assert_eq!(a.radius, b.radius);
        assert_eq!(a.layers[..], b.layers[..2]);
    }

    #[test]
    fn zero_worm_budget_yields_no_worms() {
        let mut p = params();
        p.caves.max_worms_per_chunk = 0;
        let info = generate_chunk_info(ChunkCoord::new(7, 7), 1, &p);
        assert!(info.worms.is_empty());
        assert_eq!(info.node_count(), 0);
    }
}
