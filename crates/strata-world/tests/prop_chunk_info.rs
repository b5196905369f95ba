use proptest::prelude::*;
use strata_world::{ChunkCoord, StrataConfig, WorldGenParams, generate_chunk_info};

fn params() -> WorldGenParams {
    let cfg = StrataConfig::default();
    WorldGenParams::from_config(&cfg, &cfg.catalog()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Same (seed, coord, params) always produce an identical ChunkInfo
    #[test]
    fn generation_is_deterministic(seed in any::<u64>(), cx in -500i32..500, cz in -500i32..500) {
        let p = params();
        let a = generate_chunk_info(ChunkCoord::new(cx, cz), seed, &p);
        let b = generate_chunk_info(ChunkCoord::new(cx, cz), seed, &p);
        prop_assert_eq!(a, b);
    }

    // Adjacent chunks sample one continuous field: edge columns differ by a bounded slope
    #[test]
    fn heightmaps_are_continuous_across_chunk_edges(seed in any::<u64>(), cx in -50i32..50, cz in -50i32..50) {
        let p = params();
        let a = generate_chunk_info(ChunkCoord::new(cx, cz), seed, &p);
        let b = generate_chunk_info(ChunkCoord::new(cx + 1, cz), seed, &p);
        let w = p.chunk_width;
        for z in 0..w {
            let left = a.heightmaps[0].get(w - 1, z);
            let right = b.heightmaps[0].get(0, z);
            prop_assert!((left - right).abs() < 4.0, "jump {} -> {}", left, right);
        }
    }
}

#[test]
fn appending_a_layer_keeps_existing_layers_and_caves() {
    let cfg = StrataConfig::default();
    let p = WorldGenParams::from_config(&cfg, &cfg.catalog()).unwrap();

    let mut extended = cfg.clone();
    let mut extra = extended.layers[0].clone();
    extra.base_height = 5.0;
    extended.layers.push(extra);
    let q = WorldGenParams::from_config(&extended, &extended.catalog()).unwrap();

    for c in ChunkCoord::new(0, 0).neighborhood(1) {
        let a = generate_chunk_info(c, 2024, &p);
        let b = generate_chunk_info(c, 2024, &q);
        assert_eq!(b.heightmaps.len(), a.heightmaps.len() + 1);
        assert_eq!(a.heightmaps[..], b.heightmaps[..a.heightmaps.len()]);
        assert_eq!(a.worms, b.worms);
    }
}

#[test]
fn different_seeds_give_different_terrain() {
    let p = params();
    let a = generate_chunk_info(ChunkCoord::new(0, 0), 1, &p);
    let b = generate_chunk_info(ChunkCoord::new(0, 0), 2, &p);
    assert_ne!(a.heightmaps[0], b.heightmaps[0]);
}
