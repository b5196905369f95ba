use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use strata_blocks::{Block, MaterialId};
use strata_dimension::{
    BlockAccessor, Dimension, DimensionOptions, GenerateError, MeshInvalidation,
};
use strata_geom::BlockPos;
use strata_lighting::{LightState, recompute};
use strata_runtime::EntryState;
use strata_world::{ChunkCoord, StrataConfig, WorldGenParams};

fn small_config() -> StrataConfig {
    let mut cfg = StrataConfig::default();
    cfg.world.seed = 4242;
    cfg.world.chunk_width = 8;
    cfg.world.world_height = 32;
    cfg.layers[0].base_height = 10.0;
    cfg.layers[0].amplitude = 3.0;
    cfg.caves.max_worms_per_chunk = 2;
    cfg.caves.max_segments = 8;
    cfg.caves.min_y = 2.0;
    cfg.caves.max_y = 12.0;
    cfg.caves.radius_base = 1.5;
    cfg
}

fn small_dimension() -> Dimension {
    let cfg = small_config();
    let params = WorldGenParams::from_config(&cfg, &cfg.catalog()).unwrap();
    Dimension::new(
        cfg.world.seed,
        Arc::new(params),
        DimensionOptions {
            workers: 2,
            light_budget: 4096,
            ..DimensionOptions::default()
        },
    )
}

fn generate_blocking(dim: &mut Dimension, coord: ChunkCoord) {
    let deadline = Instant::now() + Duration::from_secs(20);
    loop {
        match dim.generate_chunk(coord) {
            Ok(()) => return,
            Err(GenerateError::NotReady { .. }) => {
                assert!(Instant::now() < deadline, "chunk info never became ready");
                thread::sleep(Duration::from_millis(2));
            }
            Err(e) => panic!("unexpected: {e}"),
        }
    }
}

fn settle_light(dim: &mut Dimension) {
    for _ in 0..100_000 {
        if dim.light_queue().is_empty() {
            return;
        }
        dim.tick_lighting();
    }
    panic!("lighting did not converge");
}

/// First empty block above the terrain of a local column in chunk (0, 0).
fn air_above_ground(dim: &Dimension, x: usize, z: usize) -> BlockPos {
    let chunk = dim.chunk(ChunkCoord::new(0, 0)).unwrap();
    let top = chunk.top_solid(x, z).unwrap();
    BlockPos::new(x as i32, top as i32 + 1, z as i32)
}

#[test]
fn chunk_is_not_materialized_before_its_neighborhood_is_ready() {
    let mut dim = small_dimension();
    let c = ChunkCoord::new(0, 0);
    assert_eq!(dim.params().carve_radius(), 2);

    match dim.generate_chunk(c) {
        Err(GenerateError::NotReady { missing }) => {
            // Nothing was ready yet, so every coordinate of the 5x5 square is missing.
            assert_eq!(missing.len(), 25);
            for m in &missing {
                assert_ne!(dim.cache().state(*m), EntryState::Absent);
            }
        }
        other => panic!("expected NotReady, got {other:?}"),
    }
    assert!(!dim.is_generated(c));
    assert_eq!(dim.get_block(BlockPos::new(1, 1, 1)), None);
    assert_eq!(dim.stats().chunks, 0);
}

#[test]
fn generated_chunk_is_flagged_major_and_queued_for_light() {
    let mut dim = small_dimension();
    let c = ChunkCoord::new(0, 0);
    generate_blocking(&mut dim, c);
    let chunk = dim.chunk(c).unwrap();
    assert!(chunk.mesh_invalidated_major);
    assert_eq!(chunk.pending_light_count(), 8 * 8 * 32);
    assert_eq!(dim.light_queue().len(), 8 * 8 * 32);
    assert!(dim.cache().neighborhood_ready(c));
}

#[test]
fn duplicate_generation_keeps_existing_data() {
    let mut dim = small_dimension();
    let c = ChunkCoord::new(0, 0);
    generate_blocking(&mut dim, c);
    let p = BlockPos::new(2, 1, 2);
    let marker = Block::solid(MaterialId(200));
    assert!(dim.set_block(p, marker));

    assert_eq!(dim.generate_chunk(c), Err(GenerateError::AlreadyGenerated));
    assert!(!dim.try_generate(c));
    assert_eq!(dim.get_block(p).unwrap().id, MaterialId(200));
    assert_eq!(dim.stats().chunks, 1);
}

#[test]
fn accessors_reject_ungenerated_and_out_of_range_positions() {
    let mut dim = small_dimension();
    generate_blocking(&mut dim, ChunkCoord::new(0, 0));
    let stone = Block::solid(MaterialId(1));

    assert!(dim.get_block(BlockPos::new(0, 0, 0)).is_some());
    assert!(dim.get_block(BlockPos::new(7, 31, 7)).is_some());
    for p in [
        BlockPos::new(0, -1, 0),
        BlockPos::new(0, 32, 0),
        BlockPos::new(8, 5, 0),
        BlockPos::new(-1, 5, 0),
        BlockPos::new(0, 5, 100),
    ] {
        assert_eq!(dim.get_block(p), None, "{p:?}");
        assert!(!dim.set_block(p, stone), "{p:?}");
        assert!(!dim.set_destroy_level(p, 3));
    }
    assert!(!dim.invalidate(BlockPos::new(50, 5, 50)));
}

#[test]
fn lighting_converges_to_fixed_point_after_generation() {
    let mut dim = small_dimension();
    let c = ChunkCoord::new(0, 0);
    generate_blocking(&mut dim, c);
    settle_light(&mut dim);

    let chunk = dim.chunk(c).unwrap();
    assert_eq!(chunk.pending_light_count(), 0);
    for p in chunk.positions() {
        let b = chunk.get_world(p).unwrap();
        assert_eq!(Some(LightState::of(b)), recompute(dim.chunks(), p), "{p:?}");
    }
    // The top layer is open sky everywhere.
    for z in 0..8 {
        for x in 0..8 {
            let b = dim.get_block(BlockPos::new(x, 31, z)).unwrap();
            assert!(b.sky());
            assert_eq!(b.light(), 15);
        }
    }
    assert!(dim.stats().light_commits > 0);
}

#[test]
fn placing_a_solid_block_darkens_it_and_queues_exactly_its_neighbors() {
    let mut dim = small_dimension();
    generate_blocking(&mut dim, ChunkCoord::new(0, 0));
    settle_light(&mut dim);

    let p = air_above_ground(&dim, 3, 4).above();
    assert!(dim.get_block(p).unwrap().sky());
    assert!(dim.set_block(p, Block::solid(MaterialId(1)).with_light(true, 15)));

    let placed = dim.get_block(p).unwrap();
    assert!(placed.is_solid());
    assert_eq!((placed.sky(), placed.light()), (false, 0));

    let q = dim.light_queue();
    assert_eq!(q.len(), 6);
    assert!(!q.contains(p));
    for n in p.neighbors() {
        assert!(q.contains(n), "{n:?} not queued");
    }

    settle_light(&mut dim);
    // The block under the new roof lost its sky flag.
    let below = dim.get_block(p.offset(0, -1, 0)).unwrap();
    assert!(!below.sky());
    assert!(below.light() < 15);
}

#[test]
fn removing_a_block_queues_itself_and_relights() {
    let mut dim = small_dimension();
    generate_blocking(&mut dim, ChunkCoord::new(0, 0));
    settle_light(&mut dim);

    let ground = air_above_ground(&dim, 5, 5).offset(0, -1, 0);
    assert!(dim.get_block(ground).unwrap().is_solid());
    assert!(dim.set_block(ground, Block::NONE));
    assert_eq!(dim.light_queue().len(), 1);
    assert!(dim.light_queue().contains(ground));

    settle_light(&mut dim);
    let b = dim.get_block(ground).unwrap();
    assert!(b.sky());
    assert_eq!(b.light(), 15);
}

#[test]
fn invalidation_severity_and_minor_throttle() {
    let mut dim = small_dimension();
    let c = ChunkCoord::new(0, 0);
    generate_blocking(&mut dim, c);
    let t0 = Instant::now();

    assert_eq!(dim.take_mesh_invalidations(t0), vec![(c, MeshInvalidation::Major)]);
    assert!(dim.take_mesh_invalidations(t0).is_empty());

    // Light-only changes raise a minor signal that waits out the interval.
    settle_light(&mut dim);
    assert!(dim.chunk(c).unwrap().mesh_invalidated_minor);
    assert!(!dim.chunk(c).unwrap().mesh_invalidated_major);
    assert!(dim.take_mesh_invalidations(t0 + Duration::from_secs(1)).is_empty());
    assert_eq!(
        dim.take_mesh_invalidations(t0 + Duration::from_secs(5)),
        vec![(c, MeshInvalidation::Minor)]
    );

    // Cosmetic damage is minor too.
    let p = air_above_ground(&dim, 1, 1).offset(0, -1, 0);
    assert!(dim.set_destroy_level(p, 7));
    assert_eq!(dim.get_block(p).unwrap().destroy_level(), 7);
    assert!(dim.take_mesh_invalidations(t0 + Duration::from_secs(6)).is_empty());
    assert_eq!(
        dim.take_mesh_invalidations(t0 + Duration::from_secs(10)),
        vec![(c, MeshInvalidation::Minor)]
    );

    // Edits are major and bypass the throttle.
    assert!(dim.set_block(p, Block::NONE));
    assert_eq!(
        dim.take_mesh_invalidations(t0 + Duration::from_secs(10)),
        vec![(c, MeshInvalidation::Major)]
    );
}

#[test]
fn same_seed_gives_identical_chunks() {
    let mut a = small_dimension();
    let mut b = small_dimension();
    for c in [ChunkCoord::new(0, 0), ChunkCoord::new(-1, 2)] {
        generate_blocking(&mut a, c);
        generate_blocking(&mut b, c);
        assert_eq!(a.chunk(c).unwrap().blocks, b.chunk(c).unwrap().blocks);
    }
}

#[test]
fn neighbor_generation_relights_the_shared_face() {
    let mut dim = small_dimension();
    let a = ChunkCoord::new(0, 0);
    let b = ChunkCoord::new(1, 0);
    generate_blocking(&mut dim, a);
    settle_light(&mut dim);
    generate_blocking(&mut dim, b);
    // The facing column of the first chunk is queued along with the new chunk.
    assert!(dim.light_queue().contains(BlockPos::new(7, 0, 0)));
    assert!(dim.light_queue().contains(BlockPos::new(7, 31, 7)));
    settle_light(&mut dim);

    for c in [a, b] {
        let chunk = dim.chunk(c).unwrap();
        for p in chunk.positions() {
            let blk = chunk.get_world(p).unwrap();
            assert_eq!(Some(LightState::of(blk)), recompute(dim.chunks(), p), "{p:?}");
        }
    }
}
