use proptest::prelude::*;
use strata_blocks::{Block, MaterialId};
use strata_chunk::ChunkData;
use strata_geom::BlockPos;
use strata_world::ChunkCoord;

fn dim() -> impl Strategy<Value = usize> {
    1usize..=8
}

fn small_i32() -> impl Strategy<Value = i32> {
    -100_000i32..=100_000
}

proptest! {
    // idx maps each (x,y,z) within bounds to unique in-range indices
    #[test]
    fn idx_is_unique_and_in_range(cx in small_i32(), cz in small_i32(), w in dim(), h in dim()) {
        let expect = w * w * h;
        let chunk = ChunkData::new_empty(ChunkCoord::new(cx, cz), w, h);
        prop_assert_eq!(chunk.blocks.len(), expect);

        let mut seen = vec![false; expect];
        for y in 0..h { for z in 0..w { for x in 0..w {
            let i = chunk.idx(x, y, z);
            prop_assert!(i < expect);
            prop_assert!(!seen[i]);
            seen[i] = true;
        }}}
        prop_assert!(seen.into_iter().all(|b| b));
    }

    // world_pos and local_of are inverse on every block of the chunk
    #[test]
    fn world_and_local_positions_agree(cx in small_i32(), cz in small_i32(), w in dim(), h in dim()) {
        let blocks = (0..w * w * h).map(|i| Block::solid(MaterialId(i as u16 + 1))).collect();
        let chunk = ChunkData::from_blocks_local(ChunkCoord::new(cx, cz), w, h, blocks);
        for (i, p) in chunk.positions().enumerate() {
            let (x, y, z) = chunk.local_of(p).unwrap();
            prop_assert_eq!(chunk.idx(x, y, z), i);
            prop_assert_eq!(chunk.get_world(p), Some(chunk.blocks[i]));
        }
    }

    // Positions just outside the column or the vertical range are rejected
    #[test]
    fn outside_positions_are_rejected(cx in small_i32(), cz in small_i32(), w in dim(), h in dim()) {
        let mut chunk = ChunkData::new_empty(ChunkCoord::new(cx, cz), w, h);
        let (x0, z0) = chunk.base();
        let (wi, hi) = (w as i32, h as i32);
        let outside = [
            BlockPos::new(x0 - 1, 0, z0),
            BlockPos::new(x0 + wi, 0, z0),
            BlockPos::new(x0, 0, z0 - 1),
            BlockPos::new(x0, 0, z0 + wi),
            BlockPos::new(x0, -1, z0),
            BlockPos::new(x0, hi, z0),
        ];
        for p in outside {
            prop_assert!(!chunk.contains_world(p));
            prop_assert_eq!(chunk.get_world(p), None);
            prop_assert!(!chunk.set_world(p, Block::solid(MaterialId(1))));
        }
        prop_assert!(chunk.contains_world(BlockPos::new(x0 + wi - 1, hi - 1, z0 + wi - 1)));
    }
}

#[test]
fn light_pending_set_deduplicates() {
    let mut chunk = ChunkData::new_empty(ChunkCoord::new(0, 0), 4, 4);
    let p = BlockPos::new(1, 2, 3);
    assert!(chunk.mark_light_pending(p));
    assert!(!chunk.mark_light_pending(p));
    assert!(chunk.is_light_pending(p));
    assert_eq!(chunk.pending_light_count(), 1);
    assert!(!chunk.mark_light_pending(BlockPos::new(9, 0, 0)));
    chunk.clear_light_pending(p);
    assert_eq!(chunk.pending_light_count(), 0);
}
