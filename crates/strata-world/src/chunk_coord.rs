use serde::{Deserialize, Serialize};

/// Column coordinate of a chunk. Chunks span the full world height, so
/// there is no vertical component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dz * dz
    }

    /// Chunk containing the world column `(wx, wz)`.
    #[inline]
    pub fn containing(wx: i32, wz: i32, width: usize) -> Self {
        let w = width as i32;
        Self::new(wx.div_euclid(w), wz.div_euclid(w))
    }

    /// World-space `(x, z)` of the chunk's minimum corner.
    #[inline]
    pub fn origin(self, width: usize) -> (i32, i32) {
        let w = width as i32;
        (self.cx * w, self.cz * w)
    }

    /// All coordinates in the square `[self - r, self + r]²`, row-major in `cz`.
    pub fn neighborhood(self, r: i32) -> impl Iterator<Item = ChunkCoord> {
        (-r..=r).flat_map(move |dz| (-r..=r).map(move |dx| self.offset(dx, dz)))
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_negative_columns() {
        assert_eq!(ChunkCoord::containing(0, 0, 16), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::containing(15, 16, 16), ChunkCoord::new(0, 1));
        assert_eq!(ChunkCoord::containing(-1, -16, 16), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::containing(-17, 0, 16), ChunkCoord::new(-2, 0));
    }

    #[test]
    fn neighborhood_covers_square() {
        let c = ChunkCoord::new(3, -2);
        let all: Vec<_> = c.neighborhood(2).collect();
        assert_eq!(all.len(), 25);
        assert!(all.contains(&ChunkCoord::new(1, -4)));
        assert!(all.contains(&ChunkCoord::new(5, 0)));
        assert!(all.contains(&c));
        assert_eq!(c.neighborhood(0).collect::<Vec<_>>(), vec![c]);
    }
}
