/// Highest light (and destroy) level a block can carry.
pub const MAX_LIGHT: u8 = 15;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// Sentinel for "no material" (empty space).
    pub const NONE: MaterialId = MaterialId(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

const LIGHT_MASK: u16 = 0x000F;
const DESTROY_SHIFT: u16 = 4;
const DESTROY_MASK: u16 = 0x00F0;
const SKY_BIT: u16 = 0x0100;

/// A single voxel: material plus packed light/damage state.
///
/// Layout of `packed`: bits 0..4 light level, bits 4..8 destroy level,
/// bit 8 sky flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    pub id: MaterialId,
    packed: u16,
}

impl Block {
    pub const NONE: Block = Block {
        id: MaterialId::NONE,
        packed: 0,
    };

    /// Empty block that sees the sky. Light is left at zero for the lighting pass.
    pub const SKY: Block = Block {
        id: MaterialId::NONE,
        packed: SKY_BIT,
    };

    #[inline]
    pub const fn solid(id: MaterialId) -> Self {
        Block { id, packed: 0 }
    }

    #[inline]
    pub fn is_solid(self) -> bool {
        !self.id.is_none()
    }

    #[inline]
    pub fn sky(self) -> bool {
        self.packed & SKY_BIT != 0
    }

    #[inline]
    pub fn light(self) -> u8 {
        (self.packed & LIGHT_MASK) as u8
    }

    #[inline]
    pub fn destroy_level(self) -> u8 {
        ((self.packed & DESTROY_MASK) >> DESTROY_SHIFT) as u8
    }

    /// Same block with the given light state; `level` is clamped to [`MAX_LIGHT`].
    #[inline]
    pub fn with_light(self, sky: bool, level: u8) -> Self {
        let level = u16::from(level.min(MAX_LIGHT));
        let mut packed = (self.packed & !(LIGHT_MASK | SKY_BIT)) | level;
        if sky {
            packed |= SKY_BIT;
        }
        Block { packed, ..self }
    }

    #[inline]
    pub fn with_destroy_level(self, level: u8) -> Self {
        let level = u16::from(level.min(MAX_LIGHT)) << DESTROY_SHIFT;
        Block {
            packed: (self.packed & !DESTROY_MASK) | level,
            ..self
        }
    }

    /// Light state as a `(sky, level)` pair.
    #[inline]
    pub fn light_state(self) -> (bool, u8) {
        (self.sky(), self.light())
    }
}
