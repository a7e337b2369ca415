//! Slot & Block Addressing
//!
//! A bone's logical address inside a skeleton layout is a *slot index*:
//!
//! ```text
//!  31        24 23                              0
//! ┌────────────┬─────────────────────────────────┐
//! │ depth lvl  │ offset within the depth level   │
//! └────────────┴─────────────────────────────────┘
//! ```
//!
//! A *block index* keeps the depth bits and replaces the offset with the
//! number of the SIMD block that contains it (`offset / W`). Converting back
//! yields the first slot of that block.

use crate::math::ARRAY_PACKED_REALS;

pub const DEPTH_SHIFT: u32 = 24;
pub const OFFSET_MASK: u32 = 0x00FF_FFFF;
pub const DEPTH_MASK: u32 = 0xFF00_0000;

/// Largest depth level expressible in the high 8 bits.
pub const MAX_DEPTH_LEVELS: usize = 256;

/// Converts a slot index into the index of the block containing it.
#[inline]
#[must_use]
pub const fn slot_to_block_idx(slot_idx: u32) -> u32 {
    (slot_idx & DEPTH_MASK) | ((slot_idx & OFFSET_MASK) / ARRAY_PACKED_REALS as u32)
}

/// Converts a block index into the first slot index of that block.
#[inline]
#[must_use]
pub const fn block_idx_to_slot_start(block_idx: u32) -> u32 {
    (block_idx & DEPTH_MASK) | ((block_idx & OFFSET_MASK) * ARRAY_PACKED_REALS as u32)
}

/// Composite (depth level, offset) bone address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(pub u32);

impl SlotIndex {
    #[inline]
    #[must_use]
    pub const fn new(depth: usize, offset: usize) -> Self {
        debug_assert!(depth < MAX_DEPTH_LEVELS);
        debug_assert!(offset as u32 <= OFFSET_MASK);
        Self(((depth as u32) << DEPTH_SHIFT) | (offset as u32 & OFFSET_MASK))
    }

    #[inline]
    #[must_use]
    pub const fn depth(self) -> usize {
        (self.0 >> DEPTH_SHIFT) as usize
    }

    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        (self.0 & OFFSET_MASK) as usize
    }

    /// Lane of this slot inside its SIMD block.
    #[inline]
    #[must_use]
    pub const fn lane(self) -> usize {
        self.offset() % ARRAY_PACKED_REALS
    }

    #[inline]
    #[must_use]
    pub const fn block(self) -> BlockIndex {
        BlockIndex(slot_to_block_idx(self.0))
    }
}

/// Composite (depth level, block number) address of a SIMD block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockIndex(pub u32);

impl BlockIndex {
    #[inline]
    #[must_use]
    pub const fn new(depth: usize, block: usize) -> Self {
        Self(((depth as u32) << DEPTH_SHIFT) | (block as u32 & OFFSET_MASK))
    }

    #[inline]
    #[must_use]
    pub const fn depth(self) -> usize {
        (self.0 >> DEPTH_SHIFT) as usize
    }

    /// Block number within the depth level.
    #[inline]
    #[must_use]
    pub const fn block_in_level(self) -> usize {
        (self.0 & OFFSET_MASK) as usize
    }

    #[inline]
    #[must_use]
    pub const fn slot_start(self) -> SlotIndex {
        SlotIndex(block_idx_to_slot_start(self.0))
    }
}

/// Whether a level is small enough to be filled by circular replication.
#[inline]
#[must_use]
pub const fn is_replicated_level(num_bones: usize) -> bool {
    num_bones <= ARRAY_PACKED_REALS / 2
}

/// Padding ("unused") bones needed to close the last block of a level.
///
/// Replicated levels need none; other levels are padded up to the next
/// block boundary.
#[inline]
#[must_use]
pub const fn unused_slots_for_level(num_bones: usize) -> usize {
    if is_replicated_level(num_bones) {
        return 0;
    }
    let rem = num_bones % ARRAY_PACKED_REALS;
    if rem == 0 { 0 } else { ARRAY_PACKED_REALS - rem }
}

/// SIMD blocks a level occupies.
#[inline]
#[must_use]
pub const fn blocks_for_level(num_bones: usize) -> usize {
    if num_bones == 0 {
        0
    } else if is_replicated_level(num_bones) {
        1
    } else {
        num_bones.div_ceil(ARRAY_PACKED_REALS)
    }
}
