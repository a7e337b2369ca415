//! Bone Arena
//!
//! Depth-ordered, SIMD-block-aligned storage for the local transforms of every
//! bone of every instance that shares one skeleton layout.
//!
//! # Contract
//!
//! - Callers allocate in increasing depth order (a skeleton instance walks its
//!   depth levels root first).
//! - Storage is handed out as whole [`ArrayTransform`] blocks; a range never
//!   straddles a block boundary unless it starts on one.
//! - Deallocation is LIFO per depth level. Releasing a range that is not on top
//!   of its level's stack is allowed, but the slots are only reclaimed once
//!   every range above them has been released. Live data is never moved.
//!
//! Slots are addressed by `(depth, slot)` pairs which stay valid while the
//! block vectors grow, so instances hold indices instead of pointers.

use glam::Affine3A;

use crate::math::{ARRAY_PACKED_REALS, ArrayTransform, BoneTransform};

/// A contiguous run of slots inside one depth level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub depth: usize,
    pub start: usize,
    pub count: usize,
}

impl SlotRange {
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    /// First block touched by this range.
    #[inline]
    #[must_use]
    pub fn first_block(&self) -> usize {
        self.start / ARRAY_PACKED_REALS
    }
}

#[derive(Debug, Clone, Copy)]
struct StackEntry {
    /// Level top before this allocation, including any alignment gap.
    begin: usize,
    range: SlotRange,
    live: bool,
}

#[derive(Debug, Default)]
struct LevelStorage {
    blocks: Vec<ArrayTransform>,
    derived: Vec<Affine3A>,
    top: usize,
    stack: Vec<StackEntry>,
}

impl LevelStorage {
    fn reserve_slots(&mut self, end: usize) {
        let needed_blocks = end.div_ceil(ARRAY_PACKED_REALS);
        if needed_blocks > self.blocks.len() {
            self.blocks.resize(needed_blocks, ArrayTransform::IDENTITY);
            self.derived
                .resize(needed_blocks * ARRAY_PACKED_REALS, Affine3A::IDENTITY);
        }
    }
}

/// Shared bone storage for all instances of one skeleton layout.
#[derive(Debug)]
pub struct BoneArena {
    layout: String,
    levels: Vec<LevelStorage>,
}

impl BoneArena {
    /// Creates an empty arena for the skeleton layout named `layout`.
    #[must_use]
    pub fn new(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            levels: Vec::new(),
        }
    }

    /// Name of the skeleton layout this arena stores.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &str {
        &self.layout
    }

    #[inline]
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Allocates `count` slots at the top of depth level `depth`.
    ///
    /// The start slot is rounded up to a multiple of `alignment`. Ranges
    /// shorter than a block are additionally kept inside a single block.
    pub fn allocate(&mut self, depth: usize, count: usize, alignment: usize) -> SlotRange {
        debug_assert!(alignment > 0);
        if depth >= self.levels.len() {
            self.levels.resize_with(depth + 1, LevelStorage::default);
        }
        let level = &mut self.levels[depth];

        let begin = level.top;
        let mut start = begin.next_multiple_of(alignment);
        if count <= ARRAY_PACKED_REALS && (start % ARRAY_PACKED_REALS) + count > ARRAY_PACKED_REALS
        {
            start = begin.next_multiple_of(ARRAY_PACKED_REALS);
        }

        let range = SlotRange {
            depth,
            start,
            count,
        };
        level.reserve_slots(range.end());
        for slot in range.start..range.end() {
            level.blocks[slot / ARRAY_PACKED_REALS]
                .set_lane(slot % ARRAY_PACKED_REALS, &BoneTransform::IDENTITY);
            level.derived[slot] = Affine3A::IDENTITY;
        }

        level.top = range.end();
        level.stack.push(StackEntry {
            begin,
            range,
            live: true,
        });

        log::trace!(
            "BoneArena '{}': allocated {} slot(s) at depth {} [{}..{})",
            self.layout,
            count,
            depth,
            range.start,
            range.end()
        );
        range
    }

    /// Returns a range to its level.
    ///
    /// The top of the level shrinks past every released range that is on top
    /// of the stack; ranges below live allocations stay reserved until then.
    pub fn release(&mut self, range: SlotRange) {
        let Some(level) = self.levels.get_mut(range.depth) else {
            debug_assert!(false, "release on unknown depth level {}", range.depth);
            return;
        };

        let Some(pos) = level
            .stack
            .iter()
            .rposition(|e| e.live && e.range == range)
        else {
            debug_assert!(false, "release of a range this arena never handed out");
            return;
        };

        level.stack[pos].live = false;
        if pos + 1 != level.stack.len() {
            log::trace!(
                "BoneArena '{}': out-of-order release at depth {} [{}..{}), reclaim deferred",
                self.layout,
                range.depth,
                range.start,
                range.end()
            );
        }

        while let Some(entry) = level.stack.last() {
            if entry.live {
                break;
            }
            level.top = entry.begin;
            level.stack.pop();
        }
    }

    // ========================================================================
    // Block / slot access
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn block(&self, depth: usize, block: usize) -> &ArrayTransform {
        &self.levels[depth].blocks[block]
    }

    #[inline]
    pub fn block_mut(&mut self, depth: usize, block: usize) -> &mut ArrayTransform {
        &mut self.levels[depth].blocks[block]
    }

    /// Local transform stored in one slot.
    #[inline]
    #[must_use]
    pub fn local(&self, depth: usize, slot: usize) -> BoneTransform {
        self.levels[depth].blocks[slot / ARRAY_PACKED_REALS].lane(slot % ARRAY_PACKED_REALS)
    }

    #[inline]
    pub fn set_local(&mut self, depth: usize, slot: usize, transform: &BoneTransform) {
        self.levels[depth].blocks[slot / ARRAY_PACKED_REALS]
            .set_lane(slot % ARRAY_PACKED_REALS, transform);
    }

    /// World-space matrix last written for one slot.
    #[inline]
    #[must_use]
    pub fn derived(&self, depth: usize, slot: usize) -> Affine3A {
        self.levels[depth].derived[slot]
    }

    #[inline]
    pub fn set_derived(&mut self, depth: usize, slot: usize, matrix: Affine3A) {
        self.levels[depth].derived[slot] = matrix;
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Blocks currently backing depth level `depth`.
    #[must_use]
    pub fn num_blocks(&self, depth: usize) -> usize {
        self.levels.get(depth).map_or(0, |l| l.blocks.len())
    }

    /// One past the highest reserved slot of depth level `depth`.
    #[must_use]
    pub fn top(&self, depth: usize) -> usize {
        self.levels.get(depth).map_or(0, |l| l.top)
    }

    /// Slots held by live allocations at depth level `depth`.
    #[must_use]
    pub fn live_slots(&self, depth: usize) -> usize {
        self.levels.get(depth).map_or(0, |l| {
            l.stack
                .iter()
                .filter(|e| e.live)
                .map(|e| e.range.count)
                .sum()
        })
    }
}
