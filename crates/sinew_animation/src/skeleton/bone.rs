use glam::{Quat, Vec3};
use sinew_core::ARRAY_PACKED_REALS;
use sinew_core::math::BoneTransform;

/// Static description of one bone of a [`SkeletonDef`](super::SkeletonDef).
#[derive(Debug, Clone, PartialEq)]
pub struct BoneData {
    pub index: usize,
    pub parent: Option<usize>,
    pub name: String,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
    pub inherit_orientation: bool,
    pub inherit_scale: bool,
}

impl BoneData {
    /// Local bind transform.
    #[inline]
    #[must_use]
    pub fn bind_transform(&self) -> BoneTransform {
        BoneTransform::new(self.position, self.orientation, self.scale)
    }
}

/// Where a bone's lane lives inside an instance's SIMD arrays.
///
/// Computed once when the instance is created so the manual-bone mask and the
/// per-animation weight buffers are addressed in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneAddress {
    /// Depth level of the bone.
    pub depth: usize,
    /// Lane offset from the first block the instance uses at this level.
    pub level_lane: usize,
    /// Instance block index: blocks of all shallower levels plus
    /// `level_lane / W`.
    pub block: usize,
}

impl BoneAddress {
    /// Lane inside [`Self::block`].
    #[inline]
    #[must_use]
    pub fn simd_lane(&self) -> usize {
        self.level_lane % ARRAY_PACKED_REALS
    }
}

/// Lightweight handle to a live bone of a [`SkeletonInstance`](super::SkeletonInstance).
///
/// Handles are plain data; the transform itself lives in the instance's
/// [`BoneArena`](sinew_core::BoneArena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bone {
    pub(crate) instance: u32,
    pub(crate) index: usize,
    pub(crate) parent: Option<usize>,
    pub(crate) arena_slot: usize,
    pub(crate) address: BoneAddress,
}

impl Bone {
    /// Index of the bone in the skeleton definition.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.address.depth
    }

    /// Slot inside the arena's depth level.
    #[inline]
    #[must_use]
    pub fn arena_slot(&self) -> usize {
        self.arena_slot
    }

    #[inline]
    #[must_use]
    pub fn address(&self) -> BoneAddress {
        self.address
    }
}
