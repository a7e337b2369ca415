//! Sinew Core
//!
//! Foundational pieces shared by the skeletal animation crates:
//!
//! - [`math`]: SoA lane types ([`ArrayVector3`], [`ArrayQuaternion`],
//!   [`ArrayTransform`]) operating on [`ARRAY_PACKED_REALS`] bones at once
//! - [`slots`]: slot / block index packing and per-level padding rules
//! - [`arena`]: the depth-ordered LIFO [`BoneArena`]
//! - [`errors`]: [`SinewError`] and the crate-wide [`Result`] alias

pub mod arena;
pub mod errors;
pub mod math;
pub mod slots;

pub use arena::{BoneArena, SlotRange};
pub use errors::{Result, SinewError};
pub use math::{
    ARRAY_PACKED_REALS, ArrayQuaternion, ArrayReal, ArrayTransform, ArrayVector3, BoneTransform,
    KfTransform,
};
pub use slots::{BlockIndex, SlotIndex, block_idx_to_slot_start, slot_to_block_idx};
