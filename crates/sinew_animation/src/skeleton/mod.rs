//! SIMD-batched Skeletal Animation
//!
//! The four types of this module work together and share internals through
//! `pub(crate)` items only:
//!
//! - [`SkeletonDef`]: immutable layout of a skeleton type. Bones are grouped
//!   by depth level, addressed by slot / block indices, and the bind pose is
//!   stored as SIMD blocks.
//! - [`SkeletonAnimationDef`]: immutable clip data, one [`SkeletonTrack`] of
//!   packed keyframes per SIMD block.
//! - [`SkeletonInstance`]: the live bones of one entity inside a shared
//!   [`BoneArena`](sinew_core::BoneArena), plus the manual-bone mask and one
//!   [`SkeletonAnimation`] per clip.
//! - [`SkeletonAnimation`]: playback cursor and per-bone weights of one clip
//!   on one instance.
//!
//! # Frame flow
//!
//! ```text
//! update()
//!   ├─ reset_to_pose: lerp(current, bind_pose, manual_mask) per block
//!   └─ for each active animation (activation order)
//!        └─ for each track: sample keyframes ─► blend × (weight × bone weight)
//! ```

mod animation;
mod animation_def;
mod bone;
mod def;
mod instance;
mod track;

pub use animation::SkeletonAnimation;
pub use animation_def::SkeletonAnimationDef;
pub use bone::{Bone, BoneAddress, BoneData};
pub use def::{DepthLevelInfo, ReverseBindBlock, SkeletonDef};
pub use instance::{NodeKey, SkeletonInstance};
pub use track::{KeyframeCursor, SkeletonTrack};
