//! Sinew Animation
//!
//! Skeleton layouts, packed clips and per-entity playback:
//!
//! - [`skeleton`]: `SkeletonDef`, `SkeletonAnimationDef`, `SkeletonInstance`,
//!   `SkeletonAnimation`
//! - [`source`]: read-only source skeleton records consumed at build time
//! - [`registry`]: name-keyed cache of shared skeleton definitions
//! - [`settings`]: build parameters

pub mod registry;
pub mod settings;
pub mod skeleton;
pub mod source;

pub use registry::{DEFAULT_GROUP, SkeletonDefRegistry};
pub use settings::SkeletonBuildSettings;
pub use skeleton::{
    Bone, BoneAddress, BoneData, DepthLevelInfo, KeyframeCursor, NodeKey, SkeletonAnimation,
    SkeletonAnimationDef, SkeletonDef, SkeletonInstance, SkeletonTrack,
};
pub use source::{SourceAnimation, SourceBone, SourceKeyFrame, SourceSkeleton, SourceTrack};
