#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Sinew
//!
//! SIMD-batched skeletal animation. Bones are stored by depth level in
//! structure-of-arrays blocks of [`ARRAY_PACKED_REALS`] lanes so that reset,
//! keyframe sampling and blending run on four bones per instruction.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sinew::{BoneArena, SkeletonDef, SkeletonInstance};
//!
//! let def = Arc::new(SkeletonDef::build("hero", &source, 30.0)?);
//! let mut arena = BoneArena::new(def.name());
//! let mut hero = SkeletonInstance::new(Arc::clone(&def), &mut arena);
//!
//! hero.set_animation_enabled("walk", true)?;
//! hero.get_animation_mut("walk")?.add_time(dt);
//! hero.update(&mut arena);
//! ```

pub use glam;
pub use sinew_animation as animation;
pub use sinew_core as core;

pub use sinew_animation::{
    Bone, DEFAULT_GROUP, NodeKey, SkeletonAnimation, SkeletonAnimationDef, SkeletonBuildSettings,
    SkeletonDef, SkeletonDefRegistry, SkeletonInstance, SourceAnimation, SourceBone,
    SourceKeyFrame, SourceSkeleton, SourceTrack,
};
pub use sinew_core::{ARRAY_PACKED_REALS, BoneArena, BoneTransform, Result, SinewError};
