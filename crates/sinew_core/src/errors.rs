//! Error Types
//!
//! This module defines the error types used throughout the animation core.
//!
//! # Overview
//!
//! The main error type [`SinewError`] covers the failure modes that are
//! surfaced to callers:
//! - Name lookups on bones, animations and registered skeletons
//! - Malformed source hierarchies detected while building a skeleton layout
//! - Merging animations from a skeleton with a different bone layout
//!
//! Precondition violations on the per-frame paths (a bone handle from another
//! instance, an instance used with the wrong arena) are only checked by debug
//! assertions and never reach this type.
//!
//! ```rust,ignore
//! use sinew_core::errors::{SinewError, Result};
//!
//! fn find(name: &str) -> Result<usize> {
//!     Err(SinewError::BoneNotFound(name.to_string()))
//! }
//! ```

use thiserror::Error;

/// The main error type for the animation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinewError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No bone with the given name exists in the skeleton.
    #[error("Bone not found: {0}")]
    BoneNotFound(String),

    /// No animation with the given name exists in the skeleton.
    #[error("Animation not found: {0}")]
    AnimationNotFound(String),

    /// No skeleton definition is registered under the given name and group.
    #[error("Skeleton not found: {name} (group: {group})")]
    SkeletonNotFound {
        /// Skeleton name
        name: String,
        /// Resource group the lookup was made in
        group: String,
    },

    // ========================================================================
    // Build Errors
    // ========================================================================
    /// The source bone hierarchy is malformed (bad parent index or a cycle).
    #[error("Invalid bone hierarchy: {0}")]
    InvalidHierarchy(String),

    /// The requested sampling frame rate is not a positive finite number.
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f32),

    /// Animations were merged from a skeleton whose bone layout differs.
    #[error("Incompatible skeleton layout: expected '{expected}', found '{found}'")]
    IncompatibleSkeleton {
        /// Name of the skeleton receiving the animations
        expected: String,
        /// Name of the skeleton the animations come from
        found: String,
    },
}

/// Alias for `Result<T, SinewError>`.
pub type Result<T> = std::result::Result<T, SinewError>;
