//! Skeleton Build Settings
//!
//! ```rust,ignore
//! use sinew_animation::SkeletonBuildSettings;
//!
//! let settings = SkeletonBuildSettings::default().with_frame_rate(60.0);
//! let def = SkeletonDef::build_with_settings("hero", &source, &settings)?;
//! ```

/// Parameters for building a `SkeletonDef` and its animation definitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonBuildSettings {
    /// Rate (frames per second) used to convert keyframe times into frames.
    pub frame_rate: f32,
    /// Keyframes of one block closer than this many frames are merged.
    pub keyframe_merge_epsilon: f32,
}

impl SkeletonBuildSettings {
    #[must_use]
    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    #[must_use]
    pub fn with_keyframe_merge_epsilon(mut self, epsilon: f32) -> Self {
        self.keyframe_merge_epsilon = epsilon;
        self
    }
}

impl Default for SkeletonBuildSettings {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            keyframe_merge_epsilon: 1e-4,
        }
    }
}
