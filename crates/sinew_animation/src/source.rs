//! Source Skeleton Records
//!
//! Plain, read-only bone and keyframe records as produced by a skeleton file
//! loader. They are only consumed while building a
//! [`SkeletonDef`](crate::skeleton::SkeletonDef); nothing at runtime keeps a
//! reference to them.
//!
//! Keyframes follow the usual skeleton-file convention: translation, rotation
//! and scale are *relative to the bind pose* of the bone they animate.

use glam::{Quat, Vec3};

/// One bone of a source skeleton. Its index is its position in
/// [`SourceSkeleton::bones`].
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBone {
    pub name: String,
    pub parent: Option<usize>,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
    pub inherit_orientation: bool,
    pub inherit_scale: bool,
}

impl SourceBone {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            inherit_orientation: true,
            inherit_scale: true,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, position: Vec3, orientation: Quat, scale: Vec3) -> Self {
        self.position = position;
        self.orientation = orientation;
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_inheritance(mut self, orientation: bool, scale: bool) -> Self {
        self.inherit_orientation = orientation;
        self.inherit_scale = scale;
        self
    }
}

/// A bind-pose relative sample at `time` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceKeyFrame {
    pub time: f32,
    pub translate: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl SourceKeyFrame {
    #[must_use]
    pub fn new(time: f32, translate: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            time,
            translate,
            rotation,
            scale,
        }
    }

    /// A keyframe that leaves the bone at its bind pose.
    #[must_use]
    pub fn identity(time: f32) -> Self {
        Self::new(time, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
    }
}

/// Keyframes of a single bone.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTrack {
    pub bone: usize,
    pub keyframes: Vec<SourceKeyFrame>,
}

impl SourceTrack {
    #[must_use]
    pub fn new(bone: usize, keyframes: Vec<SourceKeyFrame>) -> Self {
        Self { bone, keyframes }
    }
}

/// An animation clip of a source skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAnimation {
    pub name: String,
    /// Clip length in seconds.
    pub length: f32,
    pub tracks: Vec<SourceTrack>,
}

impl SourceAnimation {
    #[must_use]
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length,
            tracks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_track(mut self, track: SourceTrack) -> Self {
        self.tracks.push(track);
        self
    }
}

/// A complete source skeleton: bone hierarchy plus its clips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSkeleton {
    pub bones: Vec<SourceBone>,
    pub animations: Vec<SourceAnimation>,
}

impl SourceSkeleton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bone and returns its index.
    pub fn add_bone(&mut self, bone: SourceBone) -> usize {
        self.bones.push(bone);
        self.bones.len() - 1
    }

    pub fn add_animation(&mut self, animation: SourceAnimation) {
        self.animations.push(animation);
    }
}
