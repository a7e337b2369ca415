use std::sync::Arc;

use glam::Vec4;
use sinew_core::{ARRAY_PACKED_REALS, BoneArena};
use sinew_core::math::ArrayReal;

use super::animation_def::SkeletonAnimationDef;
use super::bone::BoneAddress;
use super::def::SkeletonDef;
use super::instance::InstanceBlock;
use super::track::KeyframeCursor;

/// Playback state of one clip on one skeleton instance.
///
/// Created by [`SkeletonInstance`](super::SkeletonInstance) for every clip of
/// its skeleton; enabling or disabling only moves it in and out of the
/// instance's active list.
#[derive(Debug, Clone)]
pub struct SkeletonAnimation {
    /// Skeleton that owns the clip. May differ from the instance's skeleton
    /// when clips were merged from a compatible one.
    source: Arc<SkeletonDef>,
    /// Skeleton of the owning instance; bone names resolve against it.
    skeleton: Arc<SkeletonDef>,
    clip_index: usize,
    addresses: Arc<[BoneAddress]>,
    /// Instance block written by each track of the clip.
    track_blocks: Vec<usize>,
    cursors: Vec<KeyframeCursor>,
    bone_weights: Vec<ArrayReal>,

    current_frame: f32,
    looping: bool,
    weight: f32,
    pub(crate) enabled: bool,
}

impl SkeletonAnimation {
    pub(crate) fn new(
        source: Arc<SkeletonDef>,
        skeleton: Arc<SkeletonDef>,
        clip_index: usize,
        addresses: Arc<[BoneAddress]>,
        level_block_start: &[usize],
        num_blocks: usize,
    ) -> Self {
        let clip = &source.animation_defs()[clip_index];

        let track_blocks: Vec<usize> = clip
            .tracks()
            .iter()
            .map(|t| level_block_start[t.block().depth()] + t.block().block_in_level())
            .collect();

        let mut bone_weights = vec![Vec4::ZERO; num_blocks];
        for bone in clip.affected_bones() {
            let address = addresses[bone];
            bone_weights[address.block][address.simd_lane()] = 1.0;
        }
        debug_assert!(
            clip.tracks().iter().zip(&track_blocks).all(|(track, &block)| {
                (0..ARRAY_PACKED_REALS)
                    .all(|lane| bone_weights[block][lane] == 0.0 || track.used_lanes() & (1 << lane) != 0)
            }),
            "weight lane outside the lanes its track animates"
        );

        let cursors = vec![KeyframeCursor::default(); track_blocks.len()];
        Self {
            source,
            skeleton,
            clip_index,
            addresses,
            track_blocks,
            cursors,
            bone_weights,
            current_frame: 0.0,
            looping: true,
            weight: 1.0,
            enabled: false,
        }
    }

    /// The packed clip this animation plays.
    #[inline]
    #[must_use]
    pub fn definition(&self) -> &SkeletonAnimationDef {
        &self.source.animation_defs()[self.clip_index]
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition().name()
    }

    #[inline]
    #[must_use]
    pub fn num_frames(&self) -> f32 {
        self.definition().num_frames()
    }

    #[inline]
    #[must_use]
    pub fn frame_rate(&self) -> f32 {
        self.definition().original_frame_rate()
    }

    /// Clip length in seconds.
    #[inline]
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.num_frames() / self.frame_rate()
    }

    // ========================================================================
    // Playback cursor
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn current_frame(&self) -> f32 {
        self.current_frame
    }

    /// Jumps to `frame`: wrapped into `[0, num_frames)` when looping,
    /// clamped into `[0, num_frames]` otherwise.
    pub fn set_frame(&mut self, frame: f32) {
        self.current_frame = self.fold_frame(frame);
    }

    pub fn add_frame(&mut self, frames: f32) {
        self.set_frame(self.current_frame + frames);
    }

    #[inline]
    #[must_use]
    pub fn current_time(&self) -> f32 {
        self.current_frame / self.frame_rate()
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.set_frame(seconds * self.frame_rate());
    }

    pub fn add_time(&mut self, seconds: f32) {
        self.add_frame(seconds * self.frame_rate());
    }

    fn fold_frame(&self, frame: f32) -> f32 {
        let num_frames = self.num_frames();
        if num_frames <= 0.0 {
            return 0.0;
        }
        if self.looping {
            let wrapped = frame % num_frames;
            let wrapped = if wrapped < 0.0 { wrapped + num_frames } else { wrapped };
            // `-tiny + num_frames` can round up to `num_frames`.
            if wrapped >= num_frames { 0.0 } else { wrapped }
        } else {
            frame.clamp(0.0, num_frames)
        }
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    #[inline]
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.looping
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ========================================================================
    // Weights
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Global weight multiplied into every bone weight when blending.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    /// Sets the weight of one bone. Ignored for bones the clip does not
    /// animate and for unknown names.
    pub fn set_bone_weight(&mut self, bone_name: &str, weight: f32) {
        if let Some(address) = self.affected_address(bone_name) {
            self.bone_weights[address.block][address.simd_lane()] = weight;
        }
    }

    /// Weight of one bone; `0.0` for bones the clip does not animate.
    #[must_use]
    pub fn get_bone_weight(&self, bone_name: &str) -> f32 {
        self.affected_address(bone_name)
            .map_or(0.0, |a| self.bone_weights[a.block][a.simd_lane()])
    }

    /// Per-block bone weights, laid out like the instance's blocks.
    #[inline]
    #[must_use]
    pub fn bone_weights(&self) -> &[ArrayReal] {
        &self.bone_weights
    }

    fn affected_address(&self, bone_name: &str) -> Option<BoneAddress> {
        let bone = self.skeleton.bone_index(bone_name).ok()?;
        self.definition()
            .affects_bone(bone)
            .then(|| self.addresses[bone])
    }

    // ========================================================================
    // Application
    // ========================================================================

    /// Samples every track at the current frame and blends it into the
    /// instance's blocks. Lanes where `mask` is zero are left untouched.
    pub(crate) fn apply(
        &mut self,
        arena: &mut BoneArena,
        blocks: &[InstanceBlock],
        mask: &[ArrayReal],
    ) {
        let clip = &self.source.animation_defs()[self.clip_index];
        let global = Vec4::splat(self.weight);
        for (t, track) in clip.tracks().iter().enumerate() {
            let block_idx = self.track_blocks[t];
            let block = blocks[block_idx];
            let weights = self.bone_weights[block_idx] * global * mask[block_idx];
            track.apply_keyframe_at(
                &mut self.cursors[t],
                self.current_frame,
                weights,
                arena.block_mut(block.depth, block.arena_block),
            );
        }
    }
}
