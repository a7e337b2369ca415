use std::collections::BTreeMap;

use glam::{Quat, Vec4};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use sinew_core::ARRAY_PACKED_REALS;
use sinew_core::math::{ArrayTransform, BoneTransform, KfTransform};
use sinew_core::slots::{BlockIndex, is_replicated_level};

use super::def::SkeletonDef;
use super::track::SkeletonTrack;
use crate::settings::SkeletonBuildSettings;
use crate::source::{SourceAnimation, SourceKeyFrame, SourceTrack};

/// Immutable keyframe data of one clip, packed one track per SIMD block.
#[derive(Debug, Clone)]
pub struct SkeletonAnimationDef {
    name: String,
    num_frames: f32,
    original_frame_rate: f32,
    tracks: Vec<SkeletonTrack>,
    /// Bones with a track in this clip.
    affected_bones: FxHashSet<usize>,
}

impl SkeletonAnimationDef {
    /// Packs `source` against the layout of `skeleton`.
    ///
    /// For every block the keyframe times of all its bones are merged. Bones
    /// without an explicit sample at a merged time receive one interpolated
    /// from their neighbours; the interpolated rotation is *not*
    /// renormalized so playback speed matches the source clip.
    pub(crate) fn build(
        skeleton: &SkeletonDef,
        source: &SourceAnimation,
        settings: &SkeletonBuildSettings,
    ) -> Self {
        let frame_rate = settings.frame_rate;
        let epsilon = settings.keyframe_merge_epsilon.max(0.0);
        let num_bones = skeleton.bones().len();

        let mut per_block: BTreeMap<BlockIndex, SmallVec<[&SourceTrack; 4]>> = BTreeMap::new();
        for track in &source.tracks {
            if track.bone >= num_bones {
                log::warn!(
                    "Animation '{}': track targets unknown bone {} and is skipped",
                    source.name,
                    track.bone
                );
                continue;
            }
            if track.keyframes.is_empty() {
                continue;
            }
            let block = skeleton.slot_of_bone(track.bone).block();
            per_block.entry(block).or_default().push(track);
        }

        let mut tracks = Vec::with_capacity(per_block.len());
        let mut affected_bones = FxHashSet::default();

        for (block, block_tracks) in per_block {
            let depth = block.depth();
            let level_bones = skeleton.depth_levels()[depth].num_bones_in_level;
            let replicated = is_replicated_level(level_bones);

            // Frame-sorted copies of every bone's keyframes.
            let bone_keys: SmallVec<[(usize, Vec<(f32, SourceKeyFrame)>); 4]> = block_tracks
                .iter()
                .map(|t| {
                    let mut keys: Vec<(f32, SourceKeyFrame)> =
                        t.keyframes.iter().map(|k| (k.time * frame_rate, *k)).collect();
                    keys.sort_by(|a, b| a.0.total_cmp(&b.0));
                    (t.bone, keys)
                })
                .collect();

            let mut frames: Vec<f32> = bone_keys
                .iter()
                .flat_map(|(_, keys)| keys.iter().map(|(f, _)| *f))
                .collect();
            frames.sort_by(f32::total_cmp);
            frames.dedup_by(|b, a| (*b - *a).abs() <= epsilon);

            let mut used_lanes = 0u8;
            for (bone, _) in &bone_keys {
                let slot = skeleton.slot_of_bone(*bone);
                for lane in lanes_of(slot.offset(), level_bones, replicated) {
                    used_lanes |= 1 << lane;
                }
                affected_bones.insert(*bone);
            }

            let keyframes: Vec<KfTransform> = frames
                .iter()
                .map(|&frame| {
                    let mut kf = ArrayTransform::IDENTITY;
                    for (bone, keys) in &bone_keys {
                        let value = sample_source(keys, frame, epsilon);
                        let offset = skeleton.slot_of_bone(*bone).offset();
                        for lane in lanes_of(offset, level_bones, replicated) {
                            kf.set_lane(lane, &value);
                        }
                    }
                    kf
                })
                .collect();

            tracks.push(SkeletonTrack::new(block, used_lanes, frames, keyframes));
        }

        let def = Self {
            name: source.name.clone(),
            num_frames: source.length * frame_rate,
            original_frame_rate: frame_rate,
            tracks,
            affected_bones,
        };

        log::debug!(
            "Built animation '{}' for skeleton '{}': {:.1} frames, {} track(s), {} bone(s)",
            def.name,
            skeleton.name(),
            def.num_frames,
            def.tracks.len(),
            def.affected_bones.len()
        );
        def
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn num_frames(&self) -> f32 {
        self.num_frames
    }

    #[inline]
    #[must_use]
    pub fn original_frame_rate(&self) -> f32 {
        self.original_frame_rate
    }

    /// Tracks sorted by block index (shallow levels first).
    #[inline]
    #[must_use]
    pub fn tracks(&self) -> &[SkeletonTrack] {
        &self.tracks
    }

    #[inline]
    #[must_use]
    pub fn affects_bone(&self, bone: usize) -> bool {
        self.affected_bones.contains(&bone)
    }

    /// Indices of every bone this clip animates.
    pub fn affected_bones(&self) -> impl Iterator<Item = usize> + '_ {
        self.affected_bones.iter().copied()
    }
}

/// Lanes of the block that hold the bone at `offset` within its level.
fn lanes_of(
    offset: usize,
    level_bones: usize,
    replicated: bool,
) -> impl Iterator<Item = usize> {
    let (first, step) = if replicated {
        (offset, level_bones)
    } else {
        (offset % ARRAY_PACKED_REALS, ARRAY_PACKED_REALS)
    };
    (first..ARRAY_PACKED_REALS).step_by(step.max(1))
}

/// Bone value at `frame`: the explicit sample when one exists, otherwise an
/// unnormalized interpolation between the neighbouring samples.
fn sample_source(keys: &[(f32, SourceKeyFrame)], frame: f32, epsilon: f32) -> BoneTransform {
    let to_transform = |k: &SourceKeyFrame| BoneTransform::new(k.translate, k.rotation, k.scale);

    let next = keys.partition_point(|(f, _)| *f < frame - epsilon);
    if let Some((f, k)) = keys.get(next) {
        if (*f - frame).abs() <= epsilon {
            return to_transform(k);
        }
    }
    if next == 0 {
        return to_transform(&keys[0].1);
    }
    if next >= keys.len() {
        return to_transform(&keys[keys.len() - 1].1);
    }

    let (f0, k0) = &keys[next - 1];
    let (f1, k1) = &keys[next];
    let t = (frame - f0) / (f1 - f0);

    let a = Vec4::from(k0.rotation);
    let mut b = Vec4::from(k1.rotation);
    if a.dot(b) < 0.0 {
        b = -b;
    }

    BoneTransform::new(
        k0.translate.lerp(k1.translate, t),
        Quat::from_vec4(a.lerp(b, t)),
        k0.scale.lerp(k1.scale, t),
    )
}
