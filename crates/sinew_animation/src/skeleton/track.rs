use glam::Vec4;
use sinew_core::math::{ArrayQuaternion, ArrayReal, ArrayTransform, ArrayVector3, KfTransform};
use sinew_core::slots::BlockIndex;

const MAX_SCAN_OFFSET: usize = 3;

/// Last keyframe a track was sampled at. Playback usually moves forward by
/// less than a keyframe per update, so the next lookup starts here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

/// Packed keyframes for one SIMD block of bones.
///
/// Every keyframe holds a full [`KfTransform`], so all lanes of the block are
/// interpolated together. Lanes with no animated bone keep identity deltas.
#[derive(Debug, Clone)]
pub struct SkeletonTrack {
    block: BlockIndex,
    used_lanes: u8,
    frames: Vec<f32>,
    inv_next_frame_distance: Vec<f32>,
    keyframes: Vec<KfTransform>,
}

impl SkeletonTrack {
    pub(crate) fn new(
        block: BlockIndex,
        used_lanes: u8,
        frames: Vec<f32>,
        keyframes: Vec<KfTransform>,
    ) -> Self {
        debug_assert_eq!(frames.len(), keyframes.len());
        debug_assert!(!frames.is_empty());

        let inv_next_frame_distance = frames
            .iter()
            .enumerate()
            .map(|(i, &f)| match frames.get(i + 1) {
                Some(&next) if next - f > f32::EPSILON => 1.0 / (next - f),
                _ => 0.0,
            })
            .collect();

        Self {
            block,
            used_lanes,
            frames,
            inv_next_frame_distance,
            keyframes,
        }
    }

    /// Block of the skeleton layout this track animates.
    #[inline]
    #[must_use]
    pub fn block(&self) -> BlockIndex {
        self.block
    }

    /// Bit `i` is set when lane `i` carries an animated bone.
    #[inline]
    #[must_use]
    pub fn used_lanes(&self) -> u8 {
        self.used_lanes
    }

    /// Keyframe positions in frames, ascending.
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[f32] {
        &self.frames
    }

    #[inline]
    #[must_use]
    pub fn keyframes(&self) -> &[KfTransform] {
        &self.keyframes
    }

    /// Index of the keyframe at or before `frame`, updating the cursor.
    pub fn find_keyframe(&self, frame: f32, cursor: &mut KeyframeCursor) -> usize {
        let len = self.frames.len();
        if len == 1 {
            cursor.last_index = 0;
            return 0;
        }

        let i = cursor.last_index.min(len - 1);
        let f_curr = self.frames[i];

        let found = if frame >= f_curr {
            // Forward playback: the answer is usually i or a few keys later.
            let mut res = None;
            for offset in 0..=MAX_SCAN_OFFSET {
                let idx = i + offset;
                if idx >= len - 1 {
                    res = Some(len - 1);
                    break;
                }
                if frame < self.frames[idx + 1] {
                    res = Some(idx);
                    break;
                }
            }
            res
        } else {
            let mut res = None;
            for offset in 1..=MAX_SCAN_OFFSET {
                if i < offset {
                    break;
                }
                let idx = i - offset;
                if frame >= self.frames[idx] {
                    res = Some(idx);
                    break;
                }
            }
            res
        };

        let idx = found.unwrap_or_else(|| {
            // Large jump (scrubbing or loop wrap): binary search.
            self.frames
                .partition_point(|&f| f <= frame)
                .saturating_sub(1)
        });
        cursor.last_index = idx;
        idx
    }

    /// Interpolated keyframe block at `frame`. Clamps outside the keyed range.
    pub fn sample(&self, frame: f32, cursor: &mut KeyframeCursor) -> KfTransform {
        let idx = self.find_keyframe(frame, cursor);
        let prev = &self.keyframes[idx];
        let Some(next) = self.keyframes.get(idx + 1) else {
            return *prev;
        };

        let t = ((frame - self.frames[idx]) * self.inv_next_frame_distance[idx]).clamp(0.0, 1.0);
        let t = Vec4::splat(t);
        ArrayTransform {
            position: ArrayVector3::lerp(&prev.position, &next.position, t),
            orientation: ArrayQuaternion::nlerp_shortest(t, &prev.orientation, &next.orientation),
            scale: ArrayVector3::lerp(&prev.scale, &next.scale, t),
        }
    }

    /// Samples at `frame` and blends the result into `dest` with per-lane
    /// weights.
    #[inline]
    pub fn apply_keyframe_at(
        &self,
        cursor: &mut KeyframeCursor,
        frame: f32,
        weights: ArrayReal,
        dest: &mut ArrayTransform,
    ) {
        let sampled = self.sample(frame, cursor);
        dest.blend_delta(&sampled, weights);
    }
}
