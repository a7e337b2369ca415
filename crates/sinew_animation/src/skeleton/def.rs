use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use glam::Affine3A;
use rustc_hash::FxHashMap;
use sinew_core::errors::{Result, SinewError};
use sinew_core::math::{ARRAY_PACKED_REALS, ArrayTransform, BoneTransform};
use sinew_core::slots::{
    self, MAX_DEPTH_LEVELS, SlotIndex, blocks_for_level, is_replicated_level,
    unused_slots_for_level,
};

use super::animation_def::SkeletonAnimationDef;
use super::bone::BoneData;
use crate::settings::SkeletonBuildSettings;
use crate::source::SourceSkeleton;

/// Per-depth-level layout information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthLevelInfo {
    /// Index of the level's first bone in [`SkeletonDef::bones_in_slot_order`].
    pub first_bone_index: usize,
    pub num_bones_in_level: usize,
}

/// Inverse bind-pose world matrices of one SIMD block.
pub type ReverseBindBlock = [Affine3A; ARRAY_PACKED_REALS];

/// Immutable, shareable layout of one skeleton type.
///
/// Bones are grouped by depth level and each level starts on a block
/// boundary. Levels with at most `W / 2` bones fill their single block by
/// circular replication, which lets several instances share that block;
/// larger levels are padded with unused lanes up to the next block boundary.
#[derive(Debug)]
pub struct SkeletonDef {
    name: String,
    frame_rate: f32,
    bones: Vec<BoneData>,
    bone_index_by_name: FxHashMap<String, usize>,
    depth_levels: Vec<DepthLevelInfo>,
    bones_in_slot_order: Vec<usize>,
    bone_to_slot: Vec<SlotIndex>,
    level_block_start: Vec<usize>,
    bind_pose: Vec<ArrayTransform>,
    reverse_bind_pose: Vec<ReverseBindBlock>,
    animation_defs: Vec<SkeletonAnimationDef>,
    animation_index_by_name: FxHashMap<String, usize>,
}

impl SkeletonDef {
    /// Builds the layout of `source` and packs all of its clips, sampling
    /// keyframe times at `frame_rate`.
    pub fn build(name: impl Into<String>, source: &SourceSkeleton, frame_rate: f32) -> Result<Self> {
        let settings = SkeletonBuildSettings::default().with_frame_rate(frame_rate);
        Self::build_with_settings(name, source, &settings)
    }

    pub fn build_with_settings(
        name: impl Into<String>,
        source: &SourceSkeleton,
        settings: &SkeletonBuildSettings,
    ) -> Result<Self> {
        let name = name.into();
        if !settings.frame_rate.is_finite() || settings.frame_rate <= 0.0 {
            return Err(SinewError::InvalidFrameRate(settings.frame_rate));
        }

        // 1. Clone the hierarchy and compute depths.
        let bones: Vec<BoneData> = source
            .bones
            .iter()
            .enumerate()
            .map(|(index, b)| BoneData {
                index,
                parent: b.parent,
                name: b.name.clone(),
                position: b.position,
                orientation: b.orientation,
                scale: b.scale,
                inherit_orientation: b.inherit_orientation,
                inherit_scale: b.inherit_scale,
            })
            .collect();
        let depths = compute_depths(&bones)?;

        // 2. Group bone indices per depth level, in bone order.
        let num_levels = depths.iter().map(|d| d + 1).max().unwrap_or(0);
        if num_levels > MAX_DEPTH_LEVELS {
            return Err(SinewError::InvalidHierarchy(format!(
                "{num_levels} depth levels exceed the limit of {MAX_DEPTH_LEVELS}"
            )));
        }
        let mut levels: Vec<Vec<usize>> = vec![Vec::new(); num_levels];
        for (bone, &depth) in depths.iter().enumerate() {
            levels[depth].push(bone);
        }

        // 3-4. Slot indices and the maps between bones and slots.
        let mut bone_to_slot = vec![SlotIndex(0); bones.len()];
        let mut bones_in_slot_order = Vec::with_capacity(bones.len());
        let mut depth_levels = Vec::with_capacity(num_levels);
        let mut level_block_start = Vec::with_capacity(num_levels);
        let mut num_blocks = 0;
        for (depth, level) in levels.iter().enumerate() {
            depth_levels.push(DepthLevelInfo {
                first_bone_index: bones_in_slot_order.len(),
                num_bones_in_level: level.len(),
            });
            level_block_start.push(num_blocks);
            num_blocks += blocks_for_level(level.len());
            for (offset, &bone) in level.iter().enumerate() {
                bone_to_slot[bone] = SlotIndex::new(depth, offset);
                bones_in_slot_order.push(bone);
            }
        }

        // 5. Derived (world) bind transforms, parents before children.
        let scratch = Bump::new();
        let mut derived = BumpVec::with_capacity_in(bones.len(), &scratch);
        derived.resize(bones.len(), BoneTransform::IDENTITY);
        for level in &levels {
            for &bone in level {
                let data = &bones[bone];
                let local = data.bind_transform();
                derived[bone] = match data.parent {
                    Some(parent) => combine_derived(
                        &derived[parent],
                        &local,
                        data.inherit_orientation,
                        data.inherit_scale,
                    ),
                    None => local,
                };
            }
        }

        // 6-7. Bind pose blocks (replicate or pad) and their inverses.
        let mut bind_pose = vec![ArrayTransform::IDENTITY; num_blocks];
        let mut reverse_bind_pose = vec![[Affine3A::IDENTITY; ARRAY_PACKED_REALS]; num_blocks];
        for (depth, level) in levels.iter().enumerate() {
            let first_block = level_block_start[depth];
            let n = level.len();
            if is_replicated_level(n) {
                for lane in 0..ARRAY_PACKED_REALS {
                    let bone = level[lane % n];
                    bind_pose[first_block].set_lane(lane, &bones[bone].bind_transform());
                    reverse_bind_pose[first_block][lane] = derived[bone].to_affine().inverse();
                }
            } else {
                for (offset, &bone) in level.iter().enumerate() {
                    let block = first_block + offset / ARRAY_PACKED_REALS;
                    let lane = offset % ARRAY_PACKED_REALS;
                    bind_pose[block].set_lane(lane, &bones[bone].bind_transform());
                    reverse_bind_pose[block][lane] = derived[bone].to_affine().inverse();
                }
            }
        }
        drop(derived);

        let bone_index_by_name = bones
            .iter()
            .map(|b| (b.name.clone(), b.index))
            .collect::<FxHashMap<_, _>>();

        let mut def = Self {
            name,
            frame_rate: settings.frame_rate,
            bones,
            bone_index_by_name,
            depth_levels,
            bones_in_slot_order,
            bone_to_slot,
            level_block_start,
            bind_pose,
            reverse_bind_pose,
            animation_defs: Vec::new(),
            animation_index_by_name: FxHashMap::default(),
        };

        // 8. Pack every clip against the finished layout.
        let animation_defs: Vec<SkeletonAnimationDef> = source
            .animations
            .iter()
            .map(|a| SkeletonAnimationDef::build(&def, a, settings))
            .collect();
        def.animation_index_by_name = animation_defs
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name().to_string(), i))
            .collect();
        def.animation_defs = animation_defs;

        log::debug!(
            "Built skeleton '{}': {} bone(s), {} depth level(s), {} block(s), {} unused lane(s), {} animation(s)",
            def.name,
            def.bones.len(),
            def.depth_levels.len(),
            def.bind_pose.len(),
            def.depth_levels
                .iter()
                .map(|l| unused_slots_for_level(l.num_bones_in_level))
                .sum::<usize>(),
            def.animation_defs.len()
        );

        Ok(def)
    }

    // ========================================================================
    // Slot / block math
    // ========================================================================

    #[inline]
    #[must_use]
    pub const fn slot_to_block_idx(slot_idx: u32) -> u32 {
        slots::slot_to_block_idx(slot_idx)
    }

    #[inline]
    #[must_use]
    pub const fn block_idx_to_slot_start(block_idx: u32) -> u32 {
        slots::block_idx_to_slot_start(block_idx)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame rate the clips were packed at.
    #[inline]
    #[must_use]
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[BoneData] {
        &self.bones
    }

    pub fn bone_index(&self, name: &str) -> Result<usize> {
        self.bone_index_by_name
            .get(name)
            .copied()
            .ok_or_else(|| SinewError::BoneNotFound(name.to_string()))
    }

    #[inline]
    #[must_use]
    pub fn depth_levels(&self) -> &[DepthLevelInfo] {
        &self.depth_levels
    }

    /// Bone indices grouped by depth level, shallowest first.
    #[inline]
    #[must_use]
    pub fn bones_in_slot_order(&self) -> &[usize] {
        &self.bones_in_slot_order
    }

    #[inline]
    #[must_use]
    pub fn slot_of_bone(&self, bone: usize) -> SlotIndex {
        self.bone_to_slot[bone]
    }

    /// Bone stored at `slot`, or `None` for replicated and padding lanes.
    #[must_use]
    pub fn bone_at_slot(&self, slot: SlotIndex) -> Option<usize> {
        let level = self.depth_levels.get(slot.depth())?;
        (slot.offset() < level.num_bones_in_level)
            .then(|| self.bones_in_slot_order[level.first_bone_index + slot.offset()])
    }

    /// First block of every depth level.
    #[inline]
    #[must_use]
    pub fn level_block_start(&self) -> &[usize] {
        &self.level_block_start
    }

    /// Total SIMD blocks of one instance of this skeleton.
    #[inline]
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.bind_pose.len()
    }

    /// Local bind transforms, one block per entry.
    #[inline]
    #[must_use]
    pub fn bind_pose(&self) -> &[ArrayTransform] {
        &self.bind_pose
    }

    /// Inverse bind-pose world matrices, one block per entry.
    #[inline]
    #[must_use]
    pub fn reverse_bind_pose(&self) -> &[ReverseBindBlock] {
        &self.reverse_bind_pose
    }

    /// Inverse bind-pose world matrix of a single bone.
    #[must_use]
    pub fn reverse_bind_pose_of(&self, bone: usize) -> Affine3A {
        let slot = self.bone_to_slot[bone];
        let block = self.level_block_start[slot.depth()] + slot.offset() / ARRAY_PACKED_REALS;
        self.reverse_bind_pose[block][slot.lane()]
    }

    #[inline]
    #[must_use]
    pub fn animation_defs(&self) -> &[SkeletonAnimationDef] {
        &self.animation_defs
    }

    pub fn animation_def(&self, name: &str) -> Result<&SkeletonAnimationDef> {
        self.animation_index_by_name
            .get(name)
            .map(|&i| &self.animation_defs[i])
            .ok_or_else(|| SinewError::AnimationNotFound(name.to_string()))
    }

    /// Whether `other` has the same hierarchy, so its clips can drive
    /// instances of this skeleton.
    #[must_use]
    pub fn is_layout_compatible(&self, other: &SkeletonDef) -> bool {
        self.depth_levels == other.depth_levels
            && self.bones.len() == other.bones.len()
            && self
                .bones
                .iter()
                .zip(&other.bones)
                .all(|(a, b)| a.parent == b.parent)
    }
}

/// Depth of every bone, rejecting bad parents and cycles.
fn compute_depths(bones: &[BoneData]) -> Result<Vec<usize>> {
    let mut depths = Vec::with_capacity(bones.len());
    for bone in bones {
        let mut depth = 0;
        let mut current = bone.parent;
        while let Some(parent) = current {
            if parent >= bones.len() {
                return Err(SinewError::InvalidHierarchy(format!(
                    "bone '{}' has parent index {parent} out of range",
                    bone.name
                )));
            }
            depth += 1;
            if depth > bones.len() {
                return Err(SinewError::InvalidHierarchy(format!(
                    "bone '{}' is part of a parent cycle",
                    bone.name
                )));
            }
            current = bones[parent].parent;
        }
        depths.push(depth);
    }
    debug_assert!(
        bones
            .iter()
            .zip(&depths)
            .all(|(b, &d)| b.parent.is_none_or(|p| depths[p] + 1 == d)),
        "disconnected bone hierarchy"
    );
    Ok(depths)
}

/// World transform of a child from its parent's world transform.
pub(crate) fn combine_derived(
    parent: &BoneTransform,
    local: &BoneTransform,
    inherit_orientation: bool,
    inherit_scale: bool,
) -> BoneTransform {
    let orientation = if inherit_orientation {
        parent.orientation * local.orientation
    } else {
        local.orientation
    };
    let scale = if inherit_scale {
        parent.scale * local.scale
    } else {
        local.scale
    };
    let position = parent.orientation * (parent.scale * local.position) + parent.position;
    BoneTransform::new(position, orientation, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceBone;
    use glam::Vec3;

    #[test]
    fn rejects_parent_cycles() {
        let mut source = SourceSkeleton::new();
        source.add_bone(SourceBone::new("a", Some(1)));
        source.add_bone(SourceBone::new("b", Some(0)));
        let err = SkeletonDef::build("cycle", &source, 30.0).unwrap_err();
        assert!(matches!(err, SinewError::InvalidHierarchy(_)));
    }

    #[test]
    fn rejects_out_of_range_parent() {
        let mut source = SourceSkeleton::new();
        source.add_bone(SourceBone::new("a", Some(7)));
        assert!(SkeletonDef::build("bad", &source, 30.0).is_err());
    }

    #[test]
    fn rejects_bad_frame_rate() {
        let source = SourceSkeleton::new();
        assert_eq!(
            SkeletonDef::build("s", &source, 0.0).unwrap_err(),
            SinewError::InvalidFrameRate(0.0)
        );
    }

    #[test]
    fn derived_respects_inheritance_flags() {
        let parent = BoneTransform::new(
            Vec3::new(1.0, 0.0, 0.0),
            glam::Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::splat(2.0),
        );
        let local = BoneTransform::new(Vec3::X, glam::Quat::IDENTITY, Vec3::ONE);

        let inherited = combine_derived(&parent, &local, true, true);
        assert!((inherited.position - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
        assert_eq!(inherited.scale, Vec3::splat(2.0));

        let detached = combine_derived(&parent, &local, false, false);
        assert_eq!(detached.orientation, glam::Quat::IDENTITY);
        assert_eq!(detached.scale, Vec3::ONE);
        assert!((detached.position - inherited.position).length() < 1e-5);
    }
}
