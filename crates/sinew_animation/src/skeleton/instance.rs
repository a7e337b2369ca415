use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Affine3A, Mat4, Vec4};
use sinew_core::errors::{Result, SinewError};
use sinew_core::math::{ARRAY_PACKED_REALS, ArrayReal, BoneTransform};
use sinew_core::slots::{blocks_for_level, is_replicated_level, unused_slots_for_level};
use sinew_core::{BoneArena, SlotRange};
use slotmap::new_key_type;

use super::animation::SkeletonAnimation;
use super::bone::{Bone, BoneAddress};
use super::def::{SkeletonDef, combine_derived};
use crate::registry::SkeletonDefRegistry;

new_key_type! {
    /// Key of an external scene node a bone can be attached under.
    pub struct NodeKey;
}

static NEXT_INSTANCE_ID: AtomicU32 = AtomicU32::new(1);

/// One block of an instance inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InstanceBlock {
    pub(crate) depth: usize,
    pub(crate) arena_block: usize,
}

/// Arena allocations of one depth level.
#[derive(Debug, Clone, Copy)]
struct LevelAllocation {
    bones: SlotRange,
    unused: Option<SlotRange>,
}

/// Live bone hierarchy of one entity, driven by the clips of a shared
/// [`SkeletonDef`].
///
/// Bone transforms live in a [`BoneArena`] shared with every other instance
/// of the same skeleton; the arena is passed explicitly to every call that
/// touches transforms. Call [`SkeletonInstance::release`] to return the
/// slots.
#[derive(Debug)]
pub struct SkeletonInstance {
    id: u32,
    definition: Arc<SkeletonDef>,
    bones: Vec<Bone>,
    levels: Vec<LevelAllocation>,
    blocks: Vec<InstanceBlock>,
    /// First instance block of every depth level.
    level_block_start: Vec<usize>,
    /// 1.0 for lanes reset and animated by [`Self::update`], 0.0 for manual
    /// bones and lanes this instance does not own.
    manual_bones: Vec<ArrayReal>,
    addresses: Arc<[BoneAddress]>,
    animations: Vec<SkeletonAnimation>,
    active_animations: Vec<usize>,
    parent_transform: Affine3A,
    node_parents: Vec<(NodeKey, usize)>,
    released: bool,
}

impl SkeletonInstance {
    /// Allocates the bones of `definition` in `arena`, shallowest depth level
    /// first, and places them at the bind pose.
    pub fn new(definition: Arc<SkeletonDef>, arena: &mut BoneArena) -> Self {
        debug_assert_eq!(
            arena.layout(),
            definition.name(),
            "arena belongs to another skeleton layout"
        );

        let id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        let num_bones = definition.bones().len();
        let num_levels = definition.depth_levels().len();

        let mut levels = Vec::with_capacity(num_levels);
        let mut blocks = Vec::with_capacity(definition.num_blocks());
        let mut level_block_start = Vec::with_capacity(num_levels);
        let mut manual_bones = Vec::with_capacity(definition.num_blocks());
        let mut addresses = vec![
            BoneAddress {
                depth: 0,
                level_lane: 0,
                block: 0,
            };
            num_bones
        ];
        let mut arena_slots = vec![0usize; num_bones];

        for (depth, level) in definition.depth_levels().iter().enumerate() {
            let n = level.num_bones_in_level;
            let replicated = is_replicated_level(n);

            let bones = arena.allocate(
                depth,
                n,
                if replicated { n } else { ARRAY_PACKED_REALS },
            );
            let pad = unused_slots_for_level(n);
            let unused = (pad > 0).then(|| arena.allocate(depth, pad, 1));
            debug_assert!(unused.is_none_or(|u| u.start == bones.end()));

            let first_block = bones.first_block();
            let lane_start = bones.start % ARRAY_PACKED_REALS;
            let block_start = blocks.len();
            level_block_start.push(block_start);
            for k in 0..blocks_for_level(n) {
                blocks.push(InstanceBlock {
                    depth,
                    arena_block: first_block + k,
                });
                manual_bones.push(Vec4::ZERO);
            }

            let slot_order = &definition.bones_in_slot_order()
                [level.first_bone_index..level.first_bone_index + n];
            for (offset, &bone) in slot_order.iter().enumerate() {
                let level_lane = lane_start + offset;
                let address = BoneAddress {
                    depth,
                    level_lane,
                    block: block_start + level_lane / ARRAY_PACKED_REALS,
                };
                manual_bones[address.block][address.simd_lane()] = 1.0;
                addresses[bone] = address;
                arena_slots[bone] = bones.start + offset;
                arena.set_local(
                    depth,
                    bones.start + offset,
                    &definition.bones()[bone].bind_transform(),
                );
            }

            levels.push(LevelAllocation { bones, unused });
        }

        let bones = definition
            .bones()
            .iter()
            .map(|b| Bone {
                instance: id,
                index: b.index,
                parent: b.parent,
                arena_slot: arena_slots[b.index],
                address: addresses[b.index],
            })
            .collect();

        let addresses: Arc<[BoneAddress]> = addresses.into();
        let animations = (0..definition.animation_defs().len())
            .map(|i| {
                SkeletonAnimation::new(
                    Arc::clone(&definition),
                    Arc::clone(&definition),
                    i,
                    Arc::clone(&addresses),
                    &level_block_start,
                    blocks.len(),
                )
            })
            .collect();

        log::trace!(
            "SkeletonInstance {id} of '{}': {} bone(s) in {} block(s)",
            definition.name(),
            num_bones,
            blocks.len()
        );

        Self {
            id,
            definition,
            bones,
            levels,
            blocks,
            level_block_start,
            manual_bones,
            addresses,
            animations,
            active_animations: Vec::new(),
            parent_transform: Affine3A::IDENTITY,
            node_parents: Vec::new(),
            released: false,
        }
    }

    /// Returns every arena slot, deepest depth level first and each level's
    /// padding before its bones, the reverse of allocation order.
    pub fn release(mut self, arena: &mut BoneArena) {
        debug_assert_eq!(arena.layout(), self.definition.name());
        for level in self.levels.iter().rev() {
            if let Some(unused) = level.unused {
                arena.release(unused);
            }
            arena.release(level.bones);
        }
        self.released = true;
        log::trace!("SkeletonInstance {} released", self.id);
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn definition(&self) -> &Arc<SkeletonDef> {
        &self.definition
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Resets animated bones to the bind pose and blends every active
    /// animation on top, in activation order.
    ///
    /// Weights of concurrently active animations are not normalized.
    pub fn update(&mut self, arena: &mut BoneArena) {
        if self.active_animations.is_empty() {
            return;
        }
        self.reset_to_pose(arena);
        for &index in &self.active_animations {
            self.animations[index].apply(arena, &self.blocks, &self.manual_bones);
        }
    }

    /// Moves every non-manual bone back to the bind pose.
    pub fn reset_to_pose(&self, arena: &mut BoneArena) {
        debug_assert_eq!(arena.layout(), self.definition.name());
        let bind_pose = self.definition.bind_pose();
        for (i, block) in self.blocks.iter().enumerate() {
            arena
                .block_mut(block.depth, block.arena_block)
                .lerp_toward(&bind_pose[i], self.manual_bones[i]);
        }
    }

    /// Recomputes the world matrix of every bone, parents first.
    ///
    /// Root bones sit below their attached scene node when `node_world`
    /// resolves it, and below [`Self::set_parent_transform`] otherwise.
    pub fn update_derived_transforms<F>(&self, arena: &mut BoneArena, node_world: F)
    where
        F: Fn(NodeKey) -> Option<Affine3A>,
    {
        for &index in self.definition.bones_in_slot_order() {
            let bone = &self.bones[index];
            let data = &self.definition.bones()[index];
            let local = arena.local(bone.depth(), bone.arena_slot);

            let parent_world = match bone.parent {
                Some(parent) => {
                    let p = &self.bones[parent];
                    arena.derived(p.depth(), p.arena_slot)
                }
                None => self
                    .node_parents
                    .iter()
                    .find(|(_, b)| *b == index)
                    .and_then(|(node, _)| node_world(*node))
                    .unwrap_or(self.parent_transform),
            };

            // Same composition as the bind pose, so the palette is identity
            // at rest even below non-uniform scale.
            let (scale, orientation, position) = parent_world.to_scale_rotation_translation();
            let world = combine_derived(
                &BoneTransform::new(position, orientation, scale),
                &local,
                data.inherit_orientation,
                data.inherit_scale,
            );
            arena.set_derived(bone.depth(), bone.arena_slot, world.to_affine());
        }
    }

    /// Writes `derived * reverse_bind_pose` for every bone into `out`,
    /// indexed by bone index.
    pub fn skinning_matrices(&self, arena: &BoneArena, out: &mut [Mat4]) {
        debug_assert!(out.len() >= self.bones.len());
        for (bone, slot) in self.bones.iter().zip(out.iter_mut()) {
            let derived = arena.derived(bone.depth(), bone.arena_slot);
            *slot = Mat4::from(derived * self.definition.reverse_bind_pose_of(bone.index));
        }
    }

    // ========================================================================
    // Bones
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, index: usize) -> Option<Bone> {
        self.bones.get(index).copied()
    }

    pub fn get_bone(&self, name: &str) -> Result<Bone> {
        let index = self.definition.bone_index(name)?;
        Ok(self.bones[index])
    }

    #[must_use]
    pub fn bone_transform(&self, bone: Bone, arena: &BoneArena) -> BoneTransform {
        debug_assert_eq!(bone.instance, self.id, "bone belongs to another instance");
        arena.local(bone.depth(), bone.arena_slot)
    }

    /// Overwrites a bone's local transform. Unless the bone is manual, the
    /// next [`Self::update`] with an active animation resets it.
    pub fn set_bone_transform(&self, bone: Bone, arena: &mut BoneArena, transform: &BoneTransform) {
        debug_assert_eq!(bone.instance, self.id, "bone belongs to another instance");
        arena.set_local(bone.depth(), bone.arena_slot, transform);
    }

    #[must_use]
    pub fn bone_derived_transform(&self, bone: Bone, arena: &BoneArena) -> Affine3A {
        debug_assert_eq!(bone.instance, self.id, "bone belongs to another instance");
        arena.derived(bone.depth(), bone.arena_slot)
    }

    /// Excludes a bone from reset and animation (`true`) or hands it back to
    /// the animation system (`false`). Manual bones keep whatever
    /// [`Self::set_bone_transform`] wrote last.
    pub fn set_manual_bone(&mut self, bone: Bone, is_manual: bool) {
        debug_assert_eq!(bone.instance, self.id, "bone belongs to another instance");
        let address = bone.address;
        self.manual_bones[address.block][address.simd_lane()] = if is_manual { 0.0 } else { 1.0 };
    }

    #[must_use]
    pub fn is_manual_bone(&self, bone: Bone) -> bool {
        debug_assert_eq!(bone.instance, self.id, "bone belongs to another instance");
        let address = bone.address;
        self.manual_bones[address.block][address.simd_lane()] == 0.0
    }

    /// Transform above every root bone without an attached scene node.
    pub fn set_parent_transform(&mut self, transform: Affine3A) {
        self.parent_transform = transform;
    }

    #[inline]
    #[must_use]
    pub fn parent_transform(&self) -> Affine3A {
        self.parent_transform
    }

    /// Places root bone `bone` below the scene node `node`; `None` detaches
    /// it again.
    pub fn set_scene_node_as_parent_of_bone(&mut self, bone: Bone, node: Option<NodeKey>) {
        debug_assert_eq!(bone.instance, self.id, "bone belongs to another instance");
        debug_assert!(bone.parent.is_none(), "only root bones can have a scene node parent");
        self.node_parents.retain(|(_, b)| *b != bone.index);
        if let Some(node) = node {
            self.node_parents.push((node, bone.index));
        }
    }

    /// Scene node attached above each root bone, as `(node, bone index)`.
    #[inline]
    #[must_use]
    pub fn bone_attachments(&self) -> &[(NodeKey, usize)] {
        &self.node_parents
    }

    /// Manual-bone mask, one entry per instance block.
    #[inline]
    #[must_use]
    pub fn manual_bone_mask(&self) -> &[ArrayReal] {
        &self.manual_bones
    }

    /// Padding bones allocated to close partially filled blocks.
    #[must_use]
    pub fn num_unused_bones(&self) -> usize {
        self.levels
            .iter()
            .filter_map(|l| l.unused)
            .map(|u| u.count)
            .sum()
    }

    /// Padding bones of one depth level.
    #[must_use]
    pub fn num_unused_bones_in_level(&self, depth: usize) -> usize {
        self.levels
            .get(depth)
            .and_then(|l| l.unused)
            .map_or(0, |u| u.count)
    }

    /// Instance blocks per depth level, starting at the level's first block.
    #[inline]
    #[must_use]
    pub fn level_block_start(&self) -> &[usize] {
        &self.level_block_start
    }

    // ========================================================================
    // Animations
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn animations(&self) -> &[SkeletonAnimation] {
        &self.animations
    }

    /// Enabled animations in activation order.
    pub fn active_animations(&self) -> impl Iterator<Item = &SkeletonAnimation> {
        self.active_animations.iter().map(|&i| &self.animations[i])
    }

    #[must_use]
    pub fn has_animation(&self, name: &str) -> bool {
        self.animation_index(name).is_ok()
    }

    pub fn get_animation(&self, name: &str) -> Result<&SkeletonAnimation> {
        let index = self.animation_index(name)?;
        Ok(&self.animations[index])
    }

    pub fn get_animation_mut(&mut self, name: &str) -> Result<&mut SkeletonAnimation> {
        let index = self.animation_index(name)?;
        Ok(&mut self.animations[index])
    }

    /// Adds the animation to the end of the active list, or removes it with
    /// an unordered swap-remove.
    pub fn set_animation_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let index = self.animation_index(name)?;
        let animation = &mut self.animations[index];
        if animation.enabled == enabled {
            return Ok(());
        }
        animation.enabled = enabled;

        if enabled {
            self.active_animations.push(index);
        } else if let Some(pos) = self.active_animations.iter().position(|&i| i == index) {
            self.active_animations.swap_remove(pos);
        }
        Ok(())
    }

    /// Adds every clip of the skeleton registered as `name` in `group`.
    ///
    /// The source skeleton must share this skeleton's hierarchy. Clips whose
    /// name is already present are skipped. Existing animations keep their
    /// state, including per-bone weights and the active list.
    pub fn add_animations_from_skeleton(
        &mut self,
        name: &str,
        group: &str,
        registry: &SkeletonDefRegistry,
    ) -> Result<()> {
        let other = registry.get(name, group)?;
        if !self.definition.is_layout_compatible(&other) {
            return Err(SinewError::IncompatibleSkeleton {
                expected: self.definition.name().to_string(),
                found: other.name().to_string(),
            });
        }

        let addresses = Arc::clone(&self.addresses);
        self.animations.reserve(other.animation_defs().len());
        for (i, clip) in other.animation_defs().iter().enumerate() {
            if self.has_animation(clip.name()) {
                log::warn!(
                    "Skeleton '{}' already has animation '{}'; the copy from '{}' is skipped",
                    self.definition.name(),
                    clip.name(),
                    other.name()
                );
                continue;
            }
            self.animations.push(SkeletonAnimation::new(
                Arc::clone(&other),
                Arc::clone(&self.definition),
                i,
                Arc::clone(&addresses),
                &self.level_block_start,
                self.blocks.len(),
            ));
        }
        Ok(())
    }

    fn animation_index(&self, name: &str) -> Result<usize> {
        self.animations
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| SinewError::AnimationNotFound(name.to_string()))
    }
}

impl Drop for SkeletonInstance {
    fn drop(&mut self) {
        if !self.released && !std::thread::panicking() {
            log::warn!(
                "SkeletonInstance {} of '{}' dropped without release; its arena slots stay reserved",
                self.id,
                self.definition.name()
            );
            debug_assert!(
                self.released,
                "SkeletonInstance {} dropped without SkeletonInstance::release",
                self.id
            );
        }
    }
}
