//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};
use sinew::{SourceAnimation, SourceBone, SourceKeyFrame, SourceSkeleton, SourceTrack};

pub const EPSILON: f32 = 1e-5;

/// Frame rate that turns a one second clip into exactly ten frames.
pub const FRAME_RATE: f32 = 10.0;

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

pub fn approx_quat(a: Quat, b: Quat) -> bool {
    // q and -q describe the same rotation.
    a.dot(b).abs() > 1.0 - EPSILON
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bone layout of [`biped_source`]:
///
/// ```text
/// depth 0: root                                   (1 bone,  replicated)
/// depth 1: hip_l hip_r                            (2 bones, replicated)
/// depth 2: knee_l knee_r tail                     (3 bones, 1 unused)
/// depth 3: toe_l0 toe_l1 toe_r0 toe_r1 tail_tip   (5 bones, 3 unused)
/// ```
pub fn biped_bones() -> SourceSkeleton {
    let mut source = SourceSkeleton::new();
    let root = source.add_bone(
        SourceBone::new("root", None).with_transform(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY, Vec3::ONE),
    );
    let hip_l = source.add_bone(
        SourceBone::new("hip_l", Some(root)).with_transform(Vec3::new(0.2, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE),
    );
    let hip_r = source.add_bone(
        SourceBone::new("hip_r", Some(root)).with_transform(Vec3::new(-0.2, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE),
    );
    let knee_l = source.add_bone(
        SourceBone::new("knee_l", Some(hip_l)).with_transform(Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, Vec3::ONE),
    );
    let knee_r = source.add_bone(
        SourceBone::new("knee_r", Some(hip_r)).with_transform(Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, Vec3::ONE),
    );
    let tail = source.add_bone(
        SourceBone::new("tail", Some(hip_l)).with_transform(
            Vec3::new(0.1, 0.0, -0.3),
            Quat::from_rotation_x(0.3),
            Vec3::ONE,
        ),
    );
    for (name, parent) in [
        ("toe_l0", knee_l),
        ("toe_l1", knee_l),
        ("toe_r0", knee_r),
        ("toe_r1", knee_r),
        ("tail_tip", tail),
    ] {
        source.add_bone(
            SourceBone::new(name, Some(parent)).with_transform(Vec3::new(0.0, -0.5, 0.1), Quat::IDENTITY, Vec3::ONE),
        );
    }
    source
}

/// Index of a bone of [`biped_bones`] by name.
pub fn bone_index(source: &SourceSkeleton, name: &str) -> usize {
    source.bones.iter().position(|b| b.name == name).unwrap()
}

/// `walk`: root sways one unit along +X at mid-clip, both knees bend a
/// quarter turn around X.
pub fn walk(source: &SourceSkeleton) -> SourceAnimation {
    let root = bone_index(source, "root");
    let knee_l = bone_index(source, "knee_l");
    let knee_r = bone_index(source, "knee_r");

    let bend = |bone| {
        SourceTrack::new(
            bone,
            vec![
                SourceKeyFrame::identity(0.0),
                SourceKeyFrame::new(1.0, Vec3::ZERO, Quat::from_rotation_x(FRAC_PI_2), Vec3::ONE),
            ],
        )
    };

    SourceAnimation::new("walk", 1.0)
        .with_track(SourceTrack::new(
            root,
            vec![
                SourceKeyFrame::identity(0.0),
                SourceKeyFrame::new(0.5, Vec3::X, Quat::IDENTITY, Vec3::ONE),
                SourceKeyFrame::identity(1.0),
            ],
        ))
        .with_track(bend(knee_l))
        .with_track(bend(knee_r))
}

/// Constant scale of `factor` on `bone`.
pub fn grow(name: &str, source: &SourceSkeleton, bone: &str, factor: f32) -> SourceAnimation {
    let bone = bone_index(source, bone);
    SourceAnimation::new(name, 1.0).with_track(SourceTrack::new(
        bone,
        vec![
            SourceKeyFrame::new(0.0, Vec3::ZERO, Quat::IDENTITY, Vec3::splat(factor)),
            SourceKeyFrame::new(1.0, Vec3::ZERO, Quat::IDENTITY, Vec3::splat(factor)),
        ],
    ))
}

/// [`biped_bones`] with the `walk`, `grow_a` and `grow_b` clips.
pub fn biped_source() -> SourceSkeleton {
    let mut source = biped_bones();
    let walk = walk(&source);
    let grow_a = grow("grow_a", &source, "knee_r", 3.0);
    let grow_b = grow("grow_b", &source, "knee_r", 3.0);
    source.add_animation(walk);
    source.add_animation(grow_a);
    source.add_animation(grow_b);
    source
}

/// One root with `children` direct children and no clips.
pub fn fan_source(children: usize) -> SourceSkeleton {
    let mut source = SourceSkeleton::new();
    let root = source.add_bone(SourceBone::new("root", None));
    for i in 0..children {
        source.add_bone(
            SourceBone::new(format!("child_{i}"), Some(root)).with_transform(
                Vec3::new(i as f32, 0.0, 0.0),
                Quat::IDENTITY,
                Vec3::ONE,
            ),
        );
    }
    source
}
