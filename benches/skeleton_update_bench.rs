use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use glam::{Quat, Vec3};
use sinew::{
    BoneArena, SkeletonDef, SkeletonInstance, SourceAnimation, SourceBone, SourceKeyFrame,
    SourceSkeleton, SourceTrack,
};

/// Humanoid-sized hierarchy: a spine of `depth` bones, each with three
/// children, every bone keyed at 30 fps for one second.
fn build_source(depth: usize) -> SourceSkeleton {
    let mut source = SourceSkeleton::new();
    let mut parent = source.add_bone(SourceBone::new("spine_0", None));
    for d in 1..depth {
        for side in 0..3 {
            source.add_bone(
                SourceBone::new(format!("limb_{d}_{side}"), Some(parent))
                    .with_transform(Vec3::new(side as f32, 0.1, 0.0), Quat::IDENTITY, Vec3::ONE),
            );
        }
        parent = source.add_bone(
            SourceBone::new(format!("spine_{d}"), Some(parent))
                .with_transform(Vec3::Y, Quat::IDENTITY, Vec3::ONE),
        );
    }

    let mut clip = SourceAnimation::new("idle", 1.0);
    for bone in 0..source.bones.len() {
        let keyframes = (0..=30)
            .map(|k| {
                let t = k as f32 / 30.0;
                SourceKeyFrame::new(
                    t,
                    Vec3::new(0.0, (t * 6.0).sin() * 0.05, 0.0),
                    Quat::from_rotation_z((t * 6.0).cos() * 0.2),
                    Vec3::ONE,
                )
            })
            .collect();
        clip = clip.with_track(SourceTrack::new(bone, keyframes));
    }
    source.add_animation(clip);
    source
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("skeleton_update");

    for instances in [1usize, 16, 128] {
        let def = Arc::new(SkeletonDef::build("bench", &build_source(16), 30.0).unwrap());
        let mut arena = BoneArena::new(def.name());
        let mut skeletons: Vec<SkeletonInstance> = (0..instances)
            .map(|_| {
                let mut s = SkeletonInstance::new(Arc::clone(&def), &mut arena);
                s.set_animation_enabled("idle", true).unwrap();
                s
            })
            .collect();

        group.throughput(Throughput::Elements((instances * def.bones().len()) as u64));
        group.bench_with_input(BenchmarkId::new("bones", instances), &instances, |b, _| {
            b.iter(|| {
                for s in &mut skeletons {
                    s.get_animation_mut("idle").unwrap().add_time(black_box(1.0 / 60.0));
                    s.update(&mut arena);
                }
            });
        });

        for s in skeletons.drain(..).rev() {
            s.release(&mut arena);
        }
    }

    group.finish();
}

fn bench_derived(c: &mut Criterion) {
    let def = Arc::new(SkeletonDef::build("bench", &build_source(16), 30.0).unwrap());
    let mut arena = BoneArena::new(def.name());
    let skeleton = SkeletonInstance::new(Arc::clone(&def), &mut arena);
    let mut palette = vec![glam::Mat4::IDENTITY; def.bones().len()];

    c.bench_function("derived_and_skinning", |b| {
        b.iter(|| {
            skeleton.update_derived_transforms(&mut arena, |_| None);
            skeleton.skinning_matrices(&arena, black_box(&mut palette));
        });
    });

    skeleton.release(&mut arena);
}

criterion_group!(benches, bench_update, bench_derived);
criterion_main!(benches);
