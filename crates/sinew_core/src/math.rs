//! SIMD Lane Math
//!
//! Structure-of-arrays types that hold [`ARRAY_PACKED_REALS`] bone transforms
//! side by side, so a whole block of sibling bones can be reset, sampled and
//! blended with one vector operation per component.
//!
//! ```text
//! BoneTransform (AoS, one bone)      ArrayTransform (SoA, one block)
//! ┌──────────────────────┐           ┌──────────────────────────────┐
//! │ position: Vec3       │           │ position.x: [b0 b1 b2 b3]    │
//! │ orientation: Quat    │    ──►    │ position.y: [b0 b1 b2 b3]    │
//! │ scale: Vec3          │           │ ...                          │
//! └──────────────────────┘           └──────────────────────────────┘
//! ```
//!
//! Every lane-wise operation here maps onto `glam::Vec4`, which is backed by
//! SSE2 / NEON / wasm simd128 registers where available.

use std::ops::{Add, AddAssign, Mul, MulAssign};

use glam::{Affine3A, Quat, Vec3, Vec4};

/// Number of scalar lanes processed together (the SIMD width `W`).
pub const ARRAY_PACKED_REALS: usize = 4;

/// One SIMD register worth of reals.
pub type ArrayReal = Vec4;

/// Lane-wise linear interpolation `a * (1 - t) + b * t`.
///
/// Written so that `t == 0` returns `a` and `t == 1` returns `b` exactly for
/// finite inputs, which the manual-bone mask relies on.
#[inline]
#[must_use]
pub fn lerp_lanes(a: ArrayReal, b: ArrayReal, t: ArrayReal) -> ArrayReal {
    a * (Vec4::ONE - t) + b * t
}

#[inline]
fn rsqrt_lanes(v: ArrayReal) -> ArrayReal {
    Vec4::from_array(v.to_array().map(|x| if x > 0.0 { 1.0 / x.sqrt() } else { 0.0 }))
}

// ============================================================================
// ArrayVector3
// ============================================================================

/// Four `Vec3`s in SoA layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayVector3 {
    pub x: ArrayReal,
    pub y: ArrayReal,
    pub z: ArrayReal,
}

impl ArrayVector3 {
    pub const ZERO: Self = Self::splat(Vec3::ZERO);
    pub const UNIT_SCALE: Self = Self::splat(Vec3::ONE);

    #[inline]
    #[must_use]
    pub const fn splat(v: Vec3) -> Self {
        Self {
            x: Vec4::splat(v.x),
            y: Vec4::splat(v.y),
            z: Vec4::splat(v.z),
        }
    }

    #[inline]
    #[must_use]
    pub fn lane(&self, lane: usize) -> Vec3 {
        Vec3::new(self.x[lane], self.y[lane], self.z[lane])
    }

    #[inline]
    pub fn set_lane(&mut self, lane: usize, v: Vec3) {
        self.x[lane] = v.x;
        self.y[lane] = v.y;
        self.z[lane] = v.z;
    }

    /// Lane-wise `a * (1 - t) + b * t`.
    #[inline]
    #[must_use]
    pub fn lerp(a: &Self, b: &Self, t: ArrayReal) -> Self {
        Self {
            x: lerp_lanes(a.x, b.x, t),
            y: lerp_lanes(a.y, b.y, t),
            z: lerp_lanes(a.z, b.z, t),
        }
    }

    /// Lanes where `t == at` come from `when_eq`, the others from `otherwise`.
    #[inline]
    fn pick(t: ArrayReal, at: f32, when_eq: &Self, otherwise: &Self) -> Self {
        let m = t.cmpeq(Vec4::splat(at));
        Self {
            x: Vec4::select(m, when_eq.x, otherwise.x),
            y: Vec4::select(m, when_eq.y, otherwise.y),
            z: Vec4::select(m, when_eq.z, otherwise.z),
        }
    }
}

impl Add for ArrayVector3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for ArrayVector3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Component-wise product.
impl Mul for ArrayVector3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            x: self.x * rhs.x,
            y: self.y * rhs.y,
            z: self.z * rhs.z,
        }
    }
}

impl MulAssign for ArrayVector3 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

/// Scales every lane by its own real.
impl Mul<ArrayReal> for ArrayVector3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: ArrayReal) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

// ============================================================================
// ArrayQuaternion
// ============================================================================

/// Four quaternions in SoA layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayQuaternion {
    pub w: ArrayReal,
    pub x: ArrayReal,
    pub y: ArrayReal,
    pub z: ArrayReal,
}

impl ArrayQuaternion {
    pub const IDENTITY: Self = Self {
        w: Vec4::ONE,
        x: Vec4::ZERO,
        y: Vec4::ZERO,
        z: Vec4::ZERO,
    };

    #[inline]
    #[must_use]
    pub fn splat(q: Quat) -> Self {
        Self {
            w: Vec4::splat(q.w),
            x: Vec4::splat(q.x),
            y: Vec4::splat(q.y),
            z: Vec4::splat(q.z),
        }
    }

    #[inline]
    #[must_use]
    pub fn lane(&self, lane: usize) -> Quat {
        Quat::from_xyzw(self.x[lane], self.y[lane], self.z[lane], self.w[lane])
    }

    #[inline]
    pub fn set_lane(&mut self, lane: usize, q: Quat) {
        self.w[lane] = q.w;
        self.x[lane] = q.x;
        self.y[lane] = q.y;
        self.z[lane] = q.z;
    }

    #[inline]
    #[must_use]
    pub fn dot(&self, rhs: &Self) -> ArrayReal {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Lane-wise normalization. Zero-length lanes collapse to zero.
    #[inline]
    #[must_use]
    pub fn normalize(&self) -> Self {
        let inv_len = rsqrt_lanes(self.dot(self));
        Self {
            w: self.w * inv_len,
            x: self.x * inv_len,
            y: self.y * inv_len,
            z: self.z * inv_len,
        }
    }

    /// Lane-wise `a * (1 - t) + b * t` without renormalization.
    #[inline]
    #[must_use]
    pub fn lerp(a: &Self, b: &Self, t: ArrayReal) -> Self {
        Self {
            w: lerp_lanes(a.w, b.w, t),
            x: lerp_lanes(a.x, b.x, t),
            y: lerp_lanes(a.y, b.y, t),
            z: lerp_lanes(a.z, b.z, t),
        }
    }

    /// Normalized lerp taking the shortest arc per lane.
    #[inline]
    #[must_use]
    pub fn nlerp_shortest(t: ArrayReal, a: &Self, b: &Self) -> Self {
        let flip = a.dot(b).cmplt(Vec4::ZERO);
        let b = Self {
            w: Vec4::select(flip, -b.w, b.w),
            x: Vec4::select(flip, -b.x, b.x),
            y: Vec4::select(flip, -b.y, b.y),
            z: Vec4::select(flip, -b.z, b.z),
        };
        Self::lerp(a, &b, t).normalize()
    }

    #[inline]
    fn pick(t: ArrayReal, at: f32, when_eq: &Self, otherwise: &Self) -> Self {
        let m = t.cmpeq(Vec4::splat(at));
        Self {
            w: Vec4::select(m, when_eq.w, otherwise.w),
            x: Vec4::select(m, when_eq.x, otherwise.x),
            y: Vec4::select(m, when_eq.y, otherwise.y),
            z: Vec4::select(m, when_eq.z, otherwise.z),
        }
    }

    /// Normalized lerp along the direct arc per lane.
    #[inline]
    #[must_use]
    pub fn nlerp(t: ArrayReal, a: &Self, b: &Self) -> Self {
        Self::lerp(a, b, t).normalize()
    }
}

/// Lane-wise Hamilton product, same convention as `glam::Quat * Quat`.
impl Mul for ArrayQuaternion {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = self;
        let b = rhs;
        Self {
            w: a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
            x: a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            y: a.w * b.y + a.y * b.w + a.z * b.x - a.x * b.z,
            z: a.w * b.z + a.z * b.w + a.x * b.y - a.y * b.x,
        }
    }
}

impl MulAssign for ArrayQuaternion {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

// ============================================================================
// Transforms
// ============================================================================

/// Scalar position / orientation / scale of a single bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(position: Vec3, orientation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            orientation,
            scale,
        }
    }

    #[inline]
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A block of [`ARRAY_PACKED_REALS`] bone transforms in SoA layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayTransform {
    pub position: ArrayVector3,
    pub orientation: ArrayQuaternion,
    pub scale: ArrayVector3,
}

/// Packed keyframe block: one keyframe for every lane of a SIMD block.
pub type KfTransform = ArrayTransform;

impl ArrayTransform {
    pub const IDENTITY: Self = Self {
        position: ArrayVector3::ZERO,
        orientation: ArrayQuaternion::IDENTITY,
        scale: ArrayVector3::UNIT_SCALE,
    };

    #[must_use]
    pub fn splat(t: &BoneTransform) -> Self {
        Self {
            position: ArrayVector3::splat(t.position),
            orientation: ArrayQuaternion::splat(t.orientation),
            scale: ArrayVector3::splat(t.scale),
        }
    }

    #[inline]
    #[must_use]
    pub fn lane(&self, lane: usize) -> BoneTransform {
        BoneTransform {
            position: self.position.lane(lane),
            orientation: self.orientation.lane(lane),
            scale: self.scale.lane(lane),
        }
    }

    #[inline]
    pub fn set_lane(&mut self, lane: usize, t: &BoneTransform) {
        self.position.set_lane(lane, t.position);
        self.orientation.set_lane(lane, t.orientation);
        self.scale.set_lane(lane, t.scale);
    }

    /// Moves every lane toward `target` by the matching lane of `t`.
    ///
    /// Orientation is blended component-wise without renormalization. Lanes
    /// with `t == 0` keep their bits and lanes with `t == 1` take the target's
    /// bits, signed zeros included.
    #[inline]
    pub fn lerp_toward(&mut self, target: &Self, t: ArrayReal) {
        let lerped = Self {
            position: ArrayVector3::lerp(&self.position, &target.position, t),
            orientation: ArrayQuaternion::lerp(&self.orientation, &target.orientation, t),
            scale: ArrayVector3::lerp(&self.scale, &target.scale, t),
        };
        let lerped = Self::pick(t, 1.0, target, &lerped);
        *self = Self::pick(t, 0.0, self, &lerped);
    }

    #[inline]
    fn pick(t: ArrayReal, at: f32, when_eq: &Self, otherwise: &Self) -> Self {
        Self {
            position: ArrayVector3::pick(t, at, &when_eq.position, &otherwise.position),
            orientation: ArrayQuaternion::pick(t, at, &when_eq.orientation, &otherwise.orientation),
            scale: ArrayVector3::pick(t, at, &when_eq.scale, &otherwise.scale),
        }
    }

    /// Additively blends a keyframe delta into this block.
    ///
    /// Position gains `delta * w`, orientation is post-multiplied by the
    /// shortest-arc nlerp from identity toward the delta, and scale is
    /// multiplied by `lerp(1, delta, w)`. Lanes with `w == 0` are left
    /// bit-for-bit untouched.
    #[inline]
    pub fn blend_delta(&mut self, delta: &KfTransform, w: ArrayReal) {
        let blended = Self {
            position: self.position + delta.position * w,
            orientation: self.orientation
                * ArrayQuaternion::nlerp_shortest(w, &ArrayQuaternion::IDENTITY, &delta.orientation),
            scale: self.scale * ArrayVector3::lerp(&ArrayVector3::UNIT_SCALE, &delta.scale, w),
        };
        *self = Self::pick(w, 0.0, self, &blended);
    }
}

impl Default for ArrayTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn lane_roundtrip() {
        let mut block = ArrayTransform::IDENTITY;
        let t = BoneTransform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(FRAC_PI_2),
            Vec3::splat(2.0),
        );
        block.set_lane(2, &t);
        assert_eq!(block.lane(2), t);
        assert_eq!(block.lane(0), BoneTransform::IDENTITY);
    }

    #[test]
    fn quaternion_product_matches_glam() {
        let a = Quat::from_rotation_x(0.3);
        let b = Quat::from_rotation_z(1.1);
        let product = ArrayQuaternion::splat(a) * ArrayQuaternion::splat(b);
        let expected = a * b;
        for lane in 0..ARRAY_PACKED_REALS {
            assert!(product.lane(lane).abs_diff_eq(expected, EPSILON));
        }
    }

    #[test]
    fn lerp_toward_with_mask_is_exact_select() {
        let mut block = ArrayTransform::splat(&BoneTransform::new(
            Vec3::new(5.0, 6.0, 7.0),
            Quat::from_rotation_y(0.7),
            Vec3::splat(3.0),
        ));
        let before = block;
        let target = ArrayTransform::IDENTITY;
        block.lerp_toward(&target, Vec4::new(1.0, 0.0, 1.0, 0.0));

        assert_eq!(block.lane(0), BoneTransform::IDENTITY);
        assert_eq!(block.lane(1), before.lane(1));
        assert_eq!(block.lane(2), BoneTransform::IDENTITY);
        assert_eq!(block.lane(3), before.lane(3));
    }

    #[test]
    fn nlerp_shortest_picks_short_arc() {
        let a = ArrayQuaternion::IDENTITY;
        let q = Quat::from_rotation_y(0.5);
        let b = ArrayQuaternion::splat(-q);
        let half = ArrayQuaternion::nlerp_shortest(Vec4::splat(1.0), &a, &b);
        assert!(half.lane(0).abs_diff_eq(q, EPSILON));
    }

    #[test]
    fn blend_delta_zero_weight_is_noop() {
        let mut block = ArrayTransform::IDENTITY;
        let mut delta = ArrayTransform::IDENTITY;
        delta.position = ArrayVector3::splat(Vec3::X);
        delta.scale = ArrayVector3::splat(Vec3::splat(2.0));
        block.blend_delta(&delta, Vec4::new(0.0, 1.0, 0.0, 0.5));

        assert_eq!(block.lane(0), BoneTransform::IDENTITY);
        assert!((block.lane(1).position - Vec3::X).length() < EPSILON);
        assert!((block.lane(1).scale - Vec3::splat(2.0)).length() < EPSILON);
        assert!((block.lane(3).scale - Vec3::splat(1.5)).length() < EPSILON);
    }

    #[test]
    fn masked_lanes_keep_signed_zero() {
        let kept = BoneTransform::new(Vec3::new(-0.0, 1.0, -0.0), Quat::from_xyzw(-0.0, 0.0, 0.0, 1.0), Vec3::ONE);
        let mut block = ArrayTransform::splat(&kept);
        let target = ArrayTransform::splat(&BoneTransform::new(Vec3::splat(4.0), Quat::IDENTITY, Vec3::ONE));
        block.lerp_toward(&target, Vec4::new(0.0, 1.0, 0.0, 1.0));

        let mut delta = ArrayTransform::IDENTITY;
        delta.position = ArrayVector3::splat(Vec3::new(-0.0, 2.0, 0.0));
        block.blend_delta(&delta, Vec4::new(0.0, 0.0, 0.0, 1.0));

        for lane in [0, 2] {
            let t = block.lane(lane);
            assert_eq!(t.position.x.to_bits(), (-0.0f32).to_bits());
            assert_eq!(t.position.z.to_bits(), (-0.0f32).to_bits());
            assert_eq!(t.orientation.x.to_bits(), (-0.0f32).to_bits());
        }
        assert_eq!(block.lane(1).position, Vec3::splat(4.0));
        assert_eq!(block.lane(3).position, Vec3::new(4.0, 6.0, 4.0));
    }
}
