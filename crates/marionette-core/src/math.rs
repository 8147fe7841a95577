//! Math extensions on top of glam
//!
//! Quaternion and matrix conversions that glam either lacks or implements
//! too naively for animation work: a branch-selecting matrix-to-quaternion
//! conversion, ZXY Euler conversions that stay stable near gimbal lock, and
//! an arc rotation with an explicit fallback axis for the anti-parallel
//! case.

use glam::{Mat3, Quat, Vec3};

/// Shared epsilon for the conversions in this module
pub const EPS: f32 = 1e-6;

/// Normalize a quaternion, mapping the zero quaternion to identity
#[must_use]
pub fn normalize_quat(q: Quat) -> Quat {
    let len = q.length();
    if len == 0.0 {
        Quat::IDENTITY
    } else {
        Quat::from_xyzw(q.x / len, q.y / len, q.z / len, q.w / len)
    }
}

/// Build a quaternion from an angle (radians) and an axis.
///
/// The axis does not need to be unit length; it is normalized internally.
/// A zero axis yields the identity quaternion.
#[must_use]
pub fn quat_from_angle_axis(angle: f32, axis: Vec3) -> Quat {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_axis_angle(axis, angle)
}

/// Rotation matrix from a quaternion
#[must_use]
pub fn quat_to_mat(q: Quat) -> Mat3 {
    Mat3::from_quat(q)
}

/// Convert a rotation matrix to a quaternion.
///
/// Selects the conversion branch with the largest diagonal contribution
/// (Shepperd's method, as done in Blender's `mat3_normalized_to_quat`),
/// which stays accurate near 180-degree rotations where the naive
/// trace-only conversion loses precision.
#[must_use]
pub fn mat_to_quat(m: &Mat3) -> Quat {
    let a = m.x_axis;
    let b = m.y_axis;
    let c = m.z_axis;

    let tr = a.x + b.y + c.z + 1.0;
    let q = if tr > 4e-4 {
        let s = tr.sqrt();
        let s2 = 0.5 / s;
        Quat::from_xyzw(
            (b.z - c.y) * s2,
            (c.x - a.z) * s2,
            (a.y - b.x) * s2,
            s * 0.5,
        )
    } else if a.x > b.y && a.x > c.z {
        let s = (a.x - b.y - c.z + 1.0).sqrt();
        let s2 = 0.5 / s;
        Quat::from_xyzw(
            s * 0.5,
            (a.y + b.x) * s2,
            (c.x + a.z) * s2,
            (b.z - c.y) * s2,
        )
    } else if b.y > c.z {
        let s = (b.y - a.x - c.z + 1.0).sqrt();
        let s2 = 0.5 / s;
        Quat::from_xyzw(
            (a.y + b.x) * s2,
            s * 0.5,
            (b.z + c.y) * s2,
            (c.x - a.z) * s2,
        )
    } else {
        let s = (c.z - a.x - b.y + 1.0).sqrt();
        let s2 = 0.5 / s;
        Quat::from_xyzw(
            (c.x + a.z) * s2,
            (b.z + c.y) * s2,
            s * 0.5,
            (a.y - b.x) * s2,
        )
    };

    normalize_quat(q)
}

/// Convert a quaternion to ZXY Euler angles (x pitch, y yaw, z roll).
///
/// Computed through the rotation matrix. Away from gimbal lock two
/// candidate triples are evaluated and the one with the smaller L1
/// magnitude wins, which keeps roll near zero when it should be zero and
/// avoids the jumps of the naive conversion.
#[must_use]
pub fn quat_to_euler(q: Quat) -> Vec3 {
    let m = quat_to_mat(q);
    let cy = f32::hypot(m.z_axis.z, m.z_axis.x);

    if cy > EPS {
        let e1 = Vec3::new(
            (-m.z_axis.y).atan2(cy),
            m.z_axis.x.atan2(m.z_axis.z),
            m.x_axis.y.atan2(m.y_axis.y),
        );
        let e2 = Vec3::new(
            (-m.z_axis.y).atan2(-cy),
            (-m.z_axis.x).atan2(-m.z_axis.z),
            (-m.x_axis.y).atan2(-m.y_axis.y),
        );

        let d1 = e1.x.abs() + e1.y.abs() + e1.z.abs();
        let d2 = e2.x.abs() + e2.y.abs() + e2.z.abs();
        if d1 < d2 {
            e1
        } else {
            e2
        }
    } else {
        Vec3::new(
            (-m.z_axis.y).atan2(cy),
            0.0,
            (-m.y_axis.x).atan2(m.x_axis.x),
        )
    }
}

/// Convert ZXY Euler angles (x pitch, y yaw, z roll) to a quaternion
#[must_use]
pub fn euler_to_quat(angles: Vec3) -> Quat {
    let ti = angles.z * 0.5;
    let tj = angles.x * 0.5;
    let tk = angles.y * 0.5;

    let ci = ti.cos();
    let cj = tj.cos();
    let ck = tk.cos();

    let si = ti.sin();
    let sj = tj.sin();
    let sk = tk.sin();

    let cc = ci * ck;
    let cs = ci * sk;
    let sc = si * ck;
    let ss = si * sk;

    Quat::from_xyzw(
        cj * ss + sj * cc,
        cj * cs - sj * sc,
        cj * sc - sj * cs,
        cj * cc + sj * ss,
    )
}

/// Shortest-arc rotation taking `origin` onto `dest`.
///
/// Both inputs are normalized internally. For (near-)parallel vectors the
/// identity is returned. For anti-parallel vectors the rotation is a half
/// turn about `fallback_axis` when it is nonzero, otherwise about an axis
/// orthogonal to `origin` (cross with X, falling back to cross with Y).
#[must_use]
pub fn get_rotation_to(origin: Vec3, dest: Vec3, fallback_axis: Vec3) -> Quat {
    let v0 = origin.normalize_or_zero();
    let v1 = dest.normalize_or_zero();

    let d = v0.dot(v1);
    if d >= 1.0 {
        return Quat::IDENTITY;
    }
    if d < EPS - 1.0 {
        if fallback_axis != Vec3::ZERO {
            return quat_from_angle_axis(std::f32::consts::PI, fallback_axis);
        }
        let mut axis = Vec3::X.cross(origin);
        if axis.length() < 1e-4 {
            axis = Vec3::Y.cross(origin);
        }
        return quat_from_angle_axis(std::f32::consts::PI, axis);
    }

    let s = (2.0 * (1.0 + d)).sqrt();
    let inv_s = 1.0 / s;
    let c = v0.cross(v1);
    normalize_quat(Quat::from_xyzw(c.x * inv_s, c.y * inv_s, c.z * inv_s, s * 0.5))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotations_match(a: Quat, b: Quat, tol: f32) -> bool {
        // Double cover: q and -q are the same rotation
        a.dot(b).abs() > 1.0 - tol
    }

    #[test]
    fn rotation_to_maps_origin_onto_dest() {
        let cases = [
            (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
            (Vec3::new(0.3, -2.0, 0.7), Vec3::new(1.5, 0.1, -0.4)),
            (Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.1, -5.0)),
        ];
        for (a, b) in cases {
            let q = get_rotation_to(a, b, Vec3::ZERO);
            let rotated = q * a.normalize();
            assert!(
                (rotated - b.normalize()).length() < 1e-4,
                "{a:?} -> {b:?} gave {rotated:?}"
            );
        }
    }

    #[test]
    fn rotation_to_parallel_is_identity() {
        let q = get_rotation_to(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 7.0, 0.0), Vec3::ZERO);
        assert!(rotations_match(q, Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn rotation_to_anti_parallel_uses_fallback_axis() {
        let q = get_rotation_to(Vec3::X, -Vec3::X, Vec3::Z);
        // Half turn about Z: (w=0, x=0, y=0, z=1) up to sign
        assert!(q.w.abs() < 1e-5);
        assert!(q.x.abs() < 1e-5);
        assert!(q.y.abs() < 1e-5);
        assert!((q.z.abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rotation_to_anti_parallel_without_fallback() {
        let q = get_rotation_to(Vec3::Y, -Vec3::Y, Vec3::ZERO);
        let rotated = q * Vec3::Y;
        assert!((rotated - (-Vec3::Y)).length() < 1e-4);
    }

    #[test]
    fn mat_quat_double_cover() {
        let samples = [
            Quat::from_axis_angle(Vec3::Z, 0.3),
            Quat::from_axis_angle(Vec3::new(1.0, 2.0, 3.0).normalize(), 2.9),
            Quat::from_axis_angle(Vec3::X, std::f32::consts::PI - 1e-3),
            Quat::from_axis_angle(Vec3::new(-1.0, 0.2, 0.9).normalize(), std::f32::consts::PI),
            Quat::IDENTITY,
        ];
        for q in samples {
            let back = mat_to_quat(&quat_to_mat(q));
            assert!(rotations_match(q, back, 1e-4), "{q:?} -> {back:?}");
        }
    }

    #[test]
    fn euler_round_trip_preserves_rotation() {
        let q = quat_from_angle_axis(
            std::f32::consts::FRAC_PI_3,
            Vec3::new(1.0, 2.0, 3.0),
        );
        let back = euler_to_quat(quat_to_euler(q));
        let p = Vec3::X;
        assert!(((q * p) - (back * p)).length() < 1e-4);
    }

    #[test]
    fn euler_keeps_roll_zero_for_pure_yaw() {
        // Looking behind: yaw well outside (-pi/2, pi/2)
        let q = euler_to_quat(Vec3::new(0.0, 2.8, 0.0));
        let e = quat_to_euler(q);
        assert!(e.x.abs() < 1e-4);
        assert!((e.y - 2.8).abs() < 1e-4);
        assert!(e.z.abs() < 1e-4);
    }

    #[test]
    fn angle_axis_normalizes_and_guards_zero() {
        let q = quat_from_angle_axis(1.0, Vec3::new(0.0, 0.0, 10.0));
        let expected = Quat::from_axis_angle(Vec3::Z, 1.0);
        assert!(rotations_match(q, expected, 1e-5));
        assert_eq!(quat_from_angle_axis(1.0, Vec3::ZERO), Quat::IDENTITY);
    }

    #[test]
    fn produced_quaternions_are_unit() {
        let q = get_rotation_to(Vec3::new(3.0, 1.0, 0.2), Vec3::new(-0.4, 2.0, 1.0), Vec3::ZERO);
        assert!((q.length() - 1.0).abs() < 1e-5);
        let m = mat_to_quat(&Mat3::IDENTITY);
        assert!((m.length() - 1.0).abs() < 1e-5);
    }
}
