//! Conversions between glam (used by the rest of the workspace) and the
//! nalgebra types rapier works in.

use glam::{Quat, Vec3};
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

pub fn to_vector(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub fn to_point(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

pub fn from_vector(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn from_point(p: &Point3<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub fn to_rotation(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn from_rotation(q: &UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

pub fn to_isometry(position: Vec3, rotation: Quat) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::new(position.x, position.y, position.z),
        to_rotation(rotation),
    )
}

/// Split an isometry into (translation, rotation).
pub fn from_isometry(iso: &Isometry3<f32>) -> (Vec3, Quat) {
    (from_vector(&iso.translation.vector), from_rotation(&iso.rotation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isometry_round_trip() {
        let position = Vec3::new(3.0, 1.0, -2.0);
        let rotation = Quat::from_rotation_z(30f32.to_radians());
        let (p, r) = from_isometry(&to_isometry(position, rotation));
        assert!((p - position).length() < 1e-6);
        assert!(r.angle_between(rotation) < 1e-4);
    }

    #[test]
    fn test_rotation_applies_like_glam() {
        let rotation = Quat::from_rotation_y(0.7);
        let v = Vec3::new(1.0, 2.0, 3.0);
        let rotated = to_rotation(rotation) * to_vector(v);
        assert!((from_vector(&rotated) - rotation * v).length() < 1e-5);
    }
}
