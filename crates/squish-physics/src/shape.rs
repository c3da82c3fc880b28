use glam::{Quat, Vec3};
use rapier3d::prelude::ColliderBuilder;

/// Collision shape of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionShape {
    /// Axis-aligned box in local space, given by half extents.
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

impl CollisionShape {
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        CollisionShape::Box {
            half_extents: Vec3::new(width, height, depth) * 0.5,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        CollisionShape::Sphere { radius }
    }

    /// Principal moments of inertia for a body of the given mass.
    /// A zero mass yields zero inertia.
    pub fn local_inertia(&self, mass: f32) -> Vec3 {
        if mass <= 0.0 {
            return Vec3::ZERO;
        }
        match *self {
            CollisionShape::Box { half_extents } => {
                let l = half_extents * 2.0;
                let (x2, y2, z2) = (l.x * l.x, l.y * l.y, l.z * l.z);
                Vec3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 12.0)
            }
            CollisionShape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CollisionShape::Box { .. } => "box",
            CollisionShape::Sphere { .. } => "sphere",
        }
    }

    pub(crate) fn collider_builder(&self) -> ColliderBuilder {
        match *self {
            CollisionShape::Box { half_extents: h } => ColliderBuilder::cuboid(h.x, h.y, h.z),
            CollisionShape::Sphere { radius } => ColliderBuilder::ball(radius),
        }
    }
}

/// Everything needed to create a rigid body. A mass of zero makes it static.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDesc {
    pub mass: f32,
    pub shape: CollisionShape,
    pub position: Vec3,
    pub rotation: Quat,
}

impl RigidBodyDesc {
    pub fn new(mass: f32, shape: CollisionShape) -> Self {
        Self {
            mass,
            shape,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_transform(mut self, position: Vec3, rotation: Quat) -> Self {
        self.position = position;
        self.rotation = rotation;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }
}
