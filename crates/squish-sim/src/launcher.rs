//! Turning a click on the viewport into a launched ball

use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use squish_core::Color;
use squish_ecs::{Entity, World};
use squish_physics::CollisionShape;
use squish_render::{Material, Mesh, RenderObject};

use crate::components::{Ball, Object3D, RigidBody};
use crate::config::BallConfig;

/// Size of the drawing surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Pixel coordinates (origin top-left) to normalized device coordinates.
    pub fn to_ndc(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x / self.width * 2.0 - 1.0, -(y / self.height) * 2.0 + 1.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Perspective camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// The demo's viewpoint, looking down at the ramp.
    pub fn demo(aspect: f32) -> Self {
        Self {
            position: Vec3::new(-7.0, 5.0, 8.0),
            target: Vec3::new(0.0, 2.0, 0.0),
            fov_degrees: 60.0,
            aspect,
            near: 0.2,
            far: 2000.0,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    /// Ray from the camera through a point given in normalized device
    /// coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = (self.projection_matrix() * self.view_matrix()).inverse();
        let through = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        Ray {
            origin: self.position,
            direction: (through - self.position).normalize_or_zero(),
        }
    }
}

/// Holds at most one pending launch request between frames.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LaunchLatch {
    pending: Option<Vec2>,
}

impl LaunchLatch {
    /// Queue a launch at `ndc`. Ignored while another request is pending.
    pub fn request(&mut self, ndc: Vec2) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(ndc);
        true
    }

    pub fn take(&mut self) -> Option<Vec2> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Spawn a ball one unit along `ray`, flying in the ray's direction.
pub fn spawn_ball(world: &mut World, ray: &Ray, config: &BallConfig) -> Entity {
    let mesh = Mesh::sphere(config.radius, config.width_segments, config.height_segments);
    let material = Material::new("ball", Color::from_hex(config.color));
    let object = RenderObject::new("ball", mesh, material)
        .with_shadows(true, true)
        .into_shared();

    let entity = world.spawn();
    world.insert(entity, Object3D::new(object));
    world.insert(
        entity,
        RigidBody::new(
            config.mass,
            CollisionShape::sphere(config.radius),
            ray.origin + ray.direction,
            Quat::IDENTITY,
        ),
    );
    world.insert(entity, Ball::new(ray.direction));
    entity
}
