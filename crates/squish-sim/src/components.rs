//! Components attached to simulated entities

use glam::{Quat, Vec3};
use serde::Serialize;
use squish_physics::{CollisionShape, RigidBodyDesc, RigidBodyHandle, SoftBodyHandle};
use squish_render::{Material, Mesh, SharedObject};

use crate::geometry::NodeMapping;

/// Lifecycle marker carried by every simulated component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum InitState {
    #[default]
    Pending,
    Initialized,
}

impl InitState {
    pub fn is_pending(self) -> bool {
        self == InitState::Pending
    }
}

/// Render object driven by the entity's rigid body.
#[derive(Debug, Clone)]
pub struct Object3D {
    pub object: SharedObject,
}

impl Object3D {
    pub fn new(object: SharedObject) -> Self {
        Self { object }
    }
}

/// A rigid body declaration. `body` is filled in once the physics world owns it.
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// Zero makes the body static
    pub mass: f32,
    pub shape: CollisionShape,
    pub position: Vec3,
    pub rotation: Quat,
    pub body: Option<RigidBodyHandle>,
    pub state: InitState,
}

impl RigidBody {
    pub fn new(mass: f32, shape: CollisionShape, position: Vec3, rotation: Quat) -> Self {
        Self {
            mass,
            shape,
            position,
            rotation,
            body: None,
            state: InitState::Pending,
        }
    }

    pub fn desc(&self) -> RigidBodyDesc {
        RigidBodyDesc::new(self.mass, self.shape).with_transform(self.position, self.rotation)
    }
}

/// A deformable body built from a render mesh.
///
/// `geometry` is the declared mesh in world space. Initialization clones it
/// into `volume`, whose buffers the sync pass then rewrites every frame.
#[derive(Debug, Clone)]
pub struct SoftBody {
    pub mass: f32,
    pub pressure: f32,
    pub margin: f32,
    pub geometry: Mesh,
    pub material: Material,
    pub volume: Option<SharedObject>,
    pub mapping: Option<NodeMapping>,
    pub body: Option<SoftBodyHandle>,
    pub state: InitState,
}

impl SoftBody {
    pub fn new(geometry: Mesh, material: Material, mass: f32, pressure: f32, margin: f32) -> Self {
        Self {
            mass,
            pressure,
            margin,
            geometry,
            material,
            volume: None,
            mapping: None,
            body: None,
            state: InitState::Pending,
        }
    }
}

/// A launched projectile. Needs a [`RigidBody`] on the same entity.
#[derive(Debug, Clone, Copy)]
pub struct Ball {
    /// Unit launch direction
    pub velocity_direction: Vec3,
    pub state: InitState,
}

impl Ball {
    pub fn new(velocity_direction: Vec3) -> Self {
        Self {
            velocity_direction,
            state: InitState::Pending,
        }
    }
}
