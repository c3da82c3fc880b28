//! Read-only JSON export of the world state

use glam::{Quat, Vec3};
use serde::Serialize;
use squish_ecs::World;
use squish_physics::PhysicsWorld;

use crate::components::{Ball, InitState, Object3D, RigidBody, SoftBody};
use crate::error::SimError;

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    /// Scheduled systems in execution order
    pub systems: Vec<String>,
    /// Simulated seconds, when the physics world exists
    pub elapsed_time: Option<f64>,
    pub entities: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySnapshot {
    pub index: u32,
    pub generation: u32,
    pub components: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rigid_body: Option<RigidBodySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_body: Option<SoftBodySnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ball: Option<BallSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RigidBodySnapshot {
    pub mass: f32,
    pub shape: &'static str,
    /// Render transform, which tracks the body once it is simulated
    pub position: Vec3,
    pub rotation: Quat,
    pub state: InitState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SoftBodySnapshot {
    pub mass: f32,
    pub pressure: f32,
    pub margin: f32,
    pub render_vertices: usize,
    pub nodes: Option<usize>,
    pub centroid: Option<Vec3>,
    pub state: InitState,
}

#[derive(Debug, Clone, Serialize)]
pub struct BallSnapshot {
    pub velocity_direction: Vec3,
    pub state: InitState,
}

impl WorldSnapshot {
    pub fn capture(world: &World, systems: &[&str], physics: Option<&PhysicsWorld>) -> Self {
        let entities = world
            .entities()
            .map(|entity| {
                let components = world
                    .component_names(entity)
                    .into_iter()
                    .map(|name| short_name(name).to_string())
                    .collect();

                let rigid_body = world.get::<RigidBody>(entity).map(|rigid| {
                    let (position, rotation) = match world.get::<Object3D>(entity) {
                        Some(object) => {
                            let transform = object.object.read().transform;
                            (transform.position, transform.rotation)
                        }
                        None => (rigid.position, rigid.rotation),
                    };
                    RigidBodySnapshot {
                        mass: rigid.mass,
                        shape: rigid.shape.kind(),
                        position,
                        rotation,
                        state: rigid.state,
                    }
                });

                let soft_body = world.get::<SoftBody>(entity).map(|soft| {
                    let body = soft
                        .body
                        .zip(physics)
                        .and_then(|(handle, physics)| physics.soft_body(handle));
                    SoftBodySnapshot {
                        mass: soft.mass,
                        pressure: soft.pressure,
                        margin: soft.margin,
                        render_vertices: soft.geometry.vertex_count(),
                        nodes: body.map(|b| b.node_count()),
                        centroid: body.map(|b| b.centroid()),
                        state: soft.state,
                    }
                });

                let ball = world.get::<Ball>(entity).map(|ball| BallSnapshot {
                    velocity_direction: ball.velocity_direction,
                    state: ball.state,
                });

                EntitySnapshot {
                    index: entity.index(),
                    generation: entity.generation(),
                    components,
                    rigid_body,
                    soft_body,
                    ball,
                }
            })
            .collect();

        Self {
            systems: systems.iter().map(|s| s.to_string()).collect(),
            elapsed_time: physics.map(PhysicsWorld::elapsed_time),
            entities,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `squish_sim::components::RigidBody` -> `RigidBody`
fn short_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}
