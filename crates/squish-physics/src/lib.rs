//! Squish Physics - rigid and soft body simulation
//!
//! Rigid bodies are simulated by rapier3d. Soft bodies are node graphs stepped
//! by this crate after every rigid step, colliding against rapier's colliders
//! and against each other.

mod convert;
mod error;
mod shape;
mod soft_body;

pub use error::PhysicsError;
pub use shape::{CollisionShape, RigidBodyDesc};
pub use soft_body::{
    CollisionFlags, Node, SoftBody, SoftBodyConfig, SoftBodyHandle, SoftMaterial,
};

pub use rapier3d::prelude::RigidBodyHandle;

use std::collections::HashSet;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use tracing::{debug, info, trace};

use crate::convert::{from_isometry, from_vector, to_isometry, to_vector};

/// Physics world configuration
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity for rigid and soft bodies (default: -9.8 on Y axis)
    pub gravity: Vec3,
    /// Fixed internal timestep (default: 1/60)
    pub timestep: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.8, 0.0),
            timestep: 1.0 / 60.0,
        }
    }
}

/// Whether a body may be put to sleep when it comes to rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivationState {
    #[default]
    Active,
    Sleeping,
    /// Never put to sleep.
    DisableDeactivation,
}

/// The main physics world containing all simulation state
pub struct PhysicsWorld {
    /// Configuration
    pub config: PhysicsConfig,

    /// Rigid body storage
    rigid_body_set: RigidBodySet,
    /// Collider storage
    collider_set: ColliderSet,
    /// Impulse joint storage
    impulse_joint_set: ImpulseJointSet,
    /// Multi-body joint storage
    multibody_joint_set: MultibodyJointSet,
    /// Soft bodies, indexed by [`SoftBodyHandle`]
    soft_bodies: Vec<SoftBody>,
    /// Rigid bodies that were told never to sleep
    no_deactivation: HashSet<RigidBodyHandle>,

    /// Integration parameters
    integration_parameters: IntegrationParameters,
    /// Physics pipeline
    physics_pipeline: PhysicsPipeline,
    /// Island manager
    island_manager: IslandManager,
    /// Broad phase collision detection
    broad_phase: DefaultBroadPhase,
    /// Narrow phase collision detection
    narrow_phase: NarrowPhase,
    /// Continuous collision detection solver
    ccd_solver: CCDSolver,

    /// Time carried over between fixed steps
    local_time: f32,
    /// Sum of every delta passed to `step_simulation`
    elapsed: f64,
}

impl PhysicsWorld {
    /// Create a new physics world with default configuration
    pub fn new() -> Self {
        Self::with_config(PhysicsConfig::default())
    }

    /// Create a new physics world with custom configuration
    pub fn with_config(config: PhysicsConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep;

        info!(
            gravity = ?config.gravity,
            timestep = config.timestep,
            "physics world created"
        );

        Self {
            config,
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            soft_bodies: Vec::new(),
            no_deactivation: HashSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            local_time: 0.0,
            elapsed: 0.0,
        }
    }

    /// Advance the simulation by `delta` seconds.
    ///
    /// With `max_substeps > 0` the world advances in fixed steps of
    /// `config.timestep`, carrying leftover time to the next call and running
    /// at most `max_substeps` steps; time beyond the cap is dropped. With
    /// `max_substeps == 0` a single step of `delta` is taken.
    ///
    /// Returns the number of internal steps taken.
    pub fn step_simulation(&mut self, delta: f32, max_substeps: u32) -> u32 {
        let delta = delta.max(0.0);
        self.elapsed += f64::from(delta);

        let fixed = self.config.timestep;
        let (steps, dt) = if max_substeps > 0 && fixed > 0.0 {
            self.local_time += delta;
            let due = (self.local_time / fixed).floor() as u32;
            self.local_time -= due as f32 * fixed;
            (due.min(max_substeps), fixed)
        } else {
            self.local_time = 0.0;
            (u32::from(delta > 0.0), delta)
        };

        for _ in 0..steps {
            self.step_fixed(dt);
        }
        trace!(delta, steps, "physics stepped");
        steps
    }

    fn step_fixed(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        let gravity = to_vector(self.config.gravity);

        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        for soft in &mut self.soft_bodies {
            soft.step(dt, self.config.gravity, &mut self.rigid_body_set, &self.collider_set);
        }
        self.collide_soft_bodies();
    }

    fn collide_soft_bodies(&mut self) {
        for i in 0..self.soft_bodies.len() {
            let (head, tail) = self.soft_bodies.split_at_mut(i + 1);
            let first = &mut head[i];
            if !first.config.collisions.contains(CollisionFlags::SOFT_SOFT) {
                continue;
            }
            for second in tail
                .iter_mut()
                .filter(|s| s.config.collisions.contains(CollisionFlags::SOFT_SOFT))
            {
                soft_body::collide_soft_pair(first, second);
            }
        }
    }

    /// Total simulated time: the sum of every delta passed to
    /// [`Self::step_simulation`], independent of the sub-step cap.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed
    }

    // ---- Rigid bodies ----

    /// Create a rigid body with one collider. Zero mass makes a fixed body;
    /// otherwise mass and inertia come from the description, not from the
    /// collider's density.
    pub fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> RigidBodyHandle {
        let builder = if desc.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            let inertia = desc.shape.local_inertia(desc.mass);
            RigidBodyBuilder::dynamic().additional_mass_properties(MassProperties::new(
                Point::origin(),
                desc.mass,
                to_vector(inertia),
            ))
        };
        let body = builder
            .position(to_isometry(desc.position, desc.rotation))
            .build();
        let collider = desc.shape.collider_builder().density(0.0).build();

        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        debug!(
            ?handle,
            mass = desc.mass,
            shape = desc.shape.kind(),
            "rigid body added"
        );
        handle
    }

    fn rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.rigid_body_set
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownRigidBody(handle))
    }

    /// World transform of a rigid body, or `None` for an unknown handle.
    pub fn rigid_body_transform(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        self.rigid_body_set
            .get(handle)
            .map(|body| from_isometry(body.position()))
    }

    pub fn set_activation_state(
        &mut self,
        handle: RigidBodyHandle,
        state: ActivationState,
    ) -> Result<(), PhysicsError> {
        let body = self.rigid_body_mut(handle)?;
        match state {
            ActivationState::Active => {
                *body.activation_mut() = RigidBodyActivation::active();
                body.wake_up(true);
            }
            ActivationState::Sleeping => body.sleep(),
            ActivationState::DisableDeactivation => {
                *body.activation_mut() = RigidBodyActivation::cannot_sleep();
                body.wake_up(true);
            }
        }
        if state == ActivationState::DisableDeactivation {
            self.no_deactivation.insert(handle);
        } else {
            self.no_deactivation.remove(&handle);
        }
        Ok(())
    }

    pub fn activation_state(&self, handle: RigidBodyHandle) -> Option<ActivationState> {
        let body = self.rigid_body_set.get(handle)?;
        Some(if self.no_deactivation.contains(&handle) {
            ActivationState::DisableDeactivation
        } else if body.is_sleeping() {
            ActivationState::Sleeping
        } else {
            ActivationState::Active
        })
    }

    pub fn set_linear_velocity(
        &mut self,
        handle: RigidBodyHandle,
        velocity: Vec3,
    ) -> Result<(), PhysicsError> {
        self.rigid_body_mut(handle)?
            .set_linvel(to_vector(velocity), true);
        Ok(())
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(handle)
            .map(|body| from_vector(body.linvel()))
    }

    /// Set the friction coefficient of every collider attached to a body.
    pub fn set_friction(&mut self, handle: RigidBodyHandle, friction: f32) -> Result<(), PhysicsError> {
        let body = self
            .rigid_body_set
            .get(handle)
            .ok_or(PhysicsError::UnknownRigidBody(handle))?;
        for &collider in body.colliders() {
            if let Some(collider) = self.collider_set.get_mut(collider) {
                collider.set_friction(friction);
            }
        }
        Ok(())
    }

    /// Friction of the first collider attached to a body.
    pub fn friction(&self, handle: RigidBodyHandle) -> Option<f32> {
        let body = self.rigid_body_set.get(handle)?;
        let collider = self.collider_set.get(*body.colliders().first()?)?;
        Some(collider.friction())
    }

    pub fn rigid_body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    // ---- Soft bodies ----

    pub fn add_soft_body(&mut self, body: SoftBody) -> SoftBodyHandle {
        let handle = SoftBodyHandle(self.soft_bodies.len());
        debug!(
            ?handle,
            nodes = body.node_count(),
            links = body.link_count(),
            mass = body.total_mass(),
            "soft body added"
        );
        self.soft_bodies.push(body);
        handle
    }

    pub fn soft_body(&self, handle: SoftBodyHandle) -> Option<&SoftBody> {
        self.soft_bodies.get(handle.0)
    }

    pub fn soft_body_mut(&mut self, handle: SoftBodyHandle) -> Result<&mut SoftBody, PhysicsError> {
        self.soft_bodies
            .get_mut(handle.0)
            .ok_or(PhysicsError::UnknownSoftBody(handle))
    }

    pub fn soft_body_count(&self) -> usize {
        self.soft_bodies.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
