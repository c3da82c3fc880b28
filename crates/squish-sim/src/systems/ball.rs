use squish_ecs::{EcsError, Entity, QueryDescriptor, QueryState, System, World};
use squish_physics::PhysicsWorld;
use tracing::{debug, warn};

use crate::components::{Ball, InitState, RigidBody};
use crate::context::SimContext;
use crate::error::SimError;

/// Gives newly launched balls their initial velocity and friction.
///
/// A ball needs its rigid body to exist first. If a ball shows up before the
/// rigid body system has handled it, the ball is kept pending and retried on
/// the next frame.
pub struct BallSystem {
    queries: [QueryState; 1],
    launch_speed: f32,
    friction: f32,
    deferred: Vec<Entity>,
}

enum Outcome {
    Done,
    Skipped,
    Deferred,
}

impl BallSystem {
    pub fn new(world: &mut World, launch_speed: f32, friction: f32) -> Result<Self, EcsError> {
        let balls = QueryDescriptor::new("balls")
            .with::<Ball>()
            .with::<RigidBody>()
            .mandatory()
            .listen_added();
        Ok(Self {
            queries: [QueryState::new(world, balls)?],
            launch_speed,
            friction,
            deferred: Vec::new(),
        })
    }

    fn initialize(
        &self,
        world: &mut World,
        entity: Entity,
        physics: &mut PhysicsWorld,
    ) -> Result<Outcome, SimError> {
        let Some(rigid) = world.get::<RigidBody>(entity) else {
            return Ok(Outcome::Skipped);
        };
        let Some(handle) = rigid.body else {
            return Ok(Outcome::Deferred);
        };
        let Some(ball) = world.get_mut::<Ball>(entity) else {
            return Ok(Outcome::Skipped);
        };
        if !ball.state.is_pending() {
            return Ok(Outcome::Skipped);
        }

        let velocity = ball.velocity_direction * self.launch_speed;
        physics.set_linear_velocity(handle, velocity)?;
        physics.set_friction(handle, self.friction)?;
        ball.state = InitState::Initialized;

        debug!(?entity, ?velocity, "ball launched");
        Ok(Outcome::Done)
    }
}

impl System<SimContext, SimError> for BallSystem {
    fn name(&self) -> &str {
        "BallSystem"
    }

    fn queries_mut(&mut self) -> &mut [QueryState] {
        &mut self.queries
    }

    fn has_deferred_work(&self) -> bool {
        !self.deferred.is_empty()
    }

    fn run(&mut self, world: &mut World, ctx: &mut SimContext) -> Result<(), SimError> {
        let physics = ctx.physics_mut()?;
        let retries = std::mem::take(&mut self.deferred);
        let fresh = self.queries[0].added().to_vec();

        let candidates = retries
            .into_iter()
            .map(|e| (e, true))
            .chain(fresh.into_iter().map(|e| (e, false)));
        for (entity, retry) in candidates {
            if !world.is_alive(entity) {
                continue;
            }
            if let Outcome::Deferred = self.initialize(world, entity, physics)? {
                if !retry {
                    warn!(?entity, "ball has no rigid body yet, retrying next frame");
                }
                self.deferred.push(entity);
            }
        }
        Ok(())
    }
}
