use squish_ecs::{EcsError, Entity, QueryDescriptor, QueryState, System, World};
use squish_physics::{ActivationState, PhysicsWorld};
use squish_render::Scene;
use tracing::debug;

use crate::components::{InitState, Object3D, RigidBody};
use crate::context::SimContext;
use crate::error::SimError;

/// Creates physics bodies for newly added rigid body entities and attaches
/// their render objects to the scene.
pub struct RigidBodySystem {
    queries: [QueryState; 1],
}

impl RigidBodySystem {
    pub fn new(world: &mut World) -> Result<Self, EcsError> {
        let rigid_bodies = QueryDescriptor::new("rigid_bodies")
            .with::<RigidBody>()
            .with::<Object3D>()
            .mandatory()
            .listen_added();
        Ok(Self {
            queries: [QueryState::new(world, rigid_bodies)?],
        })
    }
}

impl System<SimContext, SimError> for RigidBodySystem {
    fn name(&self) -> &str {
        "RigidBodySystem"
    }

    fn queries_mut(&mut self) -> &mut [QueryState] {
        &mut self.queries
    }

    fn run(&mut self, world: &mut World, ctx: &mut SimContext) -> Result<(), SimError> {
        let (physics, scene) = ctx.physics_and_scene()?;
        for &entity in self.queries[0].added() {
            initialize(world, entity, physics, scene)?;
        }
        Ok(())
    }
}

fn initialize(
    world: &mut World,
    entity: Entity,
    physics: &mut PhysicsWorld,
    scene: &mut Scene,
) -> Result<(), SimError> {
    let Some(object) = world.get::<Object3D>(entity).map(|o| o.object.clone()) else {
        return Ok(());
    };
    let Some(body) = world.get_mut::<RigidBody>(entity) else {
        return Ok(());
    };
    if !body.state.is_pending() {
        return Ok(());
    }

    object
        .write()
        .transform
        .set_position_rotation(body.position, body.rotation);
    scene.add(&object);

    let handle = physics.add_rigid_body(&body.desc());
    if body.mass > 0.0 {
        physics.set_activation_state(handle, ActivationState::DisableDeactivation)?;
    }
    body.body = Some(handle);
    body.state = InitState::Initialized;

    debug!(?entity, mass = body.mass, shape = body.shape.kind(), "rigid body initialized");
    Ok(())
}
