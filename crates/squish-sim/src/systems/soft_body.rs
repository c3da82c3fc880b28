use squish_ecs::{EcsError, Entity, QueryDescriptor, QueryState, System, World};
use squish_physics::{
    ActivationState, CollisionFlags, PhysicsWorld, SoftBody as PhysicsSoftBody, SoftBodyConfig,
};
use squish_render::{RenderObject, Scene};
use tracing::debug;

use crate::components::{InitState, SoftBody};
use crate::config::SoftBodyTuning;
use crate::context::SimContext;
use crate::error::SimError;
use crate::geometry::map_geometry;

/// Builds physics soft bodies and their render volumes for newly added
/// soft body entities.
pub struct SoftBodySystem {
    queries: [QueryState; 1],
    tuning: SoftBodyTuning,
}

impl SoftBodySystem {
    pub fn new(world: &mut World, tuning: SoftBodyTuning) -> Result<Self, EcsError> {
        let soft_bodies = QueryDescriptor::new("soft_bodies")
            .with::<SoftBody>()
            .mandatory()
            .listen_added();
        Ok(Self {
            queries: [QueryState::new(world, soft_bodies)?],
            tuning,
        })
    }
}

impl System<SimContext, SimError> for SoftBodySystem {
    fn name(&self) -> &str {
        "SoftBodySystem"
    }

    fn queries_mut(&mut self) -> &mut [QueryState] {
        &mut self.queries
    }

    fn run(&mut self, world: &mut World, ctx: &mut SimContext) -> Result<(), SimError> {
        let (physics, scene) = ctx.physics_and_scene()?;
        for &entity in self.queries[0].added() {
            initialize(world, entity, &self.tuning, physics, scene)?;
        }
        Ok(())
    }
}

fn initialize(
    world: &mut World,
    entity: Entity,
    tuning: &SoftBodyTuning,
    physics: &mut PhysicsWorld,
    scene: &mut Scene,
) -> Result<(), SimError> {
    let Some(soft) = world.get_mut::<SoftBody>(entity) else {
        return Ok(());
    };
    if !soft.state.is_pending() {
        return Ok(());
    }

    let mapping = map_geometry(soft.geometry.positions.as_slice(), soft.geometry.indices.as_deref())?;

    let mut volume = RenderObject::new("soft_body", soft.geometry.clone(), soft.material.clone())
        .with_shadows(true, true);
    volume.frustum_culled = false;
    let volume = volume.into_shared();
    scene.add(&volume);

    let mut body = PhysicsSoftBody::from_triangle_mesh(&mapping.vertices, &mapping.indices)?;
    body.config = SoftBodyConfig {
        velocity_iterations: tuning.velocity_iterations,
        position_iterations: tuning.position_iterations,
        dynamic_friction: tuning.dynamic_friction,
        damping: tuning.damping,
        pressure: soft.pressure,
        collisions: CollisionFlags::SOFT_SOFT | CollisionFlags::SOFT_RIGID,
    };
    body.material = tuning.material();
    body.set_total_mass(soft.mass, false);
    body.set_margin(soft.margin);
    body.set_activation_state(ActivationState::DisableDeactivation);

    let nodes = body.node_count();
    let handle = physics.add_soft_body(body);

    soft.volume = Some(volume);
    soft.mapping = Some(mapping);
    soft.body = Some(handle);
    soft.state = InitState::Initialized;

    debug!(?entity, nodes, mass = soft.mass, pressure = soft.pressure, "soft body initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use squish_ecs::SystemSchedule;
    use squish_render::{Material, Mesh};

    fn context() -> SimContext {
        SimContext {
            physics: Some(PhysicsWorld::new()),
            ..SimContext::default()
        }
    }

    fn spawn_cube(world: &mut World) -> Entity {
        let mut geometry = Mesh::cuboid(2.5, 2.5, 2.5, 12, 12, 12);
        geometry.translate(Vec3::new(5.0, 5.0, 0.0));
        let entity = world.spawn();
        world.insert(entity, SoftBody::new(geometry, Material::default(), 37.5, 750.0, 0.05));
        entity
    }

    #[test]
    fn test_cube_initialization() {
        let mut world = World::new();
        let mut ctx = context();
        let mut schedule = SystemSchedule::<SimContext, SimError>::new();
        schedule.add_system(SoftBodySystem::new(&mut world, SoftBodyTuning::default()).unwrap());

        let entity = spawn_cube(&mut world);
        schedule.run_all(&mut world, &mut ctx).unwrap();

        let soft = world.get::<SoftBody>(entity).unwrap();
        assert_eq!(soft.state, InitState::Initialized);
        let mapping = soft.mapping.as_ref().unwrap();
        assert_eq!(mapping.node_count(), 866);
        assert_eq!(mapping.association.len(), 866);

        let volume = soft.volume.as_ref().unwrap();
        {
            let object = volume.read();
            assert!(object.cast_shadow && object.receive_shadow);
            assert!(!object.frustum_culled);
            assert_eq!(object.mesh.vertex_count(), 6 * 13 * 13);
        }
        assert!(ctx.scene().unwrap().contains(volume));

        let physics = ctx.physics().unwrap();
        let body = physics.soft_body(soft.body.unwrap()).unwrap();
        assert_eq!(body.node_count(), 866);
        assert!((body.total_mass() - 37.5).abs() < 1e-3);
        assert_eq!(body.margin(), 0.05);
        assert_eq!(body.config.pressure, 750.0);
        assert_eq!(body.config.velocity_iterations, 40);
        assert!(body.config.collisions.contains(CollisionFlags::SOFT_SOFT));
        assert!(body.config.collisions.contains(CollisionFlags::SOFT_RIGID));
        assert_eq!(body.material.linear_stiffness, 0.9);
        assert_eq!(body.activation_state(), ActivationState::DisableDeactivation);
    }

    #[test]
    fn test_second_frame_does_not_reinitialize() {
        let mut world = World::new();
        let mut ctx = context();
        let mut schedule = SystemSchedule::<SimContext, SimError>::new();
        schedule.add_system(SoftBodySystem::new(&mut world, SoftBodyTuning::default()).unwrap());

        spawn_cube(&mut world);
        schedule.run_all(&mut world, &mut ctx).unwrap();
        let report = schedule.run_all(&mut world, &mut ctx).unwrap();

        assert_eq!(report.dormant, 1);
        assert_eq!(ctx.physics().unwrap().soft_body_count(), 1);
        assert_eq!(ctx.scene().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_geometry_is_reported() {
        let mut world = World::new();
        let mut ctx = context();
        let mut schedule = SystemSchedule::<SimContext, SimError>::new();
        schedule.add_system(SoftBodySystem::new(&mut world, SoftBodyTuning::default()).unwrap());

        let entity = world.spawn();
        let geometry = Mesh::new(vec![0.0; 9], vec![0.0; 9], Some(vec![0, 1, 5]));
        world.insert(entity, SoftBody::new(geometry, Material::default(), 1.0, 0.0, 0.05));

        let err = schedule.run_all(&mut world, &mut ctx).unwrap_err();
        assert!(matches!(err, SimError::Geometry(_)));
    }
}
