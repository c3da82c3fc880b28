//! The frame driver: owns the world, the schedule and the shared context.

use glam::Vec2;
use squish_ecs::{Entity, FrameReport, SystemSchedule, World};
use squish_physics::PhysicsWorld;
use squish_render::Scene;
use tracing::{debug, info, trace};

use crate::components::{Ball, Object3D, RigidBody, SoftBody};
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::SimError;
use crate::launcher::{spawn_ball, Camera, LaunchLatch, Viewport};
use crate::snapshot::WorldSnapshot;
use crate::systems::{BallSystem, RigidBodySystem, SimulationSystem, SoftBodySystem};

pub struct Simulation {
    world: World,
    schedule: SystemSchedule<SimContext, SimError>,
    ctx: SimContext,
    config: SimConfig,
    camera: Camera,
    launch: LaunchLatch,
}

impl Simulation {
    pub fn new(config: SimConfig, viewport: Viewport) -> Result<Self, SimError> {
        let mut world = World::new();
        world.register_component::<Object3D>()?;
        world.register_component::<RigidBody>()?;
        world.register_component::<SoftBody>()?;
        world.register_component::<Ball>()?;

        let mut schedule = SystemSchedule::new();
        schedule.add_system(RigidBodySystem::new(&mut world)?);
        schedule.add_system(SoftBodySystem::new(&mut world, config.soft_body)?);
        schedule.add_system(BallSystem::new(
            &mut world,
            config.launch_speed,
            config.ball.friction,
        )?);
        schedule.add_system(SimulationSystem::new(
            config.physics_config(),
            config.max_substeps,
        ));

        info!(systems = ?schedule.system_names(), "simulation created");
        Ok(Self {
            world,
            schedule,
            ctx: SimContext::new(Scene::default()),
            config,
            camera: Camera::demo(viewport.aspect()),
            launch: LaunchLatch::default(),
        })
    }

    /// Run one frame: every system in order, then at most one pending launch.
    pub fn tick(&mut self, delta: f32, elapsed: f64) -> Result<FrameReport, SimError> {
        self.ctx.frame.update(delta, elapsed);
        let report = self.schedule.run_all(&mut self.world, &mut self.ctx)?;
        trace!(frame = self.ctx.frame.frame_count, ran = report.ran, dormant = report.dormant, "tick");

        if let Some(ndc) = self.launch.take() {
            let ray = self.camera.ray_from_ndc(ndc);
            let entity = spawn_ball(&mut self.world, &ray, &self.config.ball);
            debug!(?entity, direction = ?ray.direction, "ball spawned");
        }
        Ok(report)
    }

    /// Ask for a ball to be launched through `ndc` after the next tick.
    /// Returns `false` when a launch is already waiting.
    pub fn request_launch(&mut self, ndc: Vec2) -> bool {
        self.launch.request(ndc)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// `None` until the first tick has initialized the systems.
    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.ctx.physics.as_ref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.ctx.scene.as_ref()
    }

    pub fn frame_count(&self) -> u64 {
        self.ctx.frame.frame_count
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.schedule.system_names()
    }

    pub fn balls(&self) -> Vec<Entity> {
        self.world.query::<(&Ball,)>().map(|(entity, _)| entity).collect()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.world, &self.system_names(), self.physics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::InitState;
    use crate::demo::populate;

    const DT: f32 = 1.0 / 60.0;

    fn run(sim: &mut Simulation, frames: u32) {
        for _ in 0..frames {
            let elapsed = sim.ctx.frame.elapsed + DT as f64;
            sim.tick(DT, elapsed).unwrap();
        }
    }

    #[test]
    fn test_systems_run_in_registration_order() {
        let sim = Simulation::new(SimConfig::default(), Viewport::default()).unwrap();
        assert_eq!(
            sim.system_names(),
            vec!["RigidBodySystem", "SoftBodySystem", "BallSystem", "SimulationSystem"]
        );
        assert!(sim.physics().is_none());
    }

    #[test]
    fn test_demo_initializes_exactly_once() {
        let mut sim = Simulation::new(SimConfig::default(), Viewport::default()).unwrap();
        let config = sim.config().clone();
        let demo = populate(sim.world_mut(), &config);

        let report = sim.tick(DT, DT as f64).unwrap();
        assert_eq!(report.ran, 3);
        assert_eq!(report.dormant, 1);

        let physics = sim.physics().unwrap();
        assert_eq!(physics.rigid_body_count(), 2);
        assert_eq!(physics.soft_body_count(), 2);
        assert_eq!(sim.scene().unwrap().len(), 4);

        for entity in [demo.soft_cube, demo.soft_box] {
            assert_eq!(sim.world().get::<SoftBody>(entity).unwrap().state, InitState::Initialized);
        }

        run(&mut sim, 3);
        let physics = sim.physics().unwrap();
        assert_eq!(physics.rigid_body_count(), 2);
        assert_eq!(physics.soft_body_count(), 2);
        assert_eq!(sim.scene().unwrap().len(), 4);
        assert_eq!(sim.frame_count(), 4);
    }

    #[test]
    fn test_launch_spawns_one_ball_per_frame() {
        let mut sim = Simulation::new(SimConfig::default(), Viewport::new(800.0, 600.0)).unwrap();
        assert!(sim.request_launch(Vec2::ZERO));
        assert!(!sim.request_launch(Vec2::new(0.5, 0.5)));

        run(&mut sim, 1);
        let balls = sim.balls();
        assert_eq!(balls.len(), 1);
        let ball = balls[0];
        assert!(sim.world().get::<Ball>(ball).unwrap().state.is_pending());

        // Rigid body and ball initialize on the following frame.
        run(&mut sim, 1);
        assert_eq!(sim.world().get::<Ball>(ball).unwrap().state, InitState::Initialized);
        let direction = sim.world().get::<Ball>(ball).unwrap().velocity_direction;
        let expected = (sim.camera().target - sim.camera().position).normalize();
        assert!((direction - expected).length() < 1e-4);

        let handle = sim.world().get::<RigidBody>(ball).unwrap().body.unwrap();
        let velocity = sim.physics().unwrap().linear_velocity(handle).unwrap();
        // One fixed step of gravity has been applied since the launch.
        let launch = direction * 14.0;
        assert!((velocity - launch).length() < 0.5, "velocity {velocity}");
        assert_eq!(sim.physics().unwrap().friction(handle), Some(0.5));

        run(&mut sim, 1);
        assert_eq!(sim.balls().len(), 1);
    }

    #[test]
    fn test_ball_flies_along_the_ray() {
        let mut sim = Simulation::new(SimConfig::default(), Viewport::default()).unwrap();
        sim.request_launch(Vec2::ZERO);
        run(&mut sim, 1);
        let ball = sim.balls()[0];
        let start = sim.world().get::<RigidBody>(ball).unwrap().position;

        run(&mut sim, 10);
        let object = sim.world().get::<Object3D>(ball).unwrap().object.clone();
        let now = object.read().transform.position;
        let travelled = now - start;
        let direction = (sim.camera().target - sim.camera().position).normalize();
        assert!(travelled.dot(direction) > 1.0);
        // Gravity bends the path below the straight ray.
        assert!(travelled.normalize().y < direction.y);
    }

    #[test]
    fn test_snapshot_lists_systems_and_entities() {
        let mut sim = Simulation::new(SimConfig::default(), Viewport::default()).unwrap();
        let config = sim.config().clone();
        populate(sim.world_mut(), &config);
        run(&mut sim, 2);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.systems.len(), 4);
        assert_eq!(snapshot.entities.len(), 4);
        assert!((snapshot.elapsed_time.unwrap() - 2.0 * DT as f64).abs() < 1e-6);
        let cube = snapshot.entities[2].soft_body.as_ref().unwrap();
        assert_eq!(cube.nodes, Some(866));
    }
}
