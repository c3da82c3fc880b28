//! Squish Sim - entity systems for a rigid and soft body playground
//!
//! Entities declare rigid bodies, soft bodies and launched balls as
//! components. A fixed schedule of systems turns each declaration into a
//! physics body exactly once, steps the physics world every frame and copies
//! the results back onto the render objects.
//!
//! ```ignore
//! let mut sim = Simulation::new(SimConfig::default(), Viewport::default())?;
//! demo::populate(sim.world_mut(), &SimConfig::default());
//! sim.request_launch(Vec2::ZERO);
//! sim.tick(1.0 / 60.0, 1.0 / 60.0)?;
//! ```

pub mod components;
pub mod config;
pub mod context;
pub mod demo;
pub mod error;
pub mod geometry;
pub mod launcher;
pub mod simulation;
pub mod snapshot;
pub mod systems;

pub use components::{Ball, InitState, Object3D, RigidBody, SoftBody};
pub use config::{BallConfig, SimConfig, SoftBodyTuning};
pub use context::SimContext;
pub use error::SimError;
pub use geometry::{map_geometry, points_equal, GeometryError, NodeMapping, MERGE_EPSILON};
pub use launcher::{spawn_ball, Camera, LaunchLatch, Ray, Viewport};
pub use simulation::Simulation;
pub use snapshot::WorldSnapshot;
