//! Systems run by the simulation schedule, in this order:
//! rigid bodies, soft bodies, balls, then the physics stepper.

mod ball;
mod rigid_body;
mod simulation;
mod soft_body;

pub use ball::BallSystem;
pub use rigid_body::RigidBodySystem;
pub use simulation::{sync_rigid_bodies, sync_soft_bodies, SimulationSystem};
pub use soft_body::SoftBodySystem;
