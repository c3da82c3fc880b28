use squish_ecs::EcsError;
use squish_physics::PhysicsError;
use thiserror::Error;

use crate::geometry::GeometryError;

/// Errors raised while ticking the simulation
#[derive(Debug, Error)]
pub enum SimError {
    /// A system needed a context singleton that was never created.
    #[error("missing singleton: {0}")]
    MissingSingleton(&'static str),

    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("ecs error: {0}")]
    Ecs(#[from] EcsError),

    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("invalid simulation config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to export world: {0}")]
    Export(#[from] serde_json::Error),
}
