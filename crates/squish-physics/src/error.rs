use rapier3d::prelude::RigidBodyHandle;
use thiserror::Error;

use crate::soft_body::SoftBodyHandle;

#[derive(Debug, Error, PartialEq)]
pub enum PhysicsError {
    #[error("unknown rigid body {0:?}")]
    UnknownRigidBody(RigidBodyHandle),

    #[error("unknown soft body {0:?}")]
    UnknownSoftBody(SoftBodyHandle),

    #[error("soft body mesh has no triangles")]
    EmptyMesh,

    #[error("vertex array length {0} is not a multiple of 3")]
    VertexArrayLength(usize),

    #[error("index array length {0} is not a multiple of 3")]
    IndexArrayLength(usize),

    #[error("index {index} out of range for {nodes} nodes")]
    IndexOutOfRange { index: u32, nodes: usize },
}
