//! Squish Render - CPU-side render data
//!
//! Meshes keep positions and normals in flat, dirty-tracked buffers so that a
//! renderer only re-uploads what the simulation changed. Render objects are
//! shared between the scene graph and the simulation through
//! [`SharedObject`] handles.

pub mod mesh;
pub mod scene;
pub mod vertex;

pub use mesh::{Mesh, MeshError, VertexBuffer};
pub use scene::{Material, RenderObject, Scene, SharedObject};
pub use vertex::Vertex3D;
