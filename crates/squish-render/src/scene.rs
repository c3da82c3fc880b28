//! Scene graph of render objects

use std::sync::Arc;

use parking_lot::RwLock;
use squish_core::{Color, Transform};

use crate::mesh::{Mesh, MeshError};
use crate::vertex::Vertex3D;

/// Flat-colored surface description
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Color,
}

impl Material {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default", Color::WHITE)
    }
}

/// A mesh placed in the world
#[derive(Clone, Debug)]
pub struct RenderObject {
    pub name: String,
    pub transform: Transform,
    pub mesh: Mesh,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// Skip drawing when the bounds leave the view frustum
    pub frustum_culled: bool,
}

impl RenderObject {
    pub fn new(name: impl Into<String>, mesh: Mesh, material: Material) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh,
            material,
            cast_shadow: false,
            receive_shadow: false,
            frustum_culled: true,
        }
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    /// Triangle-list vertices tinted with the material color.
    pub fn vertices(&self) -> Result<Vec<Vertex3D>, MeshError> {
        self.mesh.interleaved(self.material.color.to_array())
    }

    pub fn model_matrix(&self) -> glam::Mat4 {
        self.transform.matrix()
    }

    pub fn into_shared(self) -> SharedObject {
        Arc::new(RwLock::new(self))
    }
}

/// Render object handle shared by the scene graph and the simulation
pub type SharedObject = Arc<RwLock<RenderObject>>;

/// Everything the renderer draws
#[derive(Debug)]
pub struct Scene {
    objects: Vec<SharedObject>,
    pub background: Color,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            objects: Vec::new(),
            background,
        }
    }

    /// Attach an object. Adding an object that is already attached is a no-op.
    pub fn add(&mut self, object: &SharedObject) {
        if !self.contains(object) {
            self.objects.push(Arc::clone(object));
        }
    }

    pub fn contains(&self, object: &SharedObject) -> bool {
        self.objects.iter().any(|o| Arc::ptr_eq(o, object))
    }

    pub fn objects(&self) -> &[SharedObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Color::from_hex(0xbfd1e5))
    }
}
