//! The demo scene: a ground slab, a ramp and two pressurized soft bodies.

use glam::{Quat, Vec3};
use squish_core::Color;
use squish_ecs::{Entity, World};
use squish_physics::CollisionShape;
use squish_render::{Material, Mesh, RenderObject};
use tracing::info;

use crate::components::{Object3D, RigidBody, SoftBody};
use crate::config::SimConfig;

/// Entities created by [`populate`].
#[derive(Debug, Clone, Copy)]
pub struct DemoScene {
    pub ground: Entity,
    pub ramp: Entity,
    pub soft_cube: Entity,
    pub soft_box: Entity,
}

/// Spawn the demo entities. Nothing is simulated until the next tick.
pub fn populate(world: &mut World, config: &SimConfig) -> DemoScene {
    let ground = create_box(
        world,
        Vec3::new(40.0, 1.0, 40.0),
        0.0,
        Vec3::new(0.0, -0.5, 0.0),
        Quat::IDENTITY,
        Material::new("ground", Color::WHITE),
        (false, true),
    );

    let ramp = create_box(
        world,
        Vec3::new(10.0, 1.0, 4.0),
        0.0,
        Vec3::new(3.0, 1.0, 0.0),
        Quat::from_rotation_z(30f32.to_radians()),
        Material::new("ramp", Color::from_hex(0x606060)),
        (true, true),
    );

    let skin = Material::new("skin", Color::from_hex(0xd9a38b));

    let mut cube = Mesh::cuboid(2.5, 2.5, 2.5, 12, 12, 12);
    cube.translate(Vec3::new(5.0, 5.0, 0.0));
    let soft_cube = create_soft_body(world, cube, 37.5, 750.0, config.margin, skin.clone());

    let mut column = Mesh::cuboid(1.25, 1.25, 6.25, 5, 5, 25);
    column.translate(Vec3::new(-2.0, 5.0, 0.0));
    let soft_box = create_soft_body(world, column, 18.75, 150.0, config.margin, skin);

    info!(entities = world.entity_count(), "demo scene populated");
    DemoScene {
        ground,
        ramp,
        soft_cube,
        soft_box,
    }
}

/// Spawn a box-shaped rigid body with a matching render mesh.
/// `shadows` is `(cast, receive)`.
pub fn create_box(
    world: &mut World,
    size: Vec3,
    mass: f32,
    position: Vec3,
    rotation: Quat,
    material: Material,
    shadows: (bool, bool),
) -> Entity {
    let mesh = Mesh::cuboid(size.x, size.y, size.z, 1, 1, 1);
    let name = material.name.clone();
    let object = RenderObject::new(name, mesh, material)
        .with_shadows(shadows.0, shadows.1)
        .into_shared();
    let shape = CollisionShape::cuboid(size.x, size.y, size.z);

    let entity = world.spawn();
    world.insert(entity, Object3D::new(object));
    world.insert(entity, RigidBody::new(mass, shape, position, rotation));
    entity
}

pub fn create_soft_body(
    world: &mut World,
    geometry: Mesh,
    mass: f32,
    pressure: f32,
    margin: f32,
    material: Material,
) -> Entity {
    let entity = world.spawn();
    world.insert(entity, SoftBody::new(geometry, material, mass, pressure, margin));
    entity
}
