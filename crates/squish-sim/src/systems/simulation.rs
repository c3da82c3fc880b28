use squish_ecs::{System, World};
use squish_physics::{Node, PhysicsConfig, PhysicsWorld};
use squish_render::Mesh;
use tracing::{info, trace};

use crate::components::{Object3D, RigidBody, SoftBody};
use crate::context::SimContext;
use crate::error::SimError;

/// Owns the physics world: creates it on init, then steps it every frame and
/// copies the results back onto the render objects.
pub struct SimulationSystem {
    config: PhysicsConfig,
    max_substeps: u32,
}

impl SimulationSystem {
    pub fn new(config: PhysicsConfig, max_substeps: u32) -> Self {
        Self {
            config,
            max_substeps,
        }
    }
}

impl System<SimContext, SimError> for SimulationSystem {
    fn name(&self) -> &str {
        "SimulationSystem"
    }

    fn init(&mut self, _world: &mut World, ctx: &mut SimContext) -> Result<(), SimError> {
        ctx.physics = Some(PhysicsWorld::with_config(self.config.clone()));
        info!(max_substeps = self.max_substeps, "simulation ready");
        Ok(())
    }

    fn run(&mut self, world: &mut World, ctx: &mut SimContext) -> Result<(), SimError> {
        let delta = ctx.frame.delta;
        let physics = ctx.physics_mut()?;
        let steps = physics.step_simulation(delta, self.max_substeps);
        trace!(delta, steps, elapsed = physics.elapsed_time(), "stepped");

        sync_soft_bodies(world, physics);
        sync_rigid_bodies(world, physics);
        Ok(())
    }
}

/// Copy every soft body's node positions and normals into its render mesh.
pub fn sync_soft_bodies(world: &World, physics: &PhysicsWorld) {
    for (_, (soft,)) in world.query::<(&SoftBody,)>() {
        let (Some(handle), Some(mapping), Some(volume)) =
            (soft.body, soft.mapping.as_ref(), soft.volume.as_ref())
        else {
            continue;
        };
        let Some(body) = physics.soft_body(handle) else {
            continue;
        };
        write_nodes(body.nodes(), &mapping.association, &mut volume.write().mesh);
    }
}

fn write_nodes(nodes: &[Node], association: &[Vec<usize>], mesh: &mut Mesh) {
    let Mesh {
        positions, normals, ..
    } = mesh;
    let (position_data, normal_data) = (positions.as_mut_slice(), normals.as_mut_slice());

    for (node, offsets) in nodes.iter().zip(association) {
        for &offset in offsets {
            if let Some(dst) = position_data.get_mut(offset..offset + 3) {
                dst.copy_from_slice(&node.position.to_array());
            }
            if let Some(dst) = normal_data.get_mut(offset..offset + 3) {
                dst.copy_from_slice(&node.normal.to_array());
            }
        }
    }
    positions.mark_dirty();
    normals.mark_dirty();
}

/// Copy rigid body transforms onto their render objects. Bodies the physics
/// world does not know (yet) are left untouched.
pub fn sync_rigid_bodies(world: &World, physics: &PhysicsWorld) {
    for (entity, (rigid, object)) in world.query::<(&RigidBody, &Object3D)>() {
        let Some((position, rotation)) = rigid.body.and_then(|h| physics.rigid_body_transform(h)) else {
            trace!(?entity, "no motion state");
            continue;
        };
        object
            .object
            .write()
            .transform
            .set_position_rotation(position, rotation);
    }
}
