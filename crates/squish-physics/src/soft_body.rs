//! Deformable bodies simulated as a mass-spring node graph.
//!
//! Each soft body is built from a closed triangle mesh. Mesh edges become
//! links, the two vertices opposite each shared edge get a bending link, and
//! the enclosed volume feeds a pressure force that keeps the body inflated.
//! Stepping follows a predict / solve / correct cycle: forces are integrated
//! into velocities, link velocities are relaxed, positions are projected onto
//! link and collision constraints, and velocities are recovered from the
//! position change.

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;
use glam::Vec3;
use rapier3d::parry::query::PointQuery;
use rapier3d::prelude::{ColliderHandle, ColliderSet, RigidBodyHandle, RigidBodySet};

use crate::convert::{from_point, from_vector, to_point, to_vector};
use crate::error::PhysicsError;
use crate::ActivationState;

/// Node speed below which a body counts as resting.
const SLEEP_SPEED: f32 = 0.05;
/// Seconds a body must rest before it is put to sleep.
const TIME_TO_SLEEP: f32 = 2.0;
/// Extra distance past the margin at which a node still counts as touching.
const CONTACT_TOLERANCE: f32 = 1e-3;
const EPSILON: f32 = 1e-9;

/// Handle to a soft body owned by a [`crate::PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoftBodyHandle(pub(crate) usize);

impl SoftBodyHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

bitflags! {
    /// Which collision pairs a soft body takes part in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionFlags: u32 {
        /// Soft body nodes against rigid colliders.
        const SOFT_RIGID = 0x01;
        /// Soft body nodes against the nodes of other soft bodies.
        const SOFT_SOFT = 0x10;
    }
}

/// Solver parameters of a soft body.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftBodyConfig {
    /// Link velocity relaxation passes per step.
    pub velocity_iterations: u32,
    /// Link and collision projection passes per step (at least one is run).
    pub position_iterations: u32,
    /// Tangential velocity removed at rigid contacts, scaled by collider friction.
    pub dynamic_friction: f32,
    /// Fraction of node velocity removed each step.
    pub damping: f32,
    /// Pressure coefficient; zero disables the volume force.
    pub pressure: f32,
    pub collisions: CollisionFlags,
}

impl Default for SoftBodyConfig {
    fn default() -> Self {
        Self {
            velocity_iterations: 0,
            position_iterations: 1,
            dynamic_friction: 0.2,
            damping: 0.0,
            pressure: 0.0,
            collisions: CollisionFlags::SOFT_RIGID,
        }
    }
}

/// Stiffness coefficients in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftMaterial {
    /// Applied to edge links.
    pub linear_stiffness: f32,
    /// Applied to bending links.
    pub angular_stiffness: f32,
}

impl Default for SoftMaterial {
    fn default() -> Self {
        Self {
            linear_stiffness: 1.0,
            angular_stiffness: 1.0,
        }
    }
}

/// A simulated point of a soft body.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit normal averaged from the adjacent faces.
    pub normal: Vec3,
    /// One third of the area of the adjacent faces.
    pub area: f32,
    /// Zero pins the node in place.
    pub inverse_mass: f32,
    previous: Vec3,
    /// Area-weighted normal; sums to zero over a closed surface.
    area_normal: Vec3,
}

#[derive(Debug, Clone)]
struct Link {
    a: usize,
    b: usize,
    rest_length: f32,
    bending: bool,
}

#[derive(Debug, Clone, Copy)]
struct RigidContact {
    node: usize,
    collider: ColliderHandle,
    normal: Vec3,
}

/// Reaction of a node push on the dynamic body it was pushed out of.
#[derive(Debug, Clone, Copy)]
struct ContactImpulse {
    body: RigidBodyHandle,
    impulse: Vec3,
    point: Vec3,
}

#[derive(Debug, Clone)]
pub struct SoftBody {
    nodes: Vec<Node>,
    links: Vec<Link>,
    faces: Vec<[usize; 3]>,
    pub config: SoftBodyConfig,
    pub material: SoftMaterial,
    margin: f32,
    activation: ActivationState,
    sleep_timer: f32,
    contacts: Vec<RigidContact>,
}

impl SoftBody {
    /// Build a soft body from a flat `[x, y, z, ...]` vertex array and a
    /// triangle index buffer. Every node starts with unit mass.
    pub fn from_triangle_mesh(vertices: &[f32], indices: &[u32]) -> Result<Self, PhysicsError> {
        if vertices.len() % 3 != 0 {
            return Err(PhysicsError::VertexArrayLength(vertices.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(PhysicsError::IndexArrayLength(indices.len()));
        }
        if indices.is_empty() {
            return Err(PhysicsError::EmptyMesh);
        }
        let node_count = vertices.len() / 3;
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= node_count) {
            return Err(PhysicsError::IndexOutOfRange {
                index,
                nodes: node_count,
            });
        }

        let nodes: Vec<Node> = vertices
            .chunks_exact(3)
            .map(|p| {
                let position = Vec3::new(p[0], p[1], p[2]);
                Node {
                    position,
                    velocity: Vec3::ZERO,
                    normal: Vec3::ZERO,
                    area: 0.0,
                    inverse_mass: 1.0,
                    previous: position,
                    area_normal: Vec3::ZERO,
                }
            })
            .collect();
        let faces: Vec<[usize; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .collect();

        // Edge -> vertices opposite to it in the faces sharing it.
        let mut edges: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        let mut edge_order = Vec::new();
        for face in &faces {
            for k in 0..3 {
                let (a, b, opposite) = (face[k], face[(k + 1) % 3], face[(k + 2) % 3]);
                if a == b {
                    continue;
                }
                let key = (a.min(b), a.max(b));
                let entry = edges.entry(key).or_insert_with(|| {
                    edge_order.push(key);
                    Vec::new()
                });
                entry.push(opposite);
            }
        }

        let rest = |a: usize, b: usize| nodes[a].position.distance(nodes[b].position);
        let mut links: Vec<Link> = edge_order
            .iter()
            .map(|&(a, b)| Link {
                a,
                b,
                rest_length: rest(a, b),
                bending: false,
            })
            .collect();

        let mut bent = HashSet::new();
        for key in &edge_order {
            let opposite = &edges[key];
            if opposite.len() < 2 {
                continue;
            }
            let (c, d) = (opposite[0].min(opposite[1]), opposite[0].max(opposite[1]));
            if c == d || edges.contains_key(&(c, d)) || !bent.insert((c, d)) {
                continue;
            }
            links.push(Link {
                a: c,
                b: d,
                rest_length: rest(c, d),
                bending: true,
            });
        }

        let mut body = Self {
            nodes,
            links,
            faces,
            config: SoftBodyConfig::default(),
            material: SoftMaterial::default(),
            margin: 0.25,
            activation: ActivationState::Active,
            sleep_timer: 0.0,
            contacts: Vec::new(),
        };
        body.update_normals();
        Ok(body)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn bending_link_count(&self) -> usize {
        self.links.iter().filter(|l| l.bending).count()
    }

    /// Distribute `mass` over the nodes, uniformly or in proportion to node
    /// area when `from_faces` is set. A zero mass pins every node.
    pub fn set_total_mass(&mut self, mass: f32, from_faces: bool) {
        let weights: Vec<f32> = if from_faces {
            self.nodes.iter().map(|n| n.area).collect()
        } else {
            vec![1.0; self.nodes.len()]
        };
        let mut total: f32 = weights.iter().sum();
        let uniform = total <= EPSILON;
        if uniform {
            total = self.nodes.len() as f32;
        }
        for (node, weight) in self.nodes.iter_mut().zip(weights) {
            let share = if uniform { 1.0 } else { weight };
            let node_mass = mass.max(0.0) * share / total;
            node.inverse_mass = if node_mass > 0.0 { 1.0 / node_mass } else { 0.0 };
        }
    }

    pub fn total_mass(&self) -> f32 {
        self.nodes
            .iter()
            .filter(|n| n.inverse_mass > 0.0)
            .map(|n| 1.0 / n.inverse_mass)
            .sum()
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Distance nodes keep from rigid colliders and from other soft bodies.
    pub fn set_margin(&mut self, margin: f32) {
        self.margin = margin.max(0.0);
    }

    pub fn activation_state(&self) -> ActivationState {
        self.activation
    }

    pub fn set_activation_state(&mut self, state: ActivationState) {
        self.activation = state;
        self.sleep_timer = 0.0;
    }

    pub fn is_sleeping(&self) -> bool {
        self.activation == ActivationState::Sleeping
    }

    /// Signed enclosed volume; positive for outward-wound meshes.
    pub fn volume(&self) -> f32 {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let (pa, pb, pc) = (
                    self.nodes[a].position,
                    self.nodes[b].position,
                    self.nodes[c].position,
                );
                pa.dot(pb.cross(pc))
            })
            .sum::<f32>()
            / 6.0
    }

    pub fn centroid(&self) -> Vec3 {
        if self.nodes.is_empty() {
            return Vec3::ZERO;
        }
        self.nodes.iter().map(|n| n.position).sum::<Vec3>() / self.nodes.len() as f32
    }

    /// Axis-aligned bounds of the node positions as `(min, max)`.
    pub fn aabb(&self) -> (Vec3, Vec3) {
        self.nodes.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), n| (min.min(n.position), max.max(n.position)),
        )
    }

    fn update_normals(&mut self) {
        for node in &mut self.nodes {
            node.area_normal = Vec3::ZERO;
            node.area = 0.0;
        }
        for &[a, b, c] in &self.faces {
            let pa = self.nodes[a].position;
            // Twice the face area vector; each corner takes a third.
            let n = (self.nodes[b].position - pa).cross(self.nodes[c].position - pa);
            let area = n.length() / 6.0;
            for i in [a, b, c] {
                self.nodes[i].area_normal += n / 6.0;
                self.nodes[i].area += area;
            }
        }
        for node in &mut self.nodes {
            node.normal = node.area_normal.normalize_or_zero();
        }
    }

    fn link_stiffness(&self, link: &Link) -> f32 {
        let k = if link.bending {
            self.material.angular_stiffness
        } else {
            self.material.linear_stiffness
        };
        k.clamp(0.0, 1.0)
    }

    /// Advance the body by `dt` seconds.
    pub(crate) fn step(
        &mut self,
        dt: f32,
        gravity: Vec3,
        bodies: &mut RigidBodySet,
        colliders: &ColliderSet,
    ) {
        if dt <= 0.0 || self.nodes.is_empty() || self.is_sleeping() {
            return;
        }

        self.predict_motion(dt, gravity);

        let candidates = if self.config.collisions.contains(CollisionFlags::SOFT_RIGID) {
            self.candidate_colliders(colliders)
        } else {
            Vec::new()
        };

        if self.config.velocity_iterations > 0 {
            for _ in 0..self.config.velocity_iterations {
                self.solve_link_velocities();
            }
            for node in &mut self.nodes {
                node.position = node.previous + node.velocity * dt;
            }
        }

        self.contacts.clear();
        let inv_dt = 1.0 / dt;
        let mut shifts = HashMap::new();
        let mut impulses = Vec::new();
        let iterations = self.config.position_iterations.max(1);
        for i in 0..iterations {
            self.solve_link_positions();
            self.resolve_rigid_contacts(
                bodies,
                colliders,
                &candidates,
                inv_dt,
                &mut shifts,
                &mut impulses,
                i + 1 == iterations,
            );
        }

        for node in &mut self.nodes {
            node.velocity = (node.position - node.previous) * inv_dt;
        }
        for contact in &impulses {
            if let Some(body) = bodies.get_mut(contact.body) {
                body.apply_impulse_at_point(to_vector(contact.impulse), to_point(contact.point), true);
            }
        }
        self.apply_contact_friction(bodies, colliders);
        self.update_normals();
        self.update_sleep(dt);
    }

    fn predict_motion(&mut self, dt: f32, gravity: Vec3) {
        let pressure_scale = if self.config.pressure != 0.0 {
            let volume = self.volume().abs();
            if volume > EPSILON {
                self.config.pressure / volume
            } else {
                0.0
            }
        } else {
            0.0
        };
        let keep = 1.0 - self.config.damping.clamp(0.0, 1.0);

        for node in &mut self.nodes {
            node.previous = node.position;
            if node.inverse_mass <= 0.0 {
                node.velocity = Vec3::ZERO;
                continue;
            }
            let force = node.area_normal * pressure_scale;
            node.velocity += (gravity + force * node.inverse_mass) * dt;
            node.velocity *= keep;
            node.position += node.velocity * dt;
        }
    }

    fn candidate_colliders(&self, colliders: &ColliderSet) -> Vec<ColliderHandle> {
        let (min, max) = self.aabb();
        let (min, max) = (min - Vec3::splat(self.margin), max + Vec3::splat(self.margin));
        colliders
            .iter()
            .filter(|(_, collider)| {
                let aabb = collider.compute_aabb();
                let (cmin, cmax) = (from_point(&aabb.mins), from_point(&aabb.maxs));
                cmin.cmple(max).all() && cmax.cmpge(min).all()
            })
            .map(|(handle, _)| handle)
            .collect()
    }

    fn solve_link_velocities(&mut self) {
        for i in 0..self.links.len() {
            let link = &self.links[i];
            let (a, b) = (link.a, link.b);
            let k = self.link_stiffness(link);
            let (na, nb) = (&self.nodes[a], &self.nodes[b]);
            let w = na.inverse_mass + nb.inverse_mass;
            if w <= 0.0 {
                continue;
            }
            let dir = (nb.position - na.position).normalize_or_zero();
            let relative = (nb.velocity - na.velocity).dot(dir);
            let j = -relative * k / w;
            let (ima, imb) = (na.inverse_mass, nb.inverse_mass);
            self.nodes[a].velocity -= dir * (j * ima);
            self.nodes[b].velocity += dir * (j * imb);
        }
    }

    fn solve_link_positions(&mut self) {
        for i in 0..self.links.len() {
            let link = &self.links[i];
            let (a, b, rest) = (link.a, link.b, link.rest_length);
            let k = self.link_stiffness(link);
            let (na, nb) = (&self.nodes[a], &self.nodes[b]);
            let w = na.inverse_mass + nb.inverse_mass;
            if w <= 0.0 {
                continue;
            }
            let delta = nb.position - na.position;
            let length = delta.length();
            if length < EPSILON {
                continue;
            }
            let correction = delta * ((length - rest) * k / (w * length));
            let (ima, imb) = (na.inverse_mass, nb.inverse_mass);
            self.nodes[a].position += correction * ima;
            self.nodes[b].position -= correction * imb;
        }
    }

    /// Project nodes out of nearby colliders.
    ///
    /// Against a dynamic body the correction is split by inverse mass: the
    /// node takes its share and the body's share is recorded in `shifts`
    /// (moving the collider for later iterations) and as an impulse in
    /// `impulses`, so the momentum a node gains is taken from the body.
    #[allow(clippy::too_many_arguments)]
    fn resolve_rigid_contacts(
        &mut self,
        bodies: &RigidBodySet,
        colliders: &ColliderSet,
        candidates: &[ColliderHandle],
        inv_dt: f32,
        shifts: &mut HashMap<RigidBodyHandle, Vec3>,
        impulses: &mut Vec<ContactImpulse>,
        record: bool,
    ) {
        let margin = self.margin;
        for &handle in candidates {
            let Some(collider) = colliders.get(handle) else {
                continue;
            };
            let dynamic = collider.parent().and_then(|h| {
                let body = bodies.get(h)?;
                (body.is_dynamic() && body.mass() > 0.0).then(|| (h, 1.0 / body.mass()))
            });
            let aabb = collider.compute_aabb();
            let reach = Vec3::splat(margin + CONTACT_TOLERANCE);
            let (cmin, cmax) = (from_point(&aabb.mins) - reach, from_point(&aabb.maxs) + reach);

            for (index, node) in self.nodes.iter_mut().enumerate() {
                if node.inverse_mass <= 0.0 {
                    continue;
                }
                let shift = dynamic
                    .and_then(|(body, _)| shifts.get(&body).copied())
                    .unwrap_or(Vec3::ZERO);
                let local = node.position - shift;
                if !(local.cmpge(cmin).all() && local.cmple(cmax).all()) {
                    continue;
                }
                let projection =
                    collider
                        .shape()
                        .project_point(collider.position(), &to_point(local), false);
                let surface = from_point(&projection.point) + shift;
                let offset = node.position - surface;
                let distance = offset.length();
                if distance < EPSILON {
                    continue;
                }
                let (normal, depth) = if projection.is_inside {
                    (-offset / distance, -distance)
                } else {
                    (offset / distance, distance)
                };
                if depth < margin {
                    let correction = margin - depth;
                    match dynamic {
                        Some((body, body_inverse_mass)) => {
                            let w = node.inverse_mass + body_inverse_mass;
                            node.position += normal * (correction * node.inverse_mass / w);
                            *shifts.entry(body).or_insert(Vec3::ZERO) -=
                                normal * (correction * body_inverse_mass / w);
                            impulses.push(ContactImpulse {
                                body,
                                impulse: -normal * (correction / w * inv_dt),
                                point: surface,
                            });
                        }
                        None => node.position = surface + normal * margin,
                    }
                }
                if record && depth <= margin + CONTACT_TOLERANCE {
                    self.contacts.push(RigidContact {
                        node: index,
                        collider: handle,
                        normal,
                    });
                }
            }
        }
    }

    /// Remove approaching and part of the sliding velocity at rigid contacts,
    /// pushing the difference back onto dynamic bodies as an impulse.
    fn apply_contact_friction(&mut self, bodies: &mut RigidBodySet, colliders: &ColliderSet) {
        for contact in &self.contacts {
            let Some(collider) = colliders.get(contact.collider) else {
                continue;
            };
            let node = &mut self.nodes[contact.node];
            let point = to_point(node.position);
            let parent = collider.parent();
            let body_velocity = parent
                .and_then(|h| bodies.get(h))
                .map(|b| from_vector(&b.velocity_at_point(&point)))
                .unwrap_or(Vec3::ZERO);

            let relative = node.velocity - body_velocity;
            let normal_speed = relative.dot(contact.normal);
            let tangential = relative - contact.normal * normal_speed;
            let friction = (self.config.dynamic_friction * collider.friction()).clamp(0.0, 1.0);
            let corrected =
                contact.normal * normal_speed.max(0.0) + tangential * (1.0 - friction);
            let delta_v = corrected - relative;
            node.velocity += delta_v;

            if node.inverse_mass > 0.0 {
                if let Some(body) = parent.and_then(|h| bodies.get_mut(h)) {
                    if body.is_dynamic() {
                        let impulse = -delta_v / node.inverse_mass;
                        body.apply_impulse_at_point(to_vector(impulse), point, true);
                    }
                }
            }
        }
    }

    fn update_sleep(&mut self, dt: f32) {
        if self.activation == ActivationState::DisableDeactivation {
            return;
        }
        let fastest = self
            .nodes
            .iter()
            .map(|n| n.velocity.length_squared())
            .fold(0.0, f32::max);
        if fastest < SLEEP_SPEED * SLEEP_SPEED {
            self.sleep_timer += dt;
            if self.sleep_timer >= TIME_TO_SLEEP {
                self.activation = ActivationState::Sleeping;
                for node in &mut self.nodes {
                    node.velocity = Vec3::ZERO;
                }
            }
        } else {
            self.sleep_timer = 0.0;
        }
    }

    pub fn wake_up(&mut self) {
        if self.activation == ActivationState::Sleeping {
            self.activation = ActivationState::Active;
        }
        self.sleep_timer = 0.0;
    }
}

/// Push overlapping nodes of two soft bodies apart and cancel their
/// approaching velocity. The contact distance is the sum of both margins.
pub(crate) fn collide_soft_pair(first: &mut SoftBody, second: &mut SoftBody) {
    let reach = first.margin + second.margin;
    if reach <= 0.0 {
        return;
    }
    let (amin, amax) = first.aabb();
    let (bmin, bmax) = second.aabb();
    let pad = Vec3::splat(reach);
    if !((amin - pad).cmple(bmax).all() && (amax + pad).cmpge(bmin).all()) {
        return;
    }

    let mut touched = false;
    for a in first.nodes.iter_mut() {
        if !((a.position + pad).cmpge(bmin).all() && (a.position - pad).cmple(bmax).all()) {
            continue;
        }
        for b in second.nodes.iter_mut() {
            let w = a.inverse_mass + b.inverse_mass;
            if w <= 0.0 {
                continue;
            }
            let delta = a.position - b.position;
            let distance_sq = delta.length_squared();
            if distance_sq >= reach * reach || distance_sq < EPSILON {
                continue;
            }
            let distance = distance_sq.sqrt();
            let normal = delta / distance;
            let push = normal * ((reach - distance) / w);
            a.position += push * a.inverse_mass;
            b.position -= push * b.inverse_mass;

            let approach = (a.velocity - b.velocity).dot(normal);
            if approach < 0.0 {
                let j = -approach / w;
                a.velocity += normal * (j * a.inverse_mass);
                b.velocity -= normal * (j * b.inverse_mass);
            }
            touched = true;
        }
    }
    if touched {
        first.wake_up();
        second.wake_up();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit cube corners with outward-wound faces.
    fn cube(size: f32, offset: Vec3) -> (Vec<f32>, Vec<u32>) {
        let h = size * 0.5;
        let corners = [
            [-h, -h, -h],
            [h, -h, -h],
            [h, h, -h],
            [-h, h, -h],
            [-h, -h, h],
            [h, -h, h],
            [h, h, h],
            [-h, h, h],
        ];
        let vertices = corners
            .iter()
            .flat_map(|c| [c[0] + offset.x, c[1] + offset.y, c[2] + offset.z])
            .collect();
        let indices = vec![
            0, 3, 2, 0, 2, 1, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 7, 6, 3, 6, 2, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        (vertices, indices)
    }

    fn empty_sets() -> (RigidBodySet, ColliderSet) {
        (RigidBodySet::new(), ColliderSet::new())
    }

    #[test]
    fn test_rejects_malformed_meshes() {
        assert_eq!(
            SoftBody::from_triangle_mesh(&[0.0; 4], &[0, 0, 0]).unwrap_err(),
            PhysicsError::VertexArrayLength(4)
        );
        assert_eq!(
            SoftBody::from_triangle_mesh(&[0.0; 9], &[0, 1]).unwrap_err(),
            PhysicsError::IndexArrayLength(2)
        );
        assert_eq!(
            SoftBody::from_triangle_mesh(&[0.0; 9], &[]).unwrap_err(),
            PhysicsError::EmptyMesh
        );
        assert_eq!(
            SoftBody::from_triangle_mesh(&[0.0; 9], &[0, 1, 3]).unwrap_err(),
            PhysicsError::IndexOutOfRange { index: 3, nodes: 3 }
        );
    }

    #[test]
    fn test_cube_topology() {
        let (vertices, indices) = cube(1.0, Vec3::ZERO);
        let body = SoftBody::from_triangle_mesh(&vertices, &indices).unwrap();
        assert_eq!(body.node_count(), 8);
        assert_eq!(body.face_count(), 12);
        // 12 box edges plus one diagonal per face.
        assert_eq!(body.link_count() - body.bending_link_count(), 18);
        assert!(body.bending_link_count() > 0);
        assert!((body.volume() - 1.0).abs() < 1e-5);
        for node in body.nodes() {
            // Normals point away from the center.
            assert!(node.normal.dot(node.position) > 0.0);
        }
    }

    #[test]
    fn test_total_mass_is_distributed() {
        let (vertices, indices) = cube(1.0, Vec3::ZERO);
        let mut body = SoftBody::from_triangle_mesh(&vertices, &indices).unwrap();
        body.set_total_mass(4.0, false);
        assert!((body.total_mass() - 4.0).abs() < 1e-4);
        assert!(body.nodes().iter().all(|n| (n.inverse_mass - 2.0).abs() < 1e-5));

        body.set_total_mass(4.0, true);
        assert!((body.total_mass() - 4.0).abs() < 1e-4);

        body.set_total_mass(0.0, false);
        assert!(body.nodes().iter().all(|n| n.inverse_mass == 0.0));
    }

    #[test]
    fn test_falls_under_gravity() {
        let (vertices, indices) = cube(1.0, Vec3::new(0.0, 10.0, 0.0));
        let mut body = SoftBody::from_triangle_mesh(&vertices, &indices).unwrap();
        body.set_activation_state(ActivationState::DisableDeactivation);
        let (mut bodies, colliders) = empty_sets();

        let start = body.centroid();
        for _ in 0..30 {
            body.step(1.0 / 60.0, Vec3::new(0.0, -9.8, 0.0), &mut bodies, &colliders);
        }
        let end = body.centroid();
        assert!(end.y < start.y - 0.5);
        assert!((end.x - start.x).abs() < 1e-3);
        // Links keep the shape together while falling.
        assert!((body.volume() - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_pinned_nodes_stay_put() {
        let (vertices, indices) = cube(1.0, Vec3::ZERO);
        let mut body = SoftBody::from_triangle_mesh(&vertices, &indices).unwrap();
        body.set_total_mass(0.0, false);
        let (mut bodies, colliders) = empty_sets();
        let before: Vec<Vec3> = body.nodes().iter().map(|n| n.position).collect();
        body.step(1.0 / 60.0, Vec3::new(0.0, -9.8, 0.0), &mut bodies, &colliders);
        let after: Vec<Vec3> = body.nodes().iter().map(|n| n.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_resting_body_falls_asleep() {
        let (vertices, indices) = cube(1.0, Vec3::ZERO);
        let mut body = SoftBody::from_triangle_mesh(&vertices, &indices).unwrap();
        let (mut bodies, colliders) = empty_sets();
        for _ in 0..150 {
            body.step(1.0 / 60.0, Vec3::ZERO, &mut bodies, &colliders);
        }
        assert!(body.is_sleeping());

        body.wake_up();
        assert_eq!(body.activation_state(), ActivationState::Active);
    }

    #[test]
    fn test_disabled_deactivation_never_sleeps() {
        let (vertices, indices) = cube(1.0, Vec3::ZERO);
        let mut body = SoftBody::from_triangle_mesh(&vertices, &indices).unwrap();
        body.set_activation_state(ActivationState::DisableDeactivation);
        let (mut bodies, colliders) = empty_sets();
        for _ in 0..300 {
            body.step(1.0 / 60.0, Vec3::ZERO, &mut bodies, &colliders);
        }
        assert!(!body.is_sleeping());
    }

    #[test]
    fn test_overlapping_soft_bodies_separate() {
        let (va, ia) = cube(1.0, Vec3::ZERO);
        let (vb, ib) = cube(1.0, Vec3::new(1.05, 0.0, 0.0));
        let mut first = SoftBody::from_triangle_mesh(&va, &ia).unwrap();
        let mut second = SoftBody::from_triangle_mesh(&vb, &ib).unwrap();
        first.set_margin(0.1);
        second.set_margin(0.1);

        collide_soft_pair(&mut first, &mut second);

        for a in first.nodes() {
            for b in second.nodes() {
                assert!(a.position.distance(b.position) >= 0.2 - 1e-4);
            }
        }
    }

    #[test]
    fn test_collision_flags_combine() {
        let flags = CollisionFlags::SOFT_SOFT | CollisionFlags::SOFT_RIGID;
        assert_eq!(flags.bits(), 0x11);
        assert!(flags.contains(CollisionFlags::SOFT_RIGID));
        assert!(!CollisionFlags::SOFT_RIGID.contains(CollisionFlags::SOFT_SOFT));
        assert_eq!(CollisionFlags::from_bits(0x11), Some(flags));
        assert!(CollisionFlags::empty().is_empty());
    }
}
