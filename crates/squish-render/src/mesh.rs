//! Mesh generation utilities

use crate::vertex::Vertex3D;
use glam::Vec3;
use std::f32::consts::PI;
use thiserror::Error;

/// Mesh data that cannot be expanded into vertices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("mesh has {positions} positions but {normals} normals")]
    NormalCount { positions: usize, normals: usize },
    #[error("index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
}

/// Flat `[x, y, z, x, y, z, ...]` attribute buffer with an upload flag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexBuffer {
    data: Vec<f32>,
    needs_update: bool,
}

impl VertexBuffer {
    pub fn new(data: Vec<f32>) -> Self {
        Self {
            data,
            needs_update: true,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw write access. Does not flag the buffer; call [`Self::mark_dirty`]
    /// once the writes are done.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Number of floats.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of three-component items.
    pub fn count(&self) -> usize {
        self.data.len() / 3
    }

    /// The `item`-th triple, or `None` past the end of the buffer.
    pub fn get(&self, item: usize) -> Option<Vec3> {
        let i = item.checked_mul(3)?;
        self.data.get(i..i.checked_add(3)?).map(Vec3::from_slice)
    }

    pub fn mark_dirty(&mut self) {
        self.needs_update = true;
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Clear the upload flag, returning whether it was set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.needs_update)
    }
}

/// Generated mesh data
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub positions: VertexBuffer,
    pub normals: VertexBuffer,
    /// Triangle indices; `None` means the positions are a triangle soup.
    pub indices: Option<Vec<u32>>,
}

impl Mesh {
    pub fn new(positions: Vec<f32>, normals: Vec<f32>, indices: Option<Vec<u32>>) -> Self {
        Self {
            positions: VertexBuffer::new(positions),
            normals: VertexBuffer::new(normals),
            indices,
        }
    }

    /// Create an empty mesh
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), None)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.count()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    /// Generate a box centered on the origin. Every face gets its own grid of
    /// vertices, so corners and edges are duplicated across faces.
    pub fn cuboid(
        width: f32,
        height: f32,
        depth: f32,
        width_segments: u32,
        height_segments: u32,
        depth_segments: u32,
    ) -> Self {
        let (sx, sy, sz) = (
            width_segments.max(1),
            height_segments.max(1),
            depth_segments.max(1),
        );
        let mut builder = BoxBuilder::default();
        // +x, -x, +y, -y, +z, -z
        builder.plane([2, 1, 0], [-1.0, -1.0], [depth, height, width], [sz, sy]);
        builder.plane([2, 1, 0], [1.0, -1.0], [depth, height, -width], [sz, sy]);
        builder.plane([0, 2, 1], [1.0, 1.0], [width, depth, height], [sx, sz]);
        builder.plane([0, 2, 1], [1.0, -1.0], [width, depth, -height], [sx, sz]);
        builder.plane([0, 1, 2], [1.0, -1.0], [width, height, depth], [sx, sy]);
        builder.plane([0, 1, 2], [-1.0, -1.0], [width, height, -depth], [sx, sy]);

        Self::new(builder.positions, builder.normals, Some(builder.indices))
    }

    /// Generate a UV sphere mesh
    pub fn sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut indices = Vec::new();

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            let y = radius * phi.cos();
            let ring_radius = radius * phi.sin();

            for seg in 0..=segments {
                let theta = 2.0 * PI * seg as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                let normal = Vec3::new(x, y, z).normalize_or_zero();
                positions.extend_from_slice(&[x, y, z]);
                normals.extend_from_slice(&normal.to_array());
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.extend_from_slice(&[current, current + 1, next]);
                indices.extend_from_slice(&[current + 1, next + 1, next]);
            }
        }

        Self::new(positions, normals, Some(indices))
    }

    /// Move every vertex by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        for p in self.positions.as_mut_slice().chunks_exact_mut(3) {
            p[0] += offset.x;
            p[1] += offset.y;
            p[2] += offset.z;
        }
        self.positions.mark_dirty();
    }

    /// Check that every vertex has a normal and every index names a vertex.
    pub fn validate(&self) -> Result<(), MeshError> {
        let vertices = self.vertex_count();
        if self.normals.count() < vertices {
            return Err(MeshError::NormalCount {
                positions: vertices,
                normals: self.normals.count(),
            });
        }
        if let Some(&index) = self
            .indices
            .iter()
            .flatten()
            .find(|&&i| i as usize >= vertices)
        {
            return Err(MeshError::IndexOutOfRange { index, vertices });
        }
        Ok(())
    }

    /// Interleave positions and normals for upload, expanding the index
    /// buffer into a flat triangle list.
    pub fn interleaved(&self, color: [f32; 4]) -> Result<Vec<Vertex3D>, MeshError> {
        self.validate()?;
        let (positions, normals) = (self.positions.as_slice(), self.normals.as_slice());
        let vertex = |i: usize| {
            let at = |data: &[f32]| [data[i * 3], data[i * 3 + 1], data[i * 3 + 2]];
            Vertex3D::new(at(positions), at(normals), color)
        };
        Ok(match &self.indices {
            Some(indices) => indices.iter().map(|&i| vertex(i as usize)).collect(),
            None => (0..self.vertex_count()).map(vertex).collect(),
        })
    }
}

#[derive(Default)]
struct BoxBuilder {
    positions: Vec<f32>,
    normals: Vec<f32>,
    indices: Vec<u32>,
}

impl BoxBuilder {
    /// Emit one face. `axes` are (u, v, w): the two in-plane axes and the
    /// face axis. `size` is (u extent, v extent, signed w extent).
    fn plane(&mut self, axes: [usize; 3], dir: [f32; 2], size: [f32; 3], grid: [u32; 2]) {
        let [u, v, w] = axes;
        let [width, height, depth] = size;
        let [grid_x, grid_y] = grid;
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;
        let base = (self.positions.len() / 3) as u32;

        for iy in 0..=grid_y {
            let y = iy as f32 * segment_height - height / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - width / 2.0;

                let mut position = [0.0; 3];
                position[u] = x * dir[0];
                position[v] = y * dir[1];
                position[w] = depth / 2.0;
                self.positions.extend_from_slice(&position);

                let mut normal = [0.0; 3];
                normal[w] = if depth > 0.0 { 1.0 } else { -1.0 };
                self.normals.extend_from_slice(&normal);
            }
        }

        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = base + ix + row * iy;
                let b = base + ix + row * (iy + 1);
                let c = base + (ix + 1) + row * (iy + 1);
                let d = base + (ix + 1) + row * iy;

                self.indices.extend_from_slice(&[a, b, d]);
                self.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Signed volume enclosed by an indexed mesh.
    fn volume(mesh: &Mesh) -> f32 {
        let indices = mesh.indices.as_ref().unwrap();
        indices
            .chunks_exact(3)
            .map(|t| {
                let (a, b, c) = (
                    mesh.positions.get(t[0] as usize).unwrap(),
                    mesh.positions.get(t[1] as usize).unwrap(),
                    mesh.positions.get(t[2] as usize).unwrap(),
                );
                a.dot(b.cross(c))
            })
            .sum::<f32>()
            / 6.0
    }

    #[test]
    fn test_unit_box_has_per_face_vertices() {
        let mesh = Mesh::cuboid(1.0, 1.0, 1.0, 1, 1, 1);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.normals.count(), 24);
        for i in 0..mesh.vertex_count() {
            let p = mesh.positions.get(i).unwrap();
            assert_eq!(p.abs(), Vec3::splat(0.5));
        }
    }

    #[test]
    fn test_box_faces_wind_outward() {
        let mesh = Mesh::cuboid(2.0, 3.0, 4.0, 2, 3, 4);
        assert!((volume(&mesh) - 24.0).abs() < 1e-3);

        // Each normal points to the face the vertex lies on.
        for i in 0..mesh.vertex_count() {
            let p = mesh.positions.get(i).unwrap();
            let n = mesh.normals.get(i).unwrap();
            let half = Vec3::new(1.0, 1.5, 2.0);
            assert!(((p * n).abs().max_element() - (half * n.abs()).max_element()).abs() < 1e-5);
            assert!(p.dot(n) > 0.0);
        }
    }

    #[test]
    fn test_segmented_box_vertex_count() {
        let mesh = Mesh::cuboid(2.5, 2.5, 2.5, 12, 12, 12);
        assert_eq!(mesh.vertex_count(), 6 * 13 * 13);
        assert_eq!(mesh.triangle_count(), 6 * 12 * 12 * 2);
    }

    #[test]
    fn test_sphere_is_closed_and_outward() {
        let mesh = Mesh::sphere(0.4, 18, 16);
        assert_eq!(mesh.vertex_count(), 19 * 17);
        let exact = 4.0 / 3.0 * PI * 0.4f32.powi(3);
        let v = volume(&mesh);
        assert!(v > 0.0);
        assert!((v - exact).abs() / exact < 0.1);
    }

    #[test]
    fn test_translate_marks_positions_dirty() {
        let mut mesh = Mesh::cuboid(1.0, 1.0, 1.0, 1, 1, 1);
        assert!(mesh.positions.take_dirty());
        assert!(!mesh.positions.needs_update());

        mesh.translate(Vec3::new(5.0, 5.0, 0.0));
        assert!(mesh.positions.take_dirty());
        let p = mesh.positions.get(0).unwrap();
        assert!((p - Vec3::new(5.5, 5.5, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_interleaved_expands_indices() {
        let mesh = Mesh::cuboid(1.0, 1.0, 1.0, 1, 1, 1);
        let vertices = mesh.interleaved([1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(vertices.len(), 36);
        assert!(vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));

        let soup = Mesh::new(vec![0.0; 9], vec![0.0; 9], None);
        assert_eq!(soup.interleaved([1.0; 4]).unwrap().len(), 3);
    }

    #[test]
    fn test_out_of_range_reads_are_rejected() {
        let buffer = VertexBuffer::new(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.get(0), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(buffer.get(1), None);
        assert_eq!(buffer.get(usize::MAX), None);

        let short_normals = Mesh::new(vec![0.0; 9], vec![0.0; 6], None);
        assert_eq!(
            short_normals.interleaved([1.0; 4]),
            Err(MeshError::NormalCount {
                positions: 3,
                normals: 2
            })
        );

        let bad_index = Mesh::new(vec![0.0; 9], vec![0.0; 9], Some(vec![0, 1, 3]));
        assert_eq!(
            bad_index.interleaved([1.0; 4]),
            Err(MeshError::IndexOutOfRange {
                index: 3,
                vertices: 3
            })
        );
    }
}
