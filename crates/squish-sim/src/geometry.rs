//! Mapping between render geometry and soft-body nodes
//!
//! Render meshes duplicate vertices wherever faces meet (a box stores every
//! corner once per face) while the soft body needs one node per distinct
//! point. [`map_geometry`] welds the vertices and records, for each node,
//! every float offset in the original buffer that the node must write back to.

use std::collections::HashMap;

use glam::Vec3;
use thiserror::Error;

/// Per-axis tolerance for treating two positions as the same point.
pub const MERGE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("position array length {0} is not a multiple of 3")]
    PositionArrayLength(usize),

    #[error("index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
}

/// Welded geometry plus the node → render offset association
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMapping {
    /// Deduplicated `[x, y, z, ...]` positions, one triple per node
    pub vertices: Vec<f32>,
    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
    /// For node `j`, the offsets `i * 3` of every original vertex at its position
    pub association: Vec<Vec<usize>>,
}

impl NodeMapping {
    pub fn node_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn offsets(&self, node: usize) -> &[usize] {
        self.association.get(node).map_or(&[], Vec::as_slice)
    }
}

/// True when every component differs by less than `epsilon`.
pub fn points_equal(a: Vec3, b: Vec3, epsilon: f32) -> bool {
    (a - b).abs().cmplt(Vec3::splat(epsilon)).all()
}

/// Weld `positions` and build the node association.
///
/// `index` is honoured when present; without it the positions are read as a
/// triangle soup. Every original vertex, referenced or not, lands in exactly
/// one association bucket.
pub fn map_geometry(positions: &[f32], index: Option<&[u32]>) -> Result<NodeMapping, GeometryError> {
    if positions.len() % 3 != 0 {
        return Err(GeometryError::PositionArrayLength(positions.len()));
    }
    let count = positions.len() / 3;
    let point = |i: usize| Vec3::from_slice(&positions[i * 3..i * 3 + 3]);

    let mut welder = Welder::default();
    let remap: Vec<u32> = (0..count).map(|i| welder.weld(point(i))).collect();

    let indices = match index {
        Some(index) => index
            .iter()
            .map(|&i| {
                remap.get(i as usize).copied().ok_or(GeometryError::IndexOutOfRange {
                    index: i,
                    vertices: count,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => remap.clone(),
    };

    let vertices: Vec<f32> = welder.points.iter().flat_map(|p| p.to_array()).collect();

    let mut claimed = vec![false; count];
    let association = welder
        .points
        .iter()
        .map(|&node| {
            let mut offsets = Vec::new();
            for j in 0..count {
                if !claimed[j] && points_equal(node, point(j), MERGE_EPSILON) {
                    claimed[j] = true;
                    offsets.push(j * 3);
                }
            }
            offsets
        })
        .collect();

    Ok(NodeMapping {
        vertices,
        indices,
        association,
    })
}

/// Position welder backed by a uniform grid with `MERGE_EPSILON` cells.
#[derive(Default)]
struct Welder {
    points: Vec<Vec3>,
    cells: HashMap<[i64; 3], Vec<u32>>,
}

impl Welder {
    /// Index of the earliest welded point within epsilon of `p`, adding `p`
    /// as a new point when there is none.
    fn weld(&mut self, p: Vec3) -> u32 {
        let cell = Self::cell(p);
        let mut found: Option<u32> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];
                    let Some(bucket) = self.cells.get(&key) else {
                        continue;
                    };
                    for &candidate in bucket {
                        if points_equal(self.points[candidate as usize], p, MERGE_EPSILON)
                            && found.map_or(true, |f| candidate < f)
                        {
                            found = Some(candidate);
                        }
                    }
                }
            }
        }
        if let Some(existing) = found {
            return existing;
        }

        let id = self.points.len() as u32;
        self.points.push(p);
        self.cells.entry(cell).or_default().push(id);
        id
    }

    fn cell(p: Vec3) -> [i64; 3] {
        let scale = 1.0 / MERGE_EPSILON as f64;
        [
            (p.x as f64 * scale).floor() as i64,
            (p.y as f64 * scale).floor() as i64,
            (p.z as f64 * scale).floor() as i64,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squish_render::Mesh;

    fn node(mapping: &NodeMapping, j: usize) -> Vec3 {
        Vec3::from_slice(&mapping.vertices[j * 3..j * 3 + 3])
    }

    #[test]
    fn points_equal_is_per_axis() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        assert!(points_equal(a, a, MERGE_EPSILON));
        assert!(points_equal(a, a + Vec3::splat(5e-7), MERGE_EPSILON));
        assert!(!points_equal(a, a + Vec3::new(0.0, 0.0, 1e-3), MERGE_EPSILON));
    }

    #[test]
    fn unit_box_welds_to_eight_corners() {
        let mesh = Mesh::cuboid(1.0, 1.0, 1.0, 1, 1, 1);
        let mapping = map_geometry(mesh.positions.as_slice(), mesh.indices.as_deref()).unwrap();

        assert_eq!(mapping.node_count(), 8);
        assert_eq!(mapping.association.len(), 8);
        assert_eq!(mapping.indices.len(), 36);
        for offsets in &mapping.association {
            assert_eq!(offsets.len(), 3);
        }
    }

    #[test]
    fn segmented_cube_node_count() {
        let mesh = Mesh::cuboid(2.5, 2.5, 2.5, 12, 12, 12);
        let mapping = map_geometry(mesh.positions.as_slice(), mesh.indices.as_deref()).unwrap();

        // Surface points of a 13 × 13 × 13 lattice.
        assert_eq!(mapping.node_count(), 13 * 13 * 13 - 11 * 11 * 11);
        assert_eq!(mapping.indices.len(), mesh.indices.as_ref().unwrap().len());
    }

    #[test]
    fn every_offset_lands_in_exactly_one_bucket() {
        let mesh = Mesh::cuboid(1.25, 1.25, 6.25, 5, 5, 25);
        let mapping = map_geometry(mesh.positions.as_slice(), mesh.indices.as_deref()).unwrap();

        let mut seen = vec![0u32; mesh.vertex_count()];
        for (j, offsets) in mapping.association.iter().enumerate() {
            assert!(!offsets.is_empty());
            for &offset in offsets {
                assert_eq!(offset % 3, 0);
                seen[offset / 3] += 1;
                assert!(points_equal(node(&mapping, j), mesh.positions.get(offset / 3).unwrap(), MERGE_EPSILON));
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn welded_triangles_match_original_corners() {
        let mesh = Mesh::cuboid(2.0, 1.0, 3.0, 2, 2, 2);
        let original = mesh.indices.as_ref().unwrap();
        let mapping = map_geometry(mesh.positions.as_slice(), Some(original.as_slice())).unwrap();

        for (&welded, &source) in mapping.indices.iter().zip(original) {
            assert!(points_equal(
                node(&mapping, welded as usize),
                mesh.positions.get(source as usize).unwrap(),
                MERGE_EPSILON
            ));
        }
    }

    #[test]
    fn unique_vertices_get_singleton_lists() {
        let soup = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mapping = map_geometry(&soup, None).unwrap();

        assert_eq!(mapping.vertices, soup.to_vec());
        assert_eq!(mapping.indices, vec![0, 1, 2]);
        assert_eq!(mapping.association, vec![vec![0], vec![3], vec![6]]);
    }

    #[test]
    fn soup_shares_welded_corners() {
        // Two triangles of a quad, written out without an index buffer.
        let soup = [
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let mapping = map_geometry(&soup, None).unwrap();

        assert_eq!(mapping.node_count(), 4);
        assert_eq!(mapping.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mapping.offsets(0), &[0, 9]);
        assert_eq!(mapping.offsets(2), &[6, 12]);
        assert!(mapping.offsets(9).is_empty());
    }

    #[test]
    fn near_duplicates_within_epsilon_weld() {
        let positions = [0.0, 0.0, 0.0, 4e-7, -4e-7, 0.0, 0.5, 0.0, 0.0];
        let mapping = map_geometry(&positions, Some(&[0, 1, 2])).unwrap();

        assert_eq!(mapping.node_count(), 2);
        assert_eq!(mapping.indices, vec![0, 0, 1]);
        assert_eq!(mapping.association, vec![vec![0, 3], vec![6]]);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert_eq!(
            map_geometry(&[0.0; 4], None),
            Err(GeometryError::PositionArrayLength(4))
        );
        assert_eq!(
            map_geometry(&[0.0; 9], Some(&[0, 1, 7])),
            Err(GeometryError::IndexOutOfRange { index: 7, vertices: 3 })
        );
    }
}
