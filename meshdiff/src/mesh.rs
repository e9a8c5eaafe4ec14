//! Indexed triangle meshes exchanged between the pipeline stages.

use std::collections::HashMap;

use crate::geometry::Point3;

/// Triangle mesh made of a vertex array and triangles indexing into it.
///
/// Triangles are wound counter-clockwise when seen from outside the solid.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mesh {
    /// Vertices of the mesh.
    pub vertices: Vec<Point3>,
    /// Indices into `vertices` forming triangles.
    pub triangles: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Point3>, triangles: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Returns `true` if every triangle index refers to an existing vertex.
    pub fn indices_in_range(&self) -> bool {
        let n = self.vertices.len();
        self.triangles.iter().all(|t| t.iter().all(|&i| i < n))
    }

    /// Counts how many times each directed edge `(a, b)` is used by a
    /// triangle.
    fn directed_edges(&self) -> HashMap<(usize, usize), usize> {
        let mut edges = HashMap::new();
        for t in &self.triangles {
            for k in 0..3 {
                *edges.entry((t[k], t[(k + 1) % 3])).or_insert(0) += 1;
            }
        }
        edges
    }

    /// Directed edges that are not matched by exactly one opposite edge.
    ///
    /// An empty result means the mesh is closed, manifold and consistently
    /// oriented.
    pub fn unmatched_edges(&self) -> Vec<(usize, usize)> {
        let edges = self.directed_edges();
        let mut open: Vec<(usize, usize)> = edges
            .iter()
            .filter(|(&(a, b), &count)| count != 1 || edges.get(&(b, a)) != Some(&1))
            .map(|(&e, _)| e)
            .collect();
        open.sort_unstable();
        open
    }

    /// Returns `true` if the mesh is a closed, consistently wound solid.
    pub fn is_closed(&self) -> bool {
        !self.triangles.is_empty() && self.indices_in_range() && self.unmatched_edges().is_empty()
    }

    /// Signed volume enclosed by the mesh. Positive for outward winding.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let a = self.vertices[t[0]];
                let b = self.vertices[t[1]];
                let c = self.vertices[t[2]];
                (a.x * (b.y * c.z - b.z * c.y) - a.y * (b.x * c.z - b.z * c.x)
                    + a.z * (b.x * c.y - b.y * c.x))
                    / 6.0
            })
            .sum()
    }
}
