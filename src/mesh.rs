//! Indexed triangle mesh produced by the reconstruction.

use crate::Real;
use fnv::FnvHashMap;
use na::Point3;

/// A triangle mesh with 0-based vertex indices.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<Real>>,
    /// Counter-clockwise triangles (seen from outside), as indices into `vertices`.
    pub triangles: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The signed volume enclosed by the mesh; positive for outward-facing triangles.
    ///
    /// Only meaningful for closed meshes.
    pub fn signed_volume(&self) -> Real {
        self.triangles
            .iter()
            .map(|[a, b, c]| {
                let (a, b, c) = (&self.vertices[*a], &self.vertices[*b], &self.vertices[*c]);
                a.coords.dot(&b.coords.cross(&c.coords))
            })
            .sum::<Real>()
            / 6.0
    }

    /// The total area of the triangles.
    pub fn area(&self) -> Real {
        self.triangles
            .iter()
            .map(|[a, b, c]| {
                let (a, b, c) = (&self.vertices[*a], &self.vertices[*b], &self.vertices[*c]);
                (b - a).cross(&(c - a)).norm() / 2.0
            })
            .sum()
    }

    fn edge_valences(&self) -> FnvHashMap<(usize, usize), usize> {
        let mut valences = FnvHashMap::default();

        for tri in &self.triangles {
            for e in 0..3 {
                let (a, b) = (tri[e], tri[(e + 1) % 3]);
                *valences.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }

        valences
    }

    /// Number of edges used by exactly one triangle.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_valences().values().filter(|n| **n == 1).count()
    }

    /// Number of edges shared by more than two triangles.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_valences().values().filter(|n| **n > 2).count()
    }

    /// Whether every edge is shared by exactly two triangles.
    pub fn is_closed(&self) -> bool {
        !self.is_empty() && self.edge_valences().values().all(|n| *n == 2)
    }
}
