//! Isosurface extraction.

use crate::mesh::TriangleMesh;
use crate::Real;
use fnv::FnvHashMap;
use itertools::iproduct;
use na::{Point3, Vector3};

// Cube corners are numbered `dx + 2 * dy + 4 * dz`.
// Each cube is split into six tetrahedra sharing the diagonal 0-7. Every cube face is then
// cut along the diagonal through its lowest corner, so adjacent cubes agree on the split.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 1, 5, 7],
    [0, 2, 3, 7],
    [0, 2, 6, 7],
    [0, 4, 5, 7],
    [0, 4, 6, 7],
];

struct Extraction<'a> {
    field: &'a [Real],
    positions: &'a [Point3<Real>],
    edge_vertices: FnvHashMap<(usize, usize), usize>,
    mesh: TriangleMesh,
}

impl Extraction<'_> {
    // Nodes at exactly the isovalue count as outside.
    fn is_inside(&self, node: usize) -> bool {
        self.field[node] < 0.0
    }

    fn edge_vertex(&mut self, inside: usize, outside: usize) -> usize {
        let key = (inside.min(outside), inside.max(outside));

        if let Some(id) = self.edge_vertices.get(&key) {
            return *id;
        }

        let (va, vb) = (self.field[inside], self.field[outside]);
        let t = (-va / (vb - va)).clamp(0.0, 1.0);
        let (pa, pb) = (self.positions[inside], self.positions[outside]);
        let id = self.mesh.vertices.len();
        self.mesh.vertices.push(pa + (pb - pa) * t);
        self.edge_vertices.insert(key, id);
        id
    }

    fn push_triangle(&mut self, mut tri: [usize; 3], outward: &Vector3<Real>) {
        let [a, b, c] = tri.map(|id| self.mesh.vertices[id]);
        if (b - a).cross(&(c - a)).dot(outward) < 0.0 {
            tri.swap(1, 2);
        }
        self.mesh.triangles.push(tri);
    }

    fn march_tetrahedron(&mut self, nodes: [usize; 4]) {
        let (inside, outside): (Vec<usize>, Vec<usize>) =
            nodes.into_iter().partition(|node| self.is_inside(*node));

        if inside.is_empty() || outside.is_empty() {
            return;
        }

        let centroid = |ids: &[usize]| {
            ids.iter()
                .map(|id| self.positions[*id].coords)
                .sum::<Vector3<Real>>()
                / ids.len() as Real
        };
        let outward = centroid(&outside) - centroid(&inside);

        match inside.len() {
            1 => {
                let tri = [outside[0], outside[1], outside[2]]
                    .map(|other| self.edge_vertex(inside[0], other));
                self.push_triangle(tri, &outward);
            }
            3 => {
                let tri = [inside[0], inside[1], inside[2]]
                    .map(|other| self.edge_vertex(other, outside[0]));
                self.push_triangle(tri, &outward);
            }
            _ => {
                // The four crossed edges form the cycle a-c, a-d, b-d, b-c.
                let (a, b, c, d) = (inside[0], inside[1], outside[0], outside[1]);
                let ac = self.edge_vertex(a, c);
                let ad = self.edge_vertex(a, d);
                let bd = self.edge_vertex(b, d);
                let bc = self.edge_vertex(b, c);
                self.push_triangle([ac, ad, bd], &outward);
                self.push_triangle([ac, bd, bc], &outward);
            }
        }
    }
}

/// Extracts the zero level set of a scalar field sampled on a regular grid.
///
/// `field` and `node_positions` are indexed by `i + nx * (j + k * ny)`. Each grid cell is
/// split into six tetrahedra and the level set is linearly interpolated along their edges.
/// Vertices are shared between all the triangles crossing the same grid edge, so the
/// result is watertight wherever the level set does not touch the grid boundary.
/// Triangles face the direction of increasing field values.
pub fn extract_isosurface(
    field: &[Real],
    node_positions: &[Point3<Real>],
    dims: [usize; 3],
) -> TriangleMesh {
    let [nx, ny, nz] = dims;
    assert_eq!(field.len(), nx * ny * nz, "one field value per grid node expected");
    assert_eq!(
        node_positions.len(),
        field.len(),
        "one position per grid node expected"
    );

    let mut extraction = Extraction {
        field,
        positions: node_positions,
        edge_vertices: FnvHashMap::default(),
        mesh: TriangleMesh::new(),
    };

    if nx < 2 || ny < 2 || nz < 2 {
        return extraction.mesh;
    }

    let index = |i: usize, j: usize, k: usize| i + nx * (j + k * ny);

    for (k, j, i) in iproduct!(0..nz - 1, 0..ny - 1, 0..nx - 1) {
        let corners: [usize; 8] =
            std::array::from_fn(|c| index(i + (c & 1), j + ((c >> 1) & 1), k + (c >> 2)));
        let num_inside = corners.iter().filter(|c| extraction.is_inside(**c)).count();

        if num_inside == 0 || num_inside == 8 {
            continue;
        }

        for tet in TETRAHEDRA {
            extraction.march_tetrahedron(tet.map(|c| corners[c]));
        }
    }

    log::debug!(
        "marching tetrahedra: {} vertices, {} triangles",
        extraction.mesh.vertex_count(),
        extraction.mesh.triangle_count()
    );

    extraction.mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn sample(grid: &Grid, f: impl Fn(&Point3<Real>) -> Real) -> (Vec<Real>, Vec<Point3<Real>>) {
        let positions = grid.node_positions();
        (positions.iter().map(f).collect(), positions)
    }

    #[test]
    fn test_sphere_is_closed_and_outward() {
        let grid = Grid::new(Point3::new(-1.5, -1.5, -1.5), 0.1, [31, 31, 31]);
        let (field, positions) = sample(&grid, |p| p.coords.norm() - 1.0);
        let mesh = extract_isosurface(&field, &positions, grid.dims());

        assert!(mesh.vertex_count() > 0);
        assert!(mesh.is_closed());
        assert_relative_eq!(mesh.signed_volume(), 4.0 / 3.0 * PI, max_relative = 0.05);

        for v in &mesh.vertices {
            assert_relative_eq!(v.coords.norm(), 1.0, epsilon = 0.02);
        }
    }

    #[test]
    fn test_plane_vertices_lie_on_plane() {
        let grid = Grid::new(Point3::origin(), 0.25, [5, 6, 7]);
        let (field, positions) = sample(&grid, |p| p.z - 0.6);
        let mesh = extract_isosurface(&field, &positions, grid.dims());

        assert!(!mesh.is_empty());
        for v in &mesh.vertices {
            assert_relative_eq!(v.z, 0.6, epsilon = 1.0e-12);
        }
        for [a, b, c] in &mesh.triangles {
            let n = (mesh.vertices[*b] - mesh.vertices[*a])
                .cross(&(mesh.vertices[*c] - mesh.vertices[*a]));
            assert!(n.z > 0.0);
        }
        assert_relative_eq!(mesh.area(), 1.0 * 1.25, epsilon = 1.0e-9);
    }

    #[test]
    fn test_field_without_crossing_is_empty() {
        let grid = Grid::new(Point3::origin(), 1.0, [3, 3, 3]);
        let (field, positions) = sample(&grid, |_| 1.0);
        assert!(extract_isosurface(&field, &positions, grid.dims()).is_empty());

        let (field, positions) = sample(&grid, |_| -1.0);
        assert!(extract_isosurface(&field, &positions, grid.dims()).is_empty());
    }

    #[test]
    fn test_single_negative_node_gives_closed_blob() {
        let grid = Grid::new(Point3::origin(), 1.0, [3, 3, 3]);
        let center = grid.index(1, 1, 1);
        let (mut field, positions) = sample(&grid, |_| 1.0);
        field[center] = -1.0;
        let mesh = extract_isosurface(&field, &positions, grid.dims());

        assert!(mesh.is_closed());
        assert!(mesh.signed_volume() > 0.0);
        // One vertex per grid edge incident to the center node.
        assert_eq!(mesh.vertex_count(), 14);
    }
}
