//! Trilinear sampling operators between scattered points and grid nodes.

use crate::grid::Grid;
use crate::Real;
use na::{vector, Point3, Vector3};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

const CORNERS: [Vector3<usize>; 8] = [
    vector![0, 0, 0],
    vector![1, 0, 0],
    vector![1, 1, 0],
    vector![0, 1, 0],
    vector![0, 0, 1],
    vector![1, 0, 1],
    vector![1, 1, 1],
    vector![0, 1, 1],
];

fn trilinear_coefficients(bcoords: Vector3<Real>) -> [Real; 8] {
    CORNERS.map(|corner| {
        corner
            .zip_map(&bcoords, |v, b| if v == 0 { 1.0 - b } else { b })
            .product()
    })
}

// Partial derivatives of the trilinear coefficients wrt. the cell coordinates.
fn trilinear_coefficients_gradient(bcoords: Vector3<Real>) -> [Vector3<Real>; 8] {
    CORNERS.map(|corner| {
        let vals = corner.zip_map(&bcoords, |v, b| if v == 0 { 1.0 - b } else { b });
        let diffs = corner.map(|v| if v == 0 { -1.0 } else { 1.0 });
        Vector3::new(
            diffs.x * vals.y * vals.z,
            vals.x * diffs.y * vals.z,
            vals.x * vals.y * diffs.z,
        )
    })
}

/// The bottom-left node of the cell containing `pt` and the coordinates of `pt` inside it.
///
/// Points outside of the grid are snapped to its boundary cells.
fn locate(grid: &Grid, pt: &Point3<Real>) -> (Vector3<usize>, Vector3<Real>) {
    let dims = grid.dims();
    let coords = grid.cell_coords(pt);
    let mut ref_node = Vector3::zeros();
    let mut bcoords = Vector3::zeros();

    for axis in 0..3 {
        let last_cell = dims[axis].saturating_sub(2) as Real;
        let cell = coords[axis].floor().clamp(0.0, last_cell);
        ref_node[axis] = cell as usize;
        bcoords[axis] = (coords[axis] - cell).clamp(0.0, 1.0);
    }

    (ref_node, bcoords)
}

/// Builds the sparse trilinear sampling operator from `points` to the nodes of `grid`.
///
/// Row `p` holds the (at most 8) trilinear weights of `points[p]` wrt. the nodes of its
/// enclosing cell, at the columns given by [`Grid::index`]. Multiplying by a node-indexed
/// vector interpolates it at the points; multiplying the transpose by a point-indexed
/// vector splats it onto the grid. Zero weights are not stored.
pub fn trilinear_operator(grid: &Grid, points: &[Point3<Real>]) -> CsrMatrix<Real> {
    let mut coo = CooMatrix::new(points.len(), grid.num_nodes());

    for (pid, pt) in points.iter().enumerate() {
        let (ref_node, bcoords) = locate(grid, pt);
        let coeffs = trilinear_coefficients(bcoords);

        for (corner_shift, coeff) in CORNERS.iter().zip(coeffs.iter()) {
            if *coeff != 0.0 {
                let node = ref_node + corner_shift;
                coo.push(pid, grid.index(node.x, node.y, node.z), *coeff);
            }
        }
    }

    CsrMatrix::from(&coo)
}

/// Trilinear interpolation of the node-indexed `values` at `pt`.
pub fn eval_trilinear(grid: &Grid, values: &[Real], pt: &Point3<Real>) -> Real {
    debug_assert_eq!(values.len(), grid.num_nodes());
    let (ref_node, bcoords) = locate(grid, pt);
    let coeffs = trilinear_coefficients(bcoords);

    CORNERS
        .iter()
        .zip(coeffs.iter())
        .map(|(corner_shift, coeff)| {
            let node = ref_node + corner_shift;
            values[grid.index(node.x, node.y, node.z)] * *coeff
        })
        .sum()
}

/// Gradient of the trilinear interpolant of the node-indexed `values` at `pt`.
pub fn eval_trilinear_gradient(grid: &Grid, values: &[Real], pt: &Point3<Real>) -> Vector3<Real> {
    debug_assert_eq!(values.len(), grid.num_nodes());
    let (ref_node, bcoords) = locate(grid, pt);
    let coeffs = trilinear_coefficients_gradient(bcoords);
    let mut result = Vector3::zeros();

    for (corner_shift, coeff) in CORNERS.iter().zip(coeffs.iter()) {
        let node = ref_node + corner_shift;
        result += coeff * values[grid.index(node.x, node.y, node.z)];
    }

    result / grid.spacing()
}
