//! Finite-difference gradient operator on staggered grids.

use crate::grid::Grid;
use crate::Real;
use itertools::iproduct;
use nalgebra_sparse::{CooMatrix, CscMatrix};

fn push_partial_derivative(
    coo: &mut CooMatrix<Real>,
    grid: &Grid,
    axis: usize,
    row_offset: usize,
) {
    let staggered = grid.staggered(axis);
    let [sx, sy, sz] = staggered.dims();
    let inv_h = 1.0 / grid.spacing();

    for (k, j, i) in iproduct!(0..sz, 0..sy, 0..sx) {
        let row = row_offset + staggered.index(i, j, k);
        let mut next = [i, j, k];
        next[axis] += 1;

        coo.push(row, grid.index(i, j, k), -inv_h);
        coo.push(row, grid.index(next[0], next[1], next[2]), inv_h);
    }
}

/// Builds the finite-difference gradient operator of `grid`.
///
/// Rows are the nodes of the x-, y- then z-staggered grids (see [`Grid::staggered`]),
/// columns are the nodes of `grid`. Row `r` of the block for `axis` is the forward
/// difference along `axis` between the two primary nodes enclosing staggered node `r`.
pub fn gradient_operator(grid: &Grid) -> CscMatrix<Real> {
    let mut coo = CooMatrix::new(grid.staggered_total(), grid.num_nodes());
    let mut row_offset = 0;

    for axis in 0..3 {
        push_partial_derivative(&mut coo, grid, axis, row_offset);
        row_offset += grid.staggered(axis).num_nodes();
    }

    debug_assert_eq!(row_offset, coo.nrows());
    CscMatrix::from(&coo)
}
