//! Splatting of sample normals onto the staggered grids.

use crate::grid::Grid;
use crate::interpolate::trilinear_operator;
use crate::Real;
use na::{DVector, DVectorView, Point3, Vector3};

/// The sample normals splatted onto the three staggered grids.
///
/// This is the target the gradient of the potential is fitted to. Its entries follow the
/// row layout of [`crate::gradient::gradient_operator`]: the x-staggered block first, then
/// the y and z blocks.
pub struct PoissonVectorField {
    target: DVector<Real>,
    block_sizes: [usize; 3],
}

impl PoissonVectorField {
    /// Splats `normals`, given at `points`, onto the staggered grids of `grid`.
    pub fn new(grid: &Grid, points: &[Point3<Real>], normals: &[Vector3<Real>]) -> Self {
        assert_eq!(
            points.len(),
            normals.len(),
            "Exactly one normal per point must be provided."
        );

        let blocks = [0, 1, 2].map(|axis| splat_normal_component(grid, axis, points, normals));
        let block_sizes = blocks.each_ref().map(|block| block.len());
        let total = block_sizes.iter().sum();
        let target =
            DVector::from_iterator(total, blocks.iter().flat_map(|b| b.iter().copied()));

        debug_assert_eq!(total, grid.staggered_total());
        log::debug!(
            "splatted {} normals onto staggered grids of sizes {block_sizes:?}",
            points.len()
        );

        Self {
            target,
            block_sizes,
        }
    }

    /// The concatenated x, y, z staggered values.
    pub fn target(&self) -> &DVector<Real> {
        &self.target
    }

    /// Number of nodes of each staggered grid.
    pub fn block_sizes(&self) -> [usize; 3] {
        self.block_sizes
    }

    /// The values splatted on the grid staggered along `axis`.
    pub fn block(&self, axis: usize) -> DVectorView<'_, Real> {
        let offset = self.block_sizes[..axis].iter().sum();
        self.target.rows(offset, self.block_sizes[axis])
    }
}

/// Distributes the `axis` component of each normal onto the grid staggered along `axis`.
///
/// Computes `W^T n_axis`, where `W` samples the staggered grid at the points with
/// trilinear weights.
fn splat_normal_component(
    grid: &Grid,
    axis: usize,
    points: &[Point3<Real>],
    normals: &[Vector3<Real>],
) -> DVector<Real> {
    let staggered = grid.staggered(axis);
    let sampling = trilinear_operator(&staggered, points);
    let component = DVector::from_iterator(normals.len(), normals.iter().map(|n| n[axis]));

    &sampling.transpose() * &component
}
