//! Regular grids and their staggered counterparts.

use crate::error::{PoissonError, PoissonResult};
use crate::params::ReconstructionParams;
use crate::Real;
use itertools::iproduct;
use na::{Point3, Vector3};
use parry::bounding_volume::Aabb;

// Absorbs the rounding of `extent / h` so an exact cell count isn't truncated one short.
const CELL_COUNT_EPS: Real = 1.0e-9;

/// An axis-aligned regular lattice of `dims[0] x dims[1] x dims[2]` nodes.
///
/// Node `(i, j, k)` sits at `corner + spacing * (i, j, k)` and is stored at the linear
/// index `i + nx * (j + k * ny)`: x varies fastest, then y, then z. Every vector indexed
/// by grid nodes in this crate follows that ordering.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Grid {
    corner: Point3<Real>,
    spacing: Real,
    dims: [usize; 3],
}

impl Grid {
    /// Creates a grid from its corner, node spacing and per-axis node counts.
    pub fn new(corner: Point3<Real>, spacing: Real, dims: [usize; 3]) -> Self {
        debug_assert!(spacing > 0.0 && spacing.is_finite());
        debug_assert!(dims.iter().all(|d| *d >= 2), "at least 2 nodes per axis");
        Self {
            corner,
            spacing,
            dims,
        }
    }

    /// Builds the reconstruction grid enclosing `points`.
    ///
    /// The spacing is chosen so the largest side of the bounding box spans
    /// `params.base_cells + 2 * params.padding` cells, and the corner is moved
    /// `params.padding` cells below the bounding box on every axis. The node count along
    /// each axis is the truncated cell count of the padded box, floored at
    /// `params.min_dimension`.
    ///
    /// Fails with [`PoissonError::DegeneratePointCloud`] when the points are (nearly)
    /// coincident, since no finite positive spacing exists then, and with
    /// [`PoissonError::InvalidParameter`] when `params` is rejected by
    /// [`ReconstructionParams::validate`].
    pub fn from_points(
        points: &[Point3<Real>],
        params: &ReconstructionParams,
    ) -> PoissonResult<Self> {
        params.validate()?;

        if points.is_empty() {
            return Err(PoissonError::EmptyPointCloud);
        }

        let aabb = Aabb::from_points(points);
        let extents = aabb.extents();
        let max_extent = extents.max();
        let magnitude = aabb.mins.coords.abs().max().max(aabb.maxs.coords.abs().max());
        let spacing = max_extent / params.cells_across_max_extent() as Real;

        if !(spacing.is_finite() && spacing > 0.0)
            || max_extent <= Real::EPSILON * magnitude.max(1.0)
        {
            return Err(PoissonError::DegeneratePointCloud { max_extent });
        }

        let pad = params.padding as Real;
        let corner = aabb.mins - Vector3::repeat(pad * spacing);
        let dims = [0, 1, 2].map(|axis| {
            let cells = (extents[axis] + 2.0 * pad * spacing) / spacing;
            ((cells + CELL_COUNT_EPS).floor() as usize).max(params.min_dimension)
        });

        log::debug!(
            "grid: {}x{}x{} nodes, spacing {spacing:.6e}, corner {:?}",
            dims[0],
            dims[1],
            dims[2],
            corner.coords.as_slice()
        );

        Ok(Self::new(corner, spacing, dims))
    }

    /// The position of the node `(0, 0, 0)`.
    pub fn corner(&self) -> &Point3<Real> {
        &self.corner
    }

    /// The distance between two adjacent nodes.
    pub fn spacing(&self) -> Real {
        self.spacing
    }

    /// The node counts along x, y and z.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// The total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.dims.iter().product()
    }

    /// The position of the last node `(nx - 1, ny - 1, nz - 1)`.
    pub fn max_corner(&self) -> Point3<Real> {
        self.node_position(self.dims[0] - 1, self.dims[1] - 1, self.dims[2] - 1)
    }

    /// The box spanned by the nodes of this grid.
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.corner, self.max_corner())
    }

    /// Converts the subscript `(i, j, k)` to a linear node index.
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.dims[0] && j < self.dims[1] && k < self.dims[2]);
        i + self.dims[0] * (j + k * self.dims[1])
    }

    /// Converts a linear node index back to its subscript.
    pub fn subscript(&self, index: usize) -> [usize; 3] {
        let [nx, ny, _] = self.dims;
        [index % nx, (index / nx) % ny, index / (nx * ny)]
    }

    /// The position of the node `(i, j, k)`.
    #[inline]
    pub fn node_position(&self, i: usize, j: usize, k: usize) -> Point3<Real> {
        self.corner + Vector3::new(i as Real, j as Real, k as Real) * self.spacing
    }

    /// The positions of all nodes, ordered by linear index.
    pub fn node_positions(&self) -> Vec<Point3<Real>> {
        let [nx, ny, nz] = self.dims;
        iproduct!(0..nz, 0..ny, 0..nx)
            .map(|(k, j, i)| self.node_position(i, j, k))
            .collect()
    }

    /// The coordinates of `pt` in units of cells, relative to the corner.
    pub fn cell_coords(&self, pt: &Point3<Real>) -> Vector3<Real> {
        (pt - self.corner) / self.spacing
    }

    /// The face-centered grid holding derivatives along `axis`.
    ///
    /// It is shifted by half a cell along `axis` and has one node less along that axis.
    pub fn staggered(&self, axis: usize) -> Self {
        assert!(axis < 3, "axis must be 0, 1 or 2");
        let mut dims = self.dims;
        dims[axis] -= 1;
        let corner = self.corner + Vector3::ith(axis, self.spacing / 2.0);
        Self::new(corner, self.spacing, dims)
    }

    /// The node counts of the three staggered grids, in x, y, z order.
    pub fn staggered_sizes(&self) -> [usize; 3] {
        [0, 1, 2].map(|axis| self.staggered(axis).num_nodes())
    }

    /// The total node count of the three staggered grids.
    pub fn staggered_total(&self) -> usize {
        self.staggered_sizes().iter().sum()
    }
}
