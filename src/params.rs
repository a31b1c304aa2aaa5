//! Parameters for the reconstruction pipeline.

use crate::error::{PoissonError, PoissonResult};
use crate::Real;

/// Stopping criteria of the conjugate-gradient potential solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SolverParams {
    /// Maximum number of conjugate-gradient iterations. Default: 2000
    pub max_iterations: usize,

    /// Target relative residual `|b - Ax| / |b|`. Default: 1e-8
    pub tolerance: Real,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1.0e-8,
        }
    }
}

/// Parameters for Poisson surface reconstruction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ReconstructionParams {
    /// Number of empty cells added around the bounding box on every side, at least 2.
    /// Default: 8
    pub padding: usize,

    /// Sets the resolution together with `padding`: the largest side of the bounding box
    /// spans `base_cells + 2 * padding` cells. Default: 30
    pub base_cells: usize,

    /// Lower bound on the node count along each axis, at least 3. Default: 3
    pub min_dimension: usize,

    /// Conjugate-gradient stopping criteria.
    pub solver: SolverParams,

    /// Whether a solve that misses its tolerance aborts the reconstruction.
    /// When false the approximate potential is kept and the status is only reported.
    /// Default: false
    pub require_convergence: bool,
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self {
            padding: 8,
            base_cells: 30,
            min_dimension: 3,
            solver: SolverParams::default(),
            require_convergence: false,
        }
    }
}

impl ReconstructionParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the padding, in cells.
    #[must_use]
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the base resolution (see [`Self::base_cells`]).
    #[must_use]
    pub fn with_base_cells(mut self, base_cells: usize) -> Self {
        self.base_cells = base_cells;
        self
    }

    /// Sets the solver iteration cap and relative tolerance.
    #[must_use]
    pub fn with_solver(mut self, max_iterations: usize, tolerance: Real) -> Self {
        self.solver = SolverParams {
            max_iterations,
            tolerance,
        };
        self
    }

    /// Makes solver non-convergence a hard error.
    #[must_use]
    pub fn with_require_convergence(mut self, require: bool) -> Self {
        self.require_convergence = require;
        self
    }

    /// Number of cells spanning the largest side of the bounding box.
    pub fn cells_across_max_extent(&self) -> usize {
        self.base_cells + 2 * self.padding
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> PoissonResult<()> {
        let invalid = |reason: &str| {
            Err(PoissonError::InvalidParameter {
                reason: reason.to_string(),
            })
        };

        // The last node can fall up to two cells short of `padding` above the points.
        if self.padding < 2 {
            return invalid("padding must be at least 2");
        }
        // Staggered grids need two nodes along every axis.
        if self.min_dimension < 3 {
            return invalid("min_dimension must be at least 3");
        }
        if self.solver.max_iterations == 0 {
            return invalid("solver.max_iterations must be at least 1");
        }
        if !self.solver.tolerance.is_finite() || self.solver.tolerance <= 0.0 {
            return invalid("solver.tolerance must be finite and positive");
        }

        Ok(())
    }
}
