//! Error types for the reconstruction pipeline.

use crate::Real;
use thiserror::Error;

/// Result type for reconstruction operations.
pub type PoissonResult<T> = Result<T, PoissonError>;

/// Errors that can abort a reconstruction.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum PoissonError {
    /// No sample points were provided.
    #[error("point cloud is empty")]
    EmptyPointCloud,

    /// The number of normals differs from the number of points.
    #[error("exactly one normal per point is required, got {points} points and {normals} normals")]
    NormalCountMismatch {
        /// Number of sample points.
        points: usize,
        /// Number of normals.
        normals: usize,
    },

    /// A position or normal contains a NaN or infinite coordinate.
    #[error("sample {index} has a non-finite position or normal")]
    NonFiniteInput {
        /// Index of the offending sample.
        index: usize,
    },

    /// The bounding box of the points is too small to derive a grid spacing.
    #[error("degenerate point cloud: bounding box extent {max_extent} yields no valid grid spacing")]
    DegeneratePointCloud {
        /// Largest side of the bounding box of the input points.
        max_extent: Real,
    },

    /// A configuration value is out of range.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// The potential solve stopped before reaching its tolerance.
    #[error(
        "solver did not converge after {iterations} iterations (relative residual {relative_residual:e})"
    )]
    SolverDidNotConverge {
        /// Iterations performed.
        iterations: usize,
        /// Relative residual reached.
        relative_residual: Real,
    },
}
