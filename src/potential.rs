//! Least-squares recovery of the scalar potential.

use crate::conjugate_gradient::{solve_conjugate_gradient, SolveReport};
use crate::params::SolverParams;
use crate::Real;
use na::DVector;
use nalgebra_sparse::CscMatrix;

/// Finds the node values whose finite-difference gradient best matches `target`.
///
/// Solves the normal equations `G^T G g = G^T v` in the least-squares sense. The system
/// is only positive semi-definite (constant potentials have zero gradient); starting the
/// conjugate gradient from zero keeps the iterates orthogonal to the constants, so the
/// returned potential has zero mean up to the solver residual. No node is pinned.
pub fn solve_potential(
    gradient: &CscMatrix<Real>,
    target: &DVector<Real>,
    params: &SolverParams,
) -> (DVector<Real>, SolveReport) {
    debug_assert_eq!(
        gradient.nrows(),
        target.len(),
        "the target must have one value per staggered node"
    );

    let gradient_t = gradient.transpose();
    let lhs = &gradient_t * gradient;
    let rhs = &gradient_t * target;
    let mut potential = DVector::zeros(gradient.ncols());

    log::debug!(
        "solving potential: {} unknowns, {} non-zeros",
        lhs.nrows(),
        lhs.nnz()
    );

    let report = solve_conjugate_gradient(&lhs, &rhs, &mut potential, params);

    log::info!(
        "potential solve: {} iterations, relative residual {:.3e}",
        report.iterations,
        report.relative_residual
    );

    (potential, report)
}
