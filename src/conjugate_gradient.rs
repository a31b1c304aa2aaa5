//! Conjugate-gradient solver for symmetric positive semi-definite systems.

use crate::params::SolverParams;
use crate::Real;
use na::DVector;
use nalgebra_sparse::CscMatrix;

/// Outcome of an iterative solve.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SolveReport {
    /// Number of iterations performed.
    pub iterations: usize,
    /// Final residual norm relative to the right-hand side norm.
    pub relative_residual: Real,
    /// Whether `relative_residual` reached the requested tolerance.
    pub converged: bool,
}

/// Solves `a * x = b` with the conjugate gradient method, starting from the current `x`.
///
/// `a` must be symmetric positive semi-definite. When it is singular, `b` must lie in its
/// range; starting from a vector of that range (e.g. zero), the iterates stay in it and
/// approach the minimum-norm solution.
pub fn solve_conjugate_gradient(
    a: &CscMatrix<Real>,
    b: &DVector<Real>,
    x: &mut DVector<Real>,
    params: &SolverParams,
) -> SolveReport {
    let b_norm = b.norm();

    if b_norm == 0.0 {
        x.fill(0.0);
        return SolveReport {
            iterations: 0,
            relative_residual: 0.0,
            converged: true,
        };
    }

    let threshold = params.tolerance * b_norm;
    let mut r = b - a * &*x;
    let mut p = r.clone();
    let mut rr = r.dot(&r);
    let mut iterations = 0;

    while iterations < params.max_iterations && rr.sqrt() > threshold {
        let ap = a * &p;
        let pap = p.dot(&ap);

        if pap <= 0.0 {
            // `p` fell into the null space: nothing left to reduce.
            break;
        }

        let alpha = rr / pap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);
        let new_rr = r.dot(&r);
        let beta = new_rr / rr;
        rr = new_rr;
        p.axpy(1.0, &r, beta);
        iterations += 1;
    }

    let relative_residual = rr.sqrt() / b_norm;
    SolveReport {
        iterations,
        relative_residual,
        converged: relative_residual <= params.tolerance,
    }
}
