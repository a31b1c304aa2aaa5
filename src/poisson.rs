//! Poisson surface reconstruction pipeline.

use crate::conjugate_gradient::SolveReport;
use crate::error::{PoissonError, PoissonResult};
use crate::gradient::gradient_operator;
use crate::grid::Grid;
use crate::interpolate::{eval_trilinear, eval_trilinear_gradient, trilinear_operator};
use crate::marching_tetrahedra::extract_isosurface;
use crate::mesh::TriangleMesh;
use crate::params::ReconstructionParams;
use crate::poisson_vector_field::PoissonVectorField;
use crate::potential::solve_potential;
use crate::Real;
use itertools::multizip;
use na::{DVector, Point3, Vector3};
use parry::bounding_volume::Aabb;

/// An implicit surface reconstructed with the Poisson reconstruction algorithm on a
/// regular grid.
///
/// The implicit function is negative inside the surface, positive outside, and its zero
/// level set passes (on average) through the sample points.
#[derive(Clone, Debug)]
pub struct PoissonReconstruction {
    grid: Grid,
    potential: DVector<Real>,
    isovalue: Real,
    solve_report: SolveReport,
}

/// A reconstructed mesh along with the diagnostics of the solve that produced it.
#[derive(Clone, Debug)]
pub struct SurfaceReconstruction {
    /// The extracted triangle mesh.
    pub mesh: TriangleMesh,
    /// Status of the potential solve. A mesh built from a non-converged solve is only an
    /// approximation.
    pub solve: SolveReport,
    /// The mean of the raw potential at the sample points, subtracted from the field.
    pub isovalue: Real,
}

/// Reconstructs a triangle mesh from oriented samples in a single call.
///
/// See [`PoissonReconstruction::from_points_and_normals`] for the failure modes.
pub fn reconstruct_surface(
    points: &[Point3<Real>],
    normals: &[Vector3<Real>],
    params: &ReconstructionParams,
) -> PoissonResult<SurfaceReconstruction> {
    let poisson = PoissonReconstruction::from_points_and_normals(points, normals, params)?;
    let mesh = poisson.reconstruct_mesh();

    log::info!(
        "reconstructed {} vertices and {} triangles from {} samples",
        mesh.vertex_count(),
        mesh.triangle_count(),
        points.len()
    );

    Ok(SurfaceReconstruction {
        mesh,
        solve: poisson.solve_report,
        isovalue: poisson.isovalue,
    })
}

impl PoissonReconstruction {
    /// Reconstruct a surface using the Poisson reconstruction algorithm,
    /// given a set of sample points and normals at these points.
    ///
    /// # Parameters
    /// - `points`: the sample points.
    /// - `normals`: the unit outward normals at the sample points. Must have the same
    ///   length as `points`.
    /// - `params`: grid resolution and solver settings.
    ///
    /// # Errors
    /// Fails if the samples are empty, mismatched or non-finite, if the points are all
    /// (nearly) coincident, if `params` is invalid, or if the solve misses its tolerance
    /// while [`ReconstructionParams::require_convergence`] is set. Otherwise a non-converged
    /// solve only logs a warning; check [`Self::solve_report`].
    pub fn from_points_and_normals(
        points: &[Point3<Real>],
        normals: &[Vector3<Real>],
        params: &ReconstructionParams,
    ) -> PoissonResult<Self> {
        params.validate()?;
        validate_samples(points, normals)?;

        let grid = Grid::from_points(points, params)?;
        let vector_field = PoissonVectorField::new(&grid, points, normals);
        let gradient = gradient_operator(&grid);

        debug_assert_eq!(gradient.nrows(), vector_field.target().len());
        debug_assert_eq!(gradient.ncols(), grid.num_nodes());

        let (mut potential, solve_report) =
            solve_potential(&gradient, vector_field.target(), &params.solver);

        if !solve_report.converged {
            if params.require_convergence {
                return Err(PoissonError::SolverDidNotConverge {
                    iterations: solve_report.iterations,
                    relative_residual: solve_report.relative_residual,
                });
            }

            log::warn!(
                "potential solve stopped after {} iterations at relative residual {:.3e} \
                 (tolerance {:.3e}); the surface is approximate",
                solve_report.iterations,
                solve_report.relative_residual,
                params.solver.tolerance
            );
        }

        let isovalue = calibrate_isovalue(&grid, points, &mut potential);

        Ok(Self {
            grid,
            potential,
            isovalue,
            solve_report,
        })
    }

    /// The grid the implicit function is sampled on.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The calibrated implicit function values at the grid nodes.
    pub fn potential(&self) -> &DVector<Real> {
        &self.potential
    }

    /// The constant that was subtracted from the solved potential.
    pub fn isovalue(&self) -> Real {
        self.isovalue
    }

    /// Diagnostics of the potential solve.
    pub fn solve_report(&self) -> &SolveReport {
        &self.solve_report
    }

    /// The domain where the surface’s implicit function is defined.
    pub fn aabb(&self) -> Aabb {
        self.grid.aabb()
    }

    /// Evaluates the value of the implicit function at the given 3D point.
    ///
    /// In order to get a meaningful value, the point must be located inside of [`Self::aabb`].
    pub fn eval(&self, pt: &Point3<Real>) -> Real {
        eval_trilinear(&self.grid, self.potential.as_slice(), pt)
    }

    /// Evaluates the value of the implicit function’s gradient at the given 3D point.
    ///
    /// In order to get a meaningful value, the point must be located inside of [`Self::aabb`].
    pub fn eval_gradient(&self, pt: &Point3<Real>) -> Vector3<Real> {
        eval_trilinear_gradient(&self.grid, self.potential.as_slice(), pt)
    }

    /// Reconstructs a mesh from this implicit function, extracting the isosurface at 0.
    pub fn reconstruct_mesh(&self) -> TriangleMesh {
        extract_isosurface(
            self.potential.as_slice(),
            &self.grid.node_positions(),
            self.grid.dims(),
        )
    }
}

fn validate_samples(points: &[Point3<Real>], normals: &[Vector3<Real>]) -> PoissonResult<()> {
    if points.is_empty() {
        return Err(PoissonError::EmptyPointCloud);
    }

    if points.len() != normals.len() {
        return Err(PoissonError::NormalCountMismatch {
            points: points.len(),
            normals: normals.len(),
        });
    }

    let finite = |v: &Vector3<Real>| v.iter().all(|x| x.is_finite());
    match multizip((points, normals)).position(|(pt, n)| !finite(&pt.coords) || !finite(n)) {
        Some(index) => Err(PoissonError::NonFiniteInput { index }),
        None => Ok(()),
    }
}

/// Shifts `potential` so its average over the sample points is zero.
///
/// The potential is interpolated at `points` with trilinear weights on `grid`, and the mean
/// of these values is subtracted from every node. Returns the subtracted mean.
pub fn calibrate_isovalue(
    grid: &Grid,
    points: &[Point3<Real>],
    potential: &mut DVector<Real>,
) -> Real {
    let sampling = trilinear_operator(grid, points);
    let isovalue = (&sampling * &*potential).mean();
    potential.add_scalar_mut(-isovalue);

    log::debug!("isovalue: {isovalue:.6e}");
    isovalue
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Fibonacci-sphere samples of the sphere of the given radius centered at `center`.
    fn sphere_samples(
        n: usize,
        center: Point3<Real>,
        radius: Real,
    ) -> (Vec<Point3<Real>>, Vec<Vector3<Real>>) {
        let golden_angle = std::f64::consts::PI * (3.0 - (5.0 as Real).sqrt());
        let normals: Vec<_> = (0..n)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as Real + 0.5) / n as Real;
                let r = (1.0 - z * z).sqrt();
                let theta = golden_angle * i as Real;
                Vector3::new(r * theta.cos(), r * theta.sin(), z)
            })
            .collect();
        let points = normals.iter().map(|n| center + n * radius).collect();
        (points, normals)
    }

    fn coarse_params() -> ReconstructionParams {
        ReconstructionParams::new()
            .with_base_cells(12)
            .with_padding(4)
            .with_solver(1000, 1.0e-10)
    }

    #[test]
    fn test_calibrated_potential_has_zero_mean_at_samples() {
        let (points, normals) = sphere_samples(300, Point3::new(1.0, -2.0, 0.5), 0.8);
        let poisson =
            PoissonReconstruction::from_points_and_normals(&points, &normals, &coarse_params())
                .unwrap();

        let sampling = trilinear_operator(poisson.grid(), &points);
        let mean = (&sampling * poisson.potential()).mean();
        assert_relative_eq!(mean, 0.0, epsilon = 1.0e-10);

        let mean_eval = points.iter().map(|pt| poisson.eval(pt)).sum::<Real>() / 300.0;
        assert_relative_eq!(mean_eval, 0.0, epsilon = 1.0e-10);
    }

    #[test]
    fn test_field_is_negative_inside() {
        let center = Point3::new(1.0, -2.0, 0.5);
        let (points, normals) = sphere_samples(300, center, 0.8);
        let poisson =
            PoissonReconstruction::from_points_and_normals(&points, &normals, &coarse_params())
                .unwrap();

        assert!(poisson.solve_report().converged);
        assert!(poisson.eval(&center) < 0.0);
        let h = poisson.grid().spacing();
        assert!(poisson.eval(&(poisson.grid().corner() + Vector3::repeat(h))) > 0.0);
        assert!(poisson.aabb().contains_local_point(&center));

        // The gradient points outward on the surface.
        let pt = center + Vector3::x() * 0.8;
        assert!(poisson.eval_gradient(&pt).x > 0.0);
    }

    #[test]
    fn test_linear_system_shapes() {
        let (points, normals) = sphere_samples(50, Point3::origin(), 1.0);
        let params = coarse_params();
        let grid = Grid::from_points(&points, &params).unwrap();
        let field = PoissonVectorField::new(&grid, &points, &normals);
        let gradient = gradient_operator(&grid);

        assert_eq!(field.target().len(), gradient.nrows());
        assert_eq!(gradient.ncols(), grid.num_nodes());

        let poisson =
            PoissonReconstruction::from_points_and_normals(&points, &normals, &params).unwrap();
        assert_eq!(poisson.potential().len(), grid.num_nodes());
        assert_eq!(poisson.grid(), &grid);
    }

    #[test]
    fn test_calibrate_isovalue_shifts_constant_field() {
        let grid = Grid::new(Point3::origin(), 1.0, [3, 3, 3]);
        let mut potential = DVector::repeat(27, 4.5);
        let points = [Point3::new(0.5, 0.5, 0.5), Point3::new(1.2, 1.7, 0.3)];

        let isovalue = calibrate_isovalue(&grid, &points, &mut potential);

        assert_relative_eq!(isovalue, 4.5, epsilon = 1.0e-12);
        assert_relative_eq!(potential.amax(), 0.0, epsilon = 1.0e-12);
    }

    #[test]
    fn test_rejects_invalid_samples() {
        let params = ReconstructionParams::default();
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)];
        let normals = vec![Vector3::x(), Vector3::y()];

        assert_eq!(
            PoissonReconstruction::from_points_and_normals(&[], &[], &params).unwrap_err(),
            PoissonError::EmptyPointCloud
        );
        assert_eq!(
            PoissonReconstruction::from_points_and_normals(&points, &normals[..1], &params)
                .unwrap_err(),
            PoissonError::NormalCountMismatch {
                points: 2,
                normals: 1
            }
        );

        let mut bad_normals = normals.clone();
        bad_normals[1].z = Real::NAN;
        assert_eq!(
            PoissonReconstruction::from_points_and_normals(&points, &bad_normals, &params)
                .unwrap_err(),
            PoissonError::NonFiniteInput { index: 1 }
        );
    }

    #[test]
    fn test_rejects_coincident_points() {
        let points = vec![Point3::new(2.0, 2.0, 2.0); 20];
        let normals = vec![Vector3::z(); 20];
        let result = PoissonReconstruction::from_points_and_normals(
            &points,
            &normals,
            &ReconstructionParams::default(),
        );

        assert!(matches!(
            result,
            Err(PoissonError::DegeneratePointCloud { .. })
        ));
    }

    #[test]
    fn test_rejects_two_node_axis_on_flat_cloud() {
        let mut points = vec![];
        for i in 0..10 {
            for j in 0..10 {
                let z = if (i + j) % 2 == 0 { 0.0 } else { 0.02 };
                points.push(Point3::new(i as Real * 0.1, j as Real * 0.1, z));
            }
        }
        let normals = vec![Vector3::z(); points.len()];
        let mut params = ReconstructionParams::new().with_padding(0);
        params.min_dimension = 2;

        let result = PoissonReconstruction::from_points_and_normals(&points, &normals, &params);
        assert!(matches!(
            result,
            Err(PoissonError::InvalidParameter { .. })
        ));

        // Default padding and floor give every staggered grid two nodes per axis.
        let poisson = PoissonReconstruction::from_points_and_normals(
            &points,
            &normals,
            &ReconstructionParams::default(),
        )
        .unwrap();
        assert!(poisson.grid().dims().iter().all(|d| *d >= 3));
    }

    #[test]
    fn test_non_convergence() {
        let (points, normals) = sphere_samples(100, Point3::origin(), 1.0);

        let lenient = coarse_params().with_solver(2, 1.0e-12);
        let poisson =
            PoissonReconstruction::from_points_and_normals(&points, &normals, &lenient).unwrap();
        assert!(!poisson.solve_report().converged);
        assert_eq!(poisson.solve_report().iterations, 2);

        let strict = lenient.with_require_convergence(true);
        let result = PoissonReconstruction::from_points_and_normals(&points, &normals, &strict);
        assert!(matches!(
            result,
            Err(PoissonError::SolverDidNotConverge { iterations: 2, .. })
        ));
    }

    #[test]
    fn test_reconstruct_surface_reports_status() {
        let (points, normals) = sphere_samples(400, Point3::origin(), 1.0);
        let result = reconstruct_surface(&points, &normals, &coarse_params()).unwrap();

        assert!(result.solve.converged);
        assert!(result.mesh.vertex_count() > 0);
        assert!(result.mesh.is_closed());
        assert!(result.mesh.signed_volume() > 0.0);
    }
}
