/*!
Rust implementation of the classic Poisson surface reconstruction on a regular grid.

Oriented samples are splatted onto staggered finite-difference grids, the scalar potential
whose gradient best fits them is found by solving the normal equations with a conjugate
gradient, and the potential is shifted so its zero level set passes through the samples.
The surface is then extracted with marching tetrahedra.

```no_run
use nalgebra::{Point3, Vector3};
use poisson_grid::{reconstruct_surface, ReconstructionParams};

# let points: Vec<Point3<f64>> = vec![];
# let normals: Vec<Vector3<f64>> = vec![];
let result = reconstruct_surface(&points, &normals, &ReconstructionParams::default())?;

if !result.solve.converged {
    eprintln!("approximate surface: residual {}", result.solve.relative_residual);
}
println!("{} triangles", result.mesh.triangle_count());
# Ok::<(), poisson_grid::PoissonError>(())
```
*/

#![allow(clippy::type_complexity, clippy::too_many_arguments)]
#![warn(missing_docs)]

/// Floating-point type used by this library.
pub type Real = f64;

extern crate nalgebra as na;
extern crate parry3d_f64 as parry;

pub use self::conjugate_gradient::SolveReport;
pub use self::error::{PoissonError, PoissonResult};
pub use self::grid::Grid;
pub use self::mesh::TriangleMesh;
pub use self::params::{ReconstructionParams, SolverParams};
pub use self::poisson::{
    calibrate_isovalue, reconstruct_surface, PoissonReconstruction, SurfaceReconstruction,
};

mod conjugate_gradient;
mod error;
mod grid;
pub mod gradient;
pub mod interpolate;
pub mod marching_tetrahedra;
mod mesh;
mod params;
mod poisson;
pub mod poisson_vector_field;
pub mod potential;
