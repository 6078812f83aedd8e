//! Nonlinear least-squares curve fitting by the Levenberg–Marquardt
//! algorithm.
//!
//! Given a parametric model `y = f(x; a)` and observations
//! `(xᵢ, yᵢ, σᵢ)`, [`Fitter1D`] (scalar domain) and [`FitterND`] (vector
//! domain) estimate the parameter vector `a` that minimises the weighted
//! sum of squared residuals
//!
//! ```text
//! χ² = Σᵢ ((yᵢ − f(xᵢ; a)) / σᵢ)²
//! ```
//!
//! and report the parameter covariance matrix alongside it. Individual
//! parameters can be held fixed via [`Fitter1D::hold`]/[`FitterND::hold`]
//! and marginalised out of the normal equations.
//!
//! ```
//! use lmfit::{Evaluator1D, EvaluationFailure, Fitter1D};
//!
//! struct Line;
//! impl Evaluator1D for Line {
//!     fn create_initial_parameters(&self) -> Vec<f64> {
//!         vec![1.0, 1.0]
//!     }
//!     fn evaluate(
//!         &self,
//!         _i: usize,
//!         x: f64,
//!         a: &[f64],
//!         deriv_out: &mut [f64],
//!     ) -> Result<f64, EvaluationFailure> {
//!         deriv_out[0] = x;
//!         deriv_out[1] = 1.0;
//!         Ok(a[0] * x + a[1])
//!     }
//! }
//!
//! let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
//! let y: Vec<f64> = x.iter().map(|&xi| 2.0 * xi + 3.0).collect();
//!
//! let mut fitter = Fitter1D::new();
//! fitter.set_input_data_constant(&x, &y, 1.0).unwrap();
//! fitter.set_evaluator(Line);
//! fitter.fit().unwrap();
//! assert!((fitter.a()[0] - 2.0).abs() < 1e-6);
//! assert!((fitter.a()[1] - 3.0).abs() < 1e-6);
//! ```

mod covariance;
mod driver;
mod error;
mod evaluator;
mod fitter;
mod gradient;
mod linalg;
mod normal_equations;

#[cfg(test)]
mod testutil;

pub use driver::{FitConfig, FitOutcome};
pub use error::{FailureCause, FitError, FitResult};
pub use evaluator::{EvaluationFailure, Evaluator1D, EvaluatorND};
pub use fitter::{Fitter1D, FitterND};
pub use gradient::{forward_difference_gradient, NumericalDiffEvaluator1D};
