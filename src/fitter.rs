//! The public façade: `Fitter1D` and `FitterND`, the two shapes named in
//! spec.md §1. Each owns its inputs, configuration, and results; both
//! dispatch to the shared [`driver`](crate::driver) for the actual LM
//! iteration.

use nalgebra::DMatrix;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::covariance;
use crate::driver::{self, DriverResult, FitConfig, FitOutcome};
use crate::error::{FitError, FitResult};
use crate::evaluator::{EvaluationFailure, Evaluator1D, EvaluatorND};
use crate::normal_equations::Sampler;

/// Configuration shared by both fitter shapes; mirrors spec.md §4.1's
/// `ndone`, `itmax`, `tol`, `covariance_adjusted` knobs.
#[derive(Debug, Clone, Copy)]
struct Config {
    fit: FitConfig,
    covariance_adjusted: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fit: FitConfig::default(),
            covariance_adjusted: true,
        }
    }
}

/// Outcome of a completed fit, available through the accessors once
/// `result_available()` is true.
struct FitOutputs {
    a: Vec<f64>,
    alpha: DMatrix<f64>,
    covar: DMatrix<f64>,
    chisq: f64,
    mse: f64,
    outcome: FitOutcome,
    dof: f64,
}

fn validate_sigma(sigma: &[f64]) -> FitResult<()> {
    if sigma.iter().any(|&s| s.is_nan() || s <= 0.0) {
        return Err(FitError::invalid_argument(
            "all sigma entries must be strictly positive",
        ));
    }
    Ok(())
}

fn weights_from_sigma(sigma: &[f64]) -> Vec<f64> {
    sigma.iter().map(|&s| 1.0 / (s * s)).collect()
}

fn finalize(driver_result: DriverResult, n: usize, mfit: &[bool], covariance_adjusted: bool) -> FitOutputs {
    let m_free = mfit.iter().filter(|&&f| f).count();
    let mut covar = driver_result.covar;
    covariance::adjust(&mut covar, driver_result.mse, covariance_adjusted);
    FitOutputs {
        a: driver_result.a,
        alpha: driver_result.alpha,
        covar,
        chisq: driver_result.chisq,
        mse: driver_result.mse,
        outcome: driver_result.outcome,
        dof: n as f64 - m_free as f64,
    }
}

fn chisq_cdf(chisq: f64, dof: f64) -> f64 {
    if dof <= 0.0 {
        return f64::NAN;
    }
    match ChiSquared::new(dof) {
        Ok(dist) => dist.cdf(chisq),
        Err(_) => f64::NAN,
    }
}

macro_rules! shared_config_api {
    () => {
        /// Number of consecutive small-improvement accepts required to
        /// declare convergence. Default: 4.
        pub fn set_ndone(&mut self, ndone: usize) -> FitResult<()> {
            if ndone < 1 {
                return Err(FitError::invalid_argument("ndone must be >= 1"));
            }
            self.config.fit.ndone = ndone;
            Ok(())
        }

        /// Hard cap on the number of LM iterations. Default: 1000.
        pub fn set_itmax(&mut self, itmax: usize) -> FitResult<()> {
            if itmax < 1 {
                return Err(FitError::invalid_argument("itmax must be >= 1"));
            }
            self.config.fit.itmax = itmax;
            Ok(())
        }

        /// Relative χ² improvement threshold. Default: 1e-3.
        pub fn set_tol(&mut self, tol: f64) -> FitResult<()> {
            if tol.is_nan() || tol <= 0.0 {
                return Err(FitError::invalid_argument("tol must be > 0"));
            }
            self.config.fit.tol = tol;
            Ok(())
        }

        /// Toggles rescaling of the returned covariance by `mse`.
        /// Default: true.
        pub fn set_covariance_adjusted(&mut self, enabled: bool) {
            self.config.covariance_adjusted = enabled;
        }

        /// Holds parameter `k` at `value`: it is no longer updated by
        /// `fit()`, and its row/column of the returned covariance are
        /// zero.
        pub fn hold(&mut self, k: usize, value: f64) {
            self.a[k] = value;
            self.mfit[k] = false;
        }

        /// Marks parameter `k` as free again. Its current value is kept
        /// as the starting point for the next `fit()`.
        pub fn free(&mut self, k: usize) {
            self.mfit[k] = true;
        }

        /// True once both input data and an evaluator have been set.
        pub fn is_ready(&self) -> bool {
            self.ready
        }

        /// True once a fit has completed successfully.
        pub fn result_available(&self) -> bool {
            self.result.is_some()
        }

        /// Best-fit parameter vector.
        pub fn a(&self) -> &[f64] {
            &self.result.as_ref().expect("result not available").a
        }

        /// Full `m×m` parameter covariance matrix, expanded with zero
        /// rows/columns at held indices.
        pub fn covar(&self) -> &DMatrix<f64> {
            &self.result.as_ref().expect("result not available").covar
        }

        /// Curvature matrix `α` at the best-fit parameters.
        pub fn alpha(&self) -> &DMatrix<f64> {
            &self.result.as_ref().expect("result not available").alpha
        }

        /// Final χ².
        pub fn chisq(&self) -> f64 {
            self.result.as_ref().expect("result not available").chisq
        }

        /// `χ² / (n − mFree)`.
        pub fn mse(&self) -> f64 {
            self.result.as_ref().expect("result not available").mse
        }

        /// `ChiSqCDF(χ², n − mFree)`.
        pub fn p(&self) -> f64 {
            let r = self.result.as_ref().expect("result not available");
            chisq_cdf(r.chisq, r.dof)
        }

        /// `1 − p()`.
        pub fn q(&self) -> f64 {
            1.0 - self.p()
        }

        /// How the most recent fit terminated.
        pub fn outcome(&self) -> FitOutcome {
            self.result.as_ref().expect("result not available").outcome
        }
    };
}

/// Fitter over a scalar domain `x ∈ ℝ`.
pub struct Fitter1D<E: Evaluator1D> {
    x: Vec<f64>,
    y: Vec<f64>,
    weights: Vec<f64>,
    evaluator: Option<E>,
    a: Vec<f64>,
    mfit: Vec<bool>,
    config: Config,
    ready: bool,
    result: Option<FitOutputs>,
}

struct DataSampler1D<'a, E: Evaluator1D> {
    x: &'a [f64],
    y: &'a [f64],
    w: &'a [f64],
    evaluator: &'a E,
}

impl<'a, E: Evaluator1D> Sampler for DataSampler1D<'a, E> {
    fn len(&self) -> usize {
        self.x.len()
    }
    fn y(&self, i: usize) -> f64 {
        self.y[i]
    }
    fn weight(&self, i: usize) -> f64 {
        self.w[i]
    }
    fn evaluate(
        &self,
        i: usize,
        a: &[f64],
        deriv_out: &mut [f64],
    ) -> Result<f64, EvaluationFailure> {
        self.evaluator.evaluate(i, self.x[i], a, deriv_out)
    }
}

impl<E: Evaluator1D> Default for Fitter1D<E> {
    fn default() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            weights: Vec::new(),
            evaluator: None,
            a: Vec::new(),
            mfit: Vec::new(),
            config: Config::default(),
            ready: false,
            result: None,
        }
    }
}

impl<E: Evaluator1D> Fitter1D<E> {
    /// Creates an empty fitter; call [`set_input_data`](Self::set_input_data)
    /// and [`set_evaluator`](Self::set_evaluator) before `fit()`.
    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate_result(&mut self) {
        self.result = None;
    }

    /// Sets `(x, y, σ)`. All three must have equal length; every `σᵢ`
    /// must be strictly positive.
    pub fn set_input_data(&mut self, x: &[f64], y: &[f64], sigma: &[f64]) -> FitResult<()> {
        if x.len() != y.len() || x.len() != sigma.len() {
            return Err(FitError::dimension_mismatch(format!(
                "len(x)={}, len(y)={}, len(sigma)={} must agree",
                x.len(),
                y.len(),
                sigma.len()
            )));
        }
        validate_sigma(sigma)?;
        self.x = x.to_vec();
        self.y = y.to_vec();
        self.weights = weights_from_sigma(sigma);
        self.ready = self.evaluator.is_some();
        self.invalidate_result();
        Ok(())
    }

    /// Sets `(x, y)` with a constant `σ = s > 0` applied to every sample.
    pub fn set_input_data_constant(&mut self, x: &[f64], y: &[f64], s: f64) -> FitResult<()> {
        if x.len() != y.len() {
            return Err(FitError::dimension_mismatch(format!(
                "len(x)={}, len(y)={} must agree",
                x.len(),
                y.len()
            )));
        }
        if s.is_nan() || s <= 0.0 {
            return Err(FitError::invalid_argument("sigma must be > 0"));
        }
        let sigma = vec![s; x.len()];
        self.set_input_data(x, y, &sigma)
    }

    /// Sets the model evaluator and (re)initialises the parameter
    /// vector and mask from its `create_initial_parameters()`.
    pub fn set_evaluator(&mut self, evaluator: E) {
        let a = evaluator.create_initial_parameters();
        self.mfit = vec![true; a.len()];
        self.a = a;
        self.evaluator = Some(evaluator);
        self.ready = !self.x.is_empty();
        self.invalidate_result();
    }

    shared_config_api!();

    /// Runs the LM iteration to a terminal state.
    pub fn fit(&mut self) -> FitResult<FitOutcome> {
        if !self.ready {
            return Err(FitError::NotReady);
        }
        let evaluator = self.evaluator.as_ref().expect("is_ready implies evaluator is set");
        let m = self.a.len();
        let sampler = DataSampler1D {
            x: &self.x,
            y: &self.y,
            w: &self.weights,
            evaluator,
        };
        let driver_result = driver::run(&sampler, m, &self.mfit, self.a.clone(), &self.config.fit)?;
        let outcome = driver_result.outcome;
        self.result = Some(finalize(
            driver_result,
            self.x.len(),
            &self.mfit,
            self.config.covariance_adjusted,
        ));
        self.a = self.result.as_ref().unwrap().a.clone();
        Ok(outcome)
    }
}

/// Fitter over a `d`-dimensional domain `x ∈ ℝᵈ`, rows of a matrix `X`.
pub struct FitterND<E: EvaluatorND> {
    x: DMatrix<f64>,
    y: Vec<f64>,
    weights: Vec<f64>,
    evaluator: Option<E>,
    a: Vec<f64>,
    mfit: Vec<bool>,
    config: Config,
    ready: bool,
    result: Option<FitOutputs>,
}

struct DataSamplerND<'a, E: EvaluatorND> {
    x: &'a DMatrix<f64>,
    y: &'a [f64],
    w: &'a [f64],
    evaluator: &'a E,
}

impl<'a, E: EvaluatorND> Sampler for DataSamplerND<'a, E> {
    fn len(&self) -> usize {
        self.x.nrows()
    }
    fn y(&self, i: usize) -> f64 {
        self.y[i]
    }
    fn weight(&self, i: usize) -> f64 {
        self.w[i]
    }
    fn evaluate(
        &self,
        i: usize,
        a: &[f64],
        deriv_out: &mut [f64],
    ) -> Result<f64, EvaluationFailure> {
        let row: Vec<f64> = self.x.row(i).iter().copied().collect();
        self.evaluator.evaluate(i, &row, a, deriv_out)
    }
}

impl<E: EvaluatorND> Default for FitterND<E> {
    fn default() -> Self {
        Self {
            x: DMatrix::zeros(0, 0),
            y: Vec::new(),
            weights: Vec::new(),
            evaluator: None,
            a: Vec::new(),
            mfit: Vec::new(),
            config: Config::default(),
            ready: false,
            result: None,
        }
    }
}

impl<E: EvaluatorND> FitterND<E> {
    /// Creates an empty fitter; call [`set_input_data`](Self::set_input_data)
    /// and [`set_evaluator`](Self::set_evaluator) before `fit()`.
    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate_result(&mut self) {
        self.result = None;
    }

    /// Sets `(X, y, σ)`, where `X` is an `n×d` row-major table of sample
    /// coordinates. All must have `n` rows/entries; every `σᵢ` must be
    /// strictly positive.
    pub fn set_input_data(&mut self, x: &DMatrix<f64>, y: &[f64], sigma: &[f64]) -> FitResult<()> {
        if x.nrows() != y.len() || x.nrows() != sigma.len() {
            return Err(FitError::dimension_mismatch(format!(
                "rows(X)={}, len(y)={}, len(sigma)={} must agree",
                x.nrows(),
                y.len(),
                sigma.len()
            )));
        }
        validate_sigma(sigma)?;
        self.x = x.clone();
        self.y = y.to_vec();
        self.weights = weights_from_sigma(sigma);
        self.ready = self.evaluator.is_some();
        self.invalidate_result();
        Ok(())
    }

    /// Sets `(X, y)` with a constant `σ = s > 0` applied to every sample.
    pub fn set_input_data_constant(&mut self, x: &DMatrix<f64>, y: &[f64], s: f64) -> FitResult<()> {
        if x.nrows() != y.len() {
            return Err(FitError::dimension_mismatch(format!(
                "rows(X)={}, len(y)={} must agree",
                x.nrows(),
                y.len()
            )));
        }
        if s.is_nan() || s <= 0.0 {
            return Err(FitError::invalid_argument("sigma must be > 0"));
        }
        let sigma = vec![s; x.nrows()];
        self.set_input_data(x, y, &sigma)
    }

    /// Sets the model evaluator and (re)initialises the parameter
    /// vector and mask from its `create_initial_parameters()`.
    pub fn set_evaluator(&mut self, evaluator: E) {
        let a = evaluator.create_initial_parameters();
        self.mfit = vec![true; a.len()];
        self.a = a;
        self.evaluator = Some(evaluator);
        self.ready = self.x.nrows() > 0;
        self.invalidate_result();
    }

    shared_config_api!();

    /// Runs the LM iteration to a terminal state.
    pub fn fit(&mut self) -> FitResult<FitOutcome> {
        if !self.ready {
            return Err(FitError::NotReady);
        }
        let evaluator = self.evaluator.as_ref().expect("is_ready implies evaluator is set");
        let m = self.a.len();
        let sampler = DataSamplerND {
            x: &self.x,
            y: &self.y,
            w: &self.weights,
            evaluator,
        };
        let driver_result = driver::run(&sampler, m, &self.mfit, self.a.clone(), &self.config.fit)?;
        let outcome = driver_result.outcome;
        self.result = Some(finalize(
            driver_result,
            self.x.nrows(),
            &self.mfit,
            self.config.covariance_adjusted,
        ));
        self.a = self.result.as_ref().unwrap().a.clone();
        Ok(outcome)
    }
}
