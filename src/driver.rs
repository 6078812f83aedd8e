//! The Levenberg–Marquardt control loop: damping schedule, trial-step
//! accept/reject, convergence counter, and the free/hold reduction and
//! re-expansion around the linear solve.

use nalgebra::{DMatrix, DVector};

use crate::error::{FailureCause, FitError, FitResult};
use crate::linalg::{gauss_jordan_invert, gauss_jordan_solve_vec};
use crate::normal_equations::{assemble, NormalEquations, Sampler};

/// Tunables for the LM loop (spec.md §4.1 defaults).
#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    /// Number of consecutive small-improvement accepts required to
    /// declare convergence.
    pub ndone: usize,
    /// Hard cap on the number of LM iterations.
    pub itmax: usize,
    /// Relative χ² improvement threshold below which a step counts
    /// toward `ndone`.
    pub tol: f64,
    /// Starting value of the damping scalar λ.
    pub initial_lambda: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            ndone: 4,
            itmax: 1000,
            tol: 1e-3,
            initial_lambda: 0.001,
        }
    }
}

/// How the fit terminated. Both variants carry a usable result; the
/// iteration cap is surfaced as an informational status rather than a
/// hard error, since the partial result is still self-consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// `done == ndone` was reached: the fit converged.
    Converged,
    /// `iter >= itmax` was reached before convergence.
    MaxIterationsReached,
}

/// The result of a completed `FitDriver` run, before any covariance
/// adjustment.
#[derive(Debug)]
pub(crate) struct DriverResult {
    pub a: Vec<f64>,
    pub alpha: DMatrix<f64>,
    pub covar: DMatrix<f64>,
    pub chisq: f64,
    pub mse: f64,
    pub outcome: FitOutcome,
}

fn free_indices(mfit: &[bool]) -> Vec<usize> {
    mfit.iter()
        .enumerate()
        .filter_map(|(k, &free)| free.then_some(k))
        .collect()
}

fn reduce_matrix(full: &DMatrix<f64>, free: &[usize]) -> DMatrix<f64> {
    let m_free = free.len();
    DMatrix::from_fn(m_free, m_free, |j, k| full[(free[j], free[k])])
}

fn reduce_vector(full: &DVector<f64>, free: &[usize]) -> DVector<f64> {
    DVector::from_fn(free.len(), |j, _| full[free[j]])
}

fn expand_delta(delta_free: &[f64], free: &[usize], m: usize) -> Vec<f64> {
    let mut delta = vec![0.0; m];
    for (j, &k) in free.iter().enumerate() {
        delta[k] = delta_free[j];
    }
    delta
}

fn expand_covariance(free_covar: &DMatrix<f64>, free: &[usize], m: usize) -> DMatrix<f64> {
    let mut full = DMatrix::<f64>::zeros(m, m);
    for (j, &rj) in free.iter().enumerate() {
        for (k, &rk) in free.iter().enumerate() {
            full[(rj, rk)] = free_covar[(j, k)];
        }
    }
    full
}

/// Runs the LM loop to completion (a terminal state), starting from
/// `initial_a`.
pub(crate) fn run(
    sampler: &dyn Sampler,
    m: usize,
    mfit: &[bool],
    initial_a: Vec<f64>,
    config: &FitConfig,
) -> FitResult<DriverResult> {
    let free = free_indices(mfit);
    if free.is_empty() {
        return Err(FitError::AllParametersHeld);
    }
    let m_free = free.len();
    let n = sampler.len();

    let mut a = initial_a;
    let mut lambda = config.initial_lambda;
    let mut done = 0usize;
    let mut iter = 0usize;

    let NormalEquations {
        alpha: mut alpha_cur,
        beta: mut beta_cur,
        chisq: mut chisq_cur,
    } = assemble(sampler, m, &a).map_err(|_| FitError::FittingFailure {
        cause: FailureCause::EvaluationFailure,
    })?;

    log::debug!(
        "lm fit start: n={n} m={m} m_free={m_free} chisq0={chisq_cur:.6e}"
    );

    loop {
        let alpha_free = reduce_matrix(&alpha_cur, &free);
        let beta_free = reduce_vector(&beta_cur, &free);

        let mut damped = alpha_free.clone();
        for j in 0..m_free {
            damped[(j, j)] *= 1.0 + lambda;
        }

        let delta_free = gauss_jordan_solve_vec(&damped, beta_free.as_slice()).map_err(|_| {
            FitError::FittingFailure {
                cause: FailureCause::SingularSystem,
            }
        })?;

        let delta = expand_delta(&delta_free, &free, m);
        let a_trial: Vec<f64> = a.iter().zip(&delta).map(|(x, d)| x + d).collect();

        let trial = assemble(sampler, m, &a_trial).ok();
        let accepted = match &trial {
            Some(eq) => eq.chisq.is_finite() && eq.chisq < chisq_cur,
            None => false,
        };

        iter += 1;

        if accepted {
            let eq = trial.unwrap();
            let improvement = chisq_cur - eq.chisq;
            if improvement < config.tol * chisq_cur {
                done += 1;
            } else {
                done = 0;
            }
            log::trace!(
                "iter={iter} accept lambda={lambda:.3e} chisq={chisq_cur:.6e}->{:.6e} done={done}",
                eq.chisq
            );
            a = a_trial;
            chisq_cur = eq.chisq;
            alpha_cur = eq.alpha;
            beta_cur = eq.beta;
            lambda /= 10.0;
        } else {
            lambda *= 10.0;
            log::trace!("iter={iter} reject lambda={lambda:.3e} chisq={chisq_cur:.6e}");
        }

        if done >= config.ndone {
            break;
        }
        if iter >= config.itmax {
            log::debug!("lm fit reached itmax={} without convergence", config.itmax);
            break;
        }
    }

    let outcome = if done >= config.ndone {
        FitOutcome::Converged
    } else {
        FitOutcome::MaxIterationsReached
    };

    // Finalise: one last assembly at the best `a` with λ = 0.
    let final_eq = assemble(sampler, m, &a).map_err(|_| FitError::FittingFailure {
        cause: FailureCause::EvaluationFailure,
    })?;
    let alpha_free_final = reduce_matrix(&final_eq.alpha, &free);
    let covar_free = gauss_jordan_invert(&alpha_free_final).map_err(|_| FitError::FittingFailure {
        cause: FailureCause::SingularSystem,
    })?;
    let covar = expand_covariance(&covar_free, &free, m);

    let dof = n as f64 - m_free as f64;
    let mse = final_eq.chisq / dof;

    log::debug!(
        "lm fit done: outcome={outcome:?} iter={iter} chisq={:.6e} mse={mse:.6e}",
        final_eq.chisq
    );

    Ok(DriverResult {
        a,
        alpha: final_eq.alpha,
        covar,
        chisq: final_eq.chisq,
        mse,
        outcome,
    })
}
