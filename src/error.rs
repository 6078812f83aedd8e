//! Error types returned by the fitter.

use thiserror::Error;

/// A specialized `Result` type for fitting operations.
pub type FitResult<T> = Result<T, FitError>;

/// Errors that can occur while configuring or running a fit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// `fit()` was called before both input data and an evaluator were set.
    #[error("fitter is not ready: missing input data or evaluator")]
    NotReady,

    /// Sizes of `X`, `y`, `sigma` (or a setter's arguments) are inconsistent.
    #[error("dimension mismatch: {reason}")]
    DimensionMismatch {
        /// Human-readable description of which sizes disagreed.
        reason: String,
    },

    /// A numeric argument (`ndone`, `itmax`, `tol`, `sigma`) was non-positive.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Human-readable description of the offending argument.
        reason: String,
    },

    /// `mFree == 0`: every parameter is held at the start of `fit()`.
    #[error("all parameters are held; at least one must be free")]
    AllParametersHeld,

    /// The fit terminated in a failed state: the normal equations were
    /// singular, or the evaluator failed on every trial from the initial
    /// point. No result is available.
    #[error("fitting failed: {cause}")]
    FittingFailure {
        /// What caused the failure.
        cause: FailureCause,
    },
}

/// Why a fit terminated in the `Failed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The damped normal equations (or the final covariance inversion)
    /// could not be pivoted.
    SingularSystem,
    /// The evaluator reported a computational failure and no trial step
    /// from the initial point produced a finite result.
    EvaluationFailure,
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCause::SingularSystem => write!(f, "singular system"),
            FailureCause::EvaluationFailure => write!(f, "evaluator failure"),
        }
    }
}

impl FitError {
    pub(crate) fn dimension_mismatch(reason: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}
