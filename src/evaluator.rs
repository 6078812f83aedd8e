//! The caller-supplied model contract.
//!
//! An evaluator owns the model `f(x; a)` and, when asked, writes the
//! partial derivatives `∂f/∂aⱼ` into a scratch buffer supplied by the
//! assembler. The buffer is reused across samples; implementations must
//! not retain a reference to it beyond the call.

/// Signals that the evaluator could not produce a finite value at the
/// requested sample (e.g. the model is undefined there). The driver
/// treats this the same as a trial step whose χ² got worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationFailure;

/// A model over a scalar domain `x ∈ ℝ`.
pub trait Evaluator1D {
    /// Returns the initial parameter vector `a ∈ ℝᵐ`; its length fixes `m`.
    fn create_initial_parameters(&self) -> Vec<f64>;

    /// Evaluates `f(xᵢ; a)` for sample `i`, writing `∂f/∂aⱼ` into
    /// `deriv_out` (length `m`, freshly zeroed by the caller).
    fn evaluate(
        &self,
        i: usize,
        x: f64,
        a: &[f64],
        deriv_out: &mut [f64],
    ) -> Result<f64, EvaluationFailure>;
}

/// A model over a `d`-dimensional domain `x ∈ ℝᵈ`.
pub trait EvaluatorND {
    /// The dimensionality `d` of the domain.
    fn number_of_dimensions(&self) -> usize;

    /// Returns the initial parameter vector `a ∈ ℝᵐ`; its length fixes `m`.
    fn create_initial_parameters(&self) -> Vec<f64>;

    /// Evaluates `f(xᵢ; a)` for sample `i`, writing `∂f/∂aⱼ` into
    /// `deriv_out` (length `m`, freshly zeroed by the caller).
    fn evaluate(
        &self,
        i: usize,
        x: &[f64],
        a: &[f64],
        deriv_out: &mut [f64],
    ) -> Result<f64, EvaluationFailure>;
}
