//! Forward-difference gradient estimation.
//!
//! Used internally as a convenience for evaluator authors who do not
//! want to hand-derive `∂f/∂aⱼ`. The estimator takes a scalar-valued
//! function of the parameter vector (the sample point is captured by the
//! caller, e.g. as a closure argument) and writes the forward-difference
//! approximation of its gradient into a caller-supplied buffer.

/// Estimates `∂f/∂aⱼ` for `j in 0..a.len()` by forward differences,
/// using step `h = sqrt(EPSILON) * max(|aⱼ|, 1)`. Writes the estimate
/// into `deriv_out` and returns `f(a)`, for a total of `a.len() + 1`
/// calls to `f`.
pub fn forward_difference_gradient<F>(f: F, a: &[f64], deriv_out: &mut [f64]) -> f64
where
    F: Fn(&[f64]) -> f64,
{
    debug_assert_eq!(a.len(), deriv_out.len());
    let f0 = f(a);
    let mut a_perturbed = a.to_vec();
    for j in 0..a.len() {
        let h = f64::EPSILON.sqrt() * a[j].abs().max(1.0);
        a_perturbed[j] = a[j] + h;
        let f1 = f(&a_perturbed);
        a_perturbed[j] = a[j];
        deriv_out[j] = (f1 - f0) / h;
    }
    f0
}

/// Wraps a scalar model `model(x, a) -> y` over a 1-D domain, supplying
/// analytic-looking derivatives to the assembler via
/// [`forward_difference_gradient`]. Use this when hand-deriving
/// `∂f/∂aⱼ` is impractical; the [`Evaluator1D`](crate::Evaluator1D)
/// contract is satisfied without the caller writing any derivative code.
pub struct NumericalDiffEvaluator1D<M, I> {
    model: M,
    initial: I,
}

impl<M, I> NumericalDiffEvaluator1D<M, I>
where
    M: Fn(f64, &[f64]) -> f64,
    I: Fn() -> Vec<f64>,
{
    /// Creates a new numerical-derivative evaluator from a model closure
    /// and a closure that produces the initial parameter vector.
    pub fn new(model: M, initial: I) -> Self {
        Self { model, initial }
    }
}

impl<M, I> crate::Evaluator1D for NumericalDiffEvaluator1D<M, I>
where
    M: Fn(f64, &[f64]) -> f64,
    I: Fn() -> Vec<f64>,
{
    fn create_initial_parameters(&self) -> Vec<f64> {
        (self.initial)()
    }

    fn evaluate(
        &self,
        _i: usize,
        x: f64,
        a: &[f64],
        deriv_out: &mut [f64],
    ) -> Result<f64, crate::EvaluationFailure> {
        let value = forward_difference_gradient(|p| (self.model)(x, p), a, deriv_out);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(crate::EvaluationFailure)
        }
    }
}
