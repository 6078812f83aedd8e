//! Assembly of the normal equations `α = Jᵀ W J`, `β = Jᵀ W r` from
//! per-sample evaluator callbacks.

use nalgebra::{DMatrix, DVector};

use crate::evaluator::EvaluationFailure;

/// An internal view over an observation set plus evaluator that the
/// assembler can call sample-by-sample, independent of whether the
/// caller is fitting over a scalar or vector domain.
pub(crate) trait Sampler {
    /// Number of observations `n`.
    fn len(&self) -> usize;

    /// Observed value `yᵢ`.
    fn y(&self, i: usize) -> f64;

    /// Weight `wᵢ = 1/σᵢ²`.
    fn weight(&self, i: usize) -> f64;

    /// Evaluates the model at sample `i` for parameters `a`, writing
    /// `∂f/∂aⱼ` into `deriv_out` (pre-zeroed, length `m`).
    fn evaluate(
        &self,
        i: usize,
        a: &[f64],
        deriv_out: &mut [f64],
    ) -> Result<f64, EvaluationFailure>;
}

/// Curvature `α`, gradient `β`, and χ² assembled at a given parameter
/// vector, over the full (unreduced) parameter space.
pub(crate) struct NormalEquations {
    pub alpha: DMatrix<f64>,
    pub beta: DVector<f64>,
    pub chisq: f64,
}

/// Builds the symmetric curvature matrix and gradient vector by calling
/// `sampler.evaluate` exactly once per observation, with a freshly
/// zeroed derivative scratch buffer each time.
pub(crate) fn assemble(
    sampler: &dyn Sampler,
    m: usize,
    a: &[f64],
) -> Result<NormalEquations, EvaluationFailure> {
    let n = sampler.len();
    let mut alpha = DMatrix::<f64>::zeros(m, m);
    let mut beta = DVector::<f64>::zeros(m);
    let mut chisq = 0.0;
    let mut deriv = vec![0.0; m];

    for i in 0..n {
        deriv.iter_mut().for_each(|d| *d = 0.0);
        let f_i = sampler.evaluate(i, a, &mut deriv)?;
        if !f_i.is_finite() {
            return Err(EvaluationFailure);
        }
        let w = sampler.weight(i);
        let resid = sampler.y(i) - f_i;
        chisq += w * resid * resid;

        for j in 0..m {
            beta[j] += w * resid * deriv[j];
            for k in j..m {
                alpha[(j, k)] += w * deriv[j] * deriv[k];
            }
        }
    }

    // mirror the upper triangle into the lower triangle
    for j in 0..m {
        for k in (j + 1)..m {
            alpha[(k, j)] = alpha[(j, k)];
        }
    }

    if !chisq.is_finite() {
        return Err(EvaluationFailure);
    }

    Ok(NormalEquations { alpha, beta, chisq })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantModel {
        y: Vec<f64>,
        w: Vec<f64>,
    }

    impl Sampler for ConstantModel {
        fn len(&self) -> usize {
            self.y.len()
        }

        fn y(&self, i: usize) -> f64 {
            self.y[i]
        }

        fn weight(&self, i: usize) -> f64 {
            self.w[i]
        }

        fn evaluate(
            &self,
            _i: usize,
            a: &[f64],
            deriv_out: &mut [f64],
        ) -> Result<f64, EvaluationFailure> {
            deriv_out[0] = 1.0;
            Ok(a[0])
        }
    }

    #[test]
    fn alpha_is_symmetric_and_matches_formula() {
        let model = ConstantModel {
            y: vec![1.0, 2.0, 3.0],
            w: vec![1.0, 1.0, 1.0],
        };
        let eqs = assemble(&model, 1, &[0.0]).unwrap();
        assert_eq!(eqs.alpha[(0, 0)], 3.0); // sum of w_i * 1 * 1
        assert_eq!(eqs.beta[0], 6.0); // sum of w_i * (y_i - 0) * 1
        assert_eq!(eqs.chisq, 1.0 + 4.0 + 9.0);
    }

    #[test]
    fn non_finite_sample_is_an_evaluation_failure() {
        struct Bad;
        impl Sampler for Bad {
            fn len(&self) -> usize {
                1
            }
            fn y(&self, _i: usize) -> f64 {
                0.0
            }
            fn weight(&self, _i: usize) -> f64 {
                1.0
            }
            fn evaluate(
                &self,
                _i: usize,
                _a: &[f64],
                _deriv_out: &mut [f64],
            ) -> Result<f64, EvaluationFailure> {
                Ok(f64::NAN)
            }
        }
        assert!(assemble(&Bad, 1, &[0.0]).is_err());
    }
}
