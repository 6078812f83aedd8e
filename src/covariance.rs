//! Optional post-fit rescaling of the covariance matrix by the reduced
//! χ² (`mse`). The solver's raw covariance is `(Jᵀ W J)⁻¹`, whose scale
//! depends on the assumed σ; multiplying by `mse` yields an
//! error-calibrated covariance when the caller's σ was arbitrary (e.g.
//! unit σ everywhere).

use nalgebra::DMatrix;

/// Scales `covar` in place by `mse` when adjustment is enabled. `mse`
/// itself is always reported to the caller regardless of this setting.
pub(crate) fn adjust(covar: &mut DMatrix<f64>, mse: f64, enabled: bool) {
    if enabled {
        covar.scale_mut(mse);
    }
}
