//! Test-only helpers for synthesising observations with known-variance
//! noise, standing in for the "error/variance propagation helper"
//! spec.md §6 names as an external collaborator used only by the test
//! harness.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// A deterministic RNG seeded for reproducible test data.
pub(crate) fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Draws `n` samples from `U[low, high)`.
pub(crate) fn uniform_samples(rng: &mut StdRng, n: usize, low: f64, high: f64) -> Vec<f64> {
    use rand::Rng;
    (0..n).map(|_| rng.gen_range(low..high)).collect()
}

/// Adds zero-mean Gaussian noise with standard deviation `sigma[i]` to
/// each `values[i]`.
pub(crate) fn add_gaussian_noise(rng: &mut StdRng, values: &[f64], sigma: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(sigma)
        .map(|(&v, &s)| {
            let dist = Normal::new(0.0, s).expect("sigma must be positive");
            v + dist.sample(rng)
        })
        .collect()
}

/// Propagates a known standard deviation `param_sigma` on the slope of
/// `f(x; a) = a * x` through to a per-sample `σᵢ = |xᵢ| * param_sigma`,
/// floored to avoid zero-weight samples at `x ≈ 0`.
pub(crate) fn propagate_linear_sigma(x: &[f64], param_sigma: f64) -> Vec<f64> {
    x.iter()
        .map(|&xi| (xi.abs() * param_sigma).max(1e-12))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagated_sigma_scales_with_x() {
        let x = [1.0, 2.0, -3.0];
        let sigma = propagate_linear_sigma(&x, 0.1);
        assert!((sigma[0] - 0.1).abs() < 1e-12);
        assert!((sigma[1] - 0.2).abs() < 1e-12);
        assert!((sigma[2] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn uniform_samples_stay_in_range() {
        let mut rng = seeded_rng(7);
        let xs = uniform_samples(&mut rng, 200, -100.0, 100.0);
        assert_eq!(xs.len(), 200);
        assert!(xs.iter().all(|&x| (-100.0..100.0).contains(&x)));
    }

    #[test]
    fn noise_is_deterministic_for_a_fixed_seed() {
        let mut rng1 = seeded_rng(42);
        let mut rng2 = seeded_rng(42);
        let values = vec![0.0; 5];
        let sigma = vec![1.0; 5];
        let a = add_gaussian_noise(&mut rng1, &values, &sigma);
        let b = add_gaussian_noise(&mut rng2, &values, &sigma);
        assert_eq!(a, b);
    }
}
