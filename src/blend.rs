use std::fmt::Debug;

use num_traits::Float;

use crate::margin::Measurement;
use crate::{Error, Result};

/// Combine two independent estimates of the same quantity by inverse-variance weighting
///
/// Each estimate is weighted by the reciprocal of its variance $w_i = 1 / \sigma_i^2$, giving the
/// posterior
///
/// $$
///     \mu = \frac{w_a a + w_b b}{w_a + w_b}, \quad \sigma = \sqrt{\frac{1}{w_a + w_b}}
/// $$
///
/// which is the closed form update for two Gaussian estimates with known variances. The
/// posterior uncertainty never exceeds the smaller of the two input uncertainties.
///
/// # Errors
/// Returns [`Error::Domain`] if either uncertainty is not a finite, strictly positive number.
pub fn blend<E: Float + Debug>(a: &Measurement<E>, b: &Measurement<E>) -> Result<Measurement<E>> {
    for measurement in [a, b] {
        let sigma = measurement.uncertainty;
        if !(sigma > E::zero() && sigma.is_finite()) {
            return Err(Error::Domain(format!(
                "cannot weight an estimate with uncertainty {sigma:?}, \
                 it must be finite and positive"
            )));
        }
    }

    let weight_a = a.uncertainty.powi(-2);
    let weight_b = b.uncertainty.powi(-2);
    let total_weight = weight_a + weight_b;

    Ok(Measurement {
        value: (weight_a * a.value + weight_b * b.value) / total_weight,
        uncertainty: total_weight.recip().sqrt(),
    })
}

#[cfg(test)]
mod test {
    use ndarray_rand::rand::{Rng, SeedableRng};
    use proptest::prelude::*;
    use rand_isaac::Isaac64Rng;

    use super::blend;
    use crate::margin::Measurement;
    use crate::Error;

    proptest! {
        #[test]
        fn posterior_uncertainty_never_exceeds_either_input(
            a in -1e3..1e3f64,
            sigma_a in 1e-3..1e3f64,
            b in -1e3..1e3f64,
            sigma_b in 1e-3..1e3f64,
        ) {
            let posterior =
                blend(&Measurement::new(a, sigma_a), &Measurement::new(b, sigma_b)).unwrap();
            prop_assert!(posterior.uncertainty() <= sigma_a.min(sigma_b) * (1. + 1e-12));
        }

        #[test]
        fn blending_is_commutative(
            a in -1e3..1e3f64,
            sigma_a in 1e-3..1e3f64,
            b in -1e3..1e3f64,
            sigma_b in 1e-3..1e3f64,
        ) {
            let first = Measurement::new(a, sigma_a);
            let second = Measurement::new(b, sigma_b);
            prop_assert_eq!(blend(&first, &second).unwrap(), blend(&second, &first).unwrap());
        }

        #[test]
        fn posterior_lies_between_the_inputs(
            a in -1e3..1e3f64,
            sigma_a in 1e-3..1e3f64,
            b in -1e3..1e3f64,
            sigma_b in 1e-3..1e3f64,
        ) {
            let posterior =
                blend(&Measurement::new(a, sigma_a), &Measurement::new(b, sigma_b)).unwrap();
            let tolerance = 1e-9 * (a.abs() + b.abs() + 1.);
            prop_assert!(posterior.value() >= a.min(b) - tolerance);
            prop_assert!(posterior.value() <= a.max(b) + tolerance);
        }
    }

    #[test]
    fn equal_uncertainties_give_the_arithmetic_mean() {
        let seed = 40;
        let mut rng = Isaac64Rng::seed_from_u64(seed);

        for _ in 0..100 {
            let sigma = rng.gen_range(0.1..50.0);
            let a: f64 = rng.gen_range(0.0..500.0);
            let b: f64 = rng.gen_range(0.0..500.0);

            let posterior =
                blend(&Measurement::new(a, sigma), &Measurement::new(b, sigma)).unwrap();

            approx::assert_relative_eq!(posterior.value(), (a + b) / 2., max_relative = 1e-12);
            approx::assert_relative_eq!(
                posterior.uncertainty(),
                sigma / std::f64::consts::SQRT_2,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn plume_and_prior_blend_matches_closed_form() {
        let plume = Measurement::new(100.0, 5.0);
        let prior = Measurement::new(120.0, 20.0);

        let posterior = blend(&plume, &prior).unwrap();

        // w = 1 / 25 and 1 / 400
        let expected_value = (100. / 25. + 120. / 400.) / (1. / 25. + 1. / 400.);
        approx::assert_relative_eq!(posterior.value(), expected_value, max_relative = 1e-12);
        approx::assert_relative_eq!(posterior.value(), 101.176_470_588, max_relative = 1e-9);
        approx::assert_relative_eq!(posterior.uncertainty(), 4.850_712_5, max_relative = 1e-7);
    }

    #[test]
    fn precise_estimate_dominates() {
        let precise = Measurement::new(10.0, 1e-4);
        let vague = Measurement::new(1000.0, 1e4);

        let posterior = blend(&precise, &vague).unwrap();
        approx::assert_relative_eq!(posterior.value(), 10.0, max_relative = 1e-9);
    }

    #[test]
    fn zero_uncertainty_is_a_domain_error() {
        let exact = Measurement::new(100.0, 0.0);
        let other = Measurement::new(120.0, 20.0);

        assert!(matches!(blend(&exact, &other), Err(Error::Domain(_))));
        assert!(matches!(blend(&other, &exact), Err(Error::Domain(_))));
    }

    #[test]
    fn negative_or_nan_uncertainty_is_a_domain_error() {
        let other = Measurement::new(120.0, 20.0);

        assert!(matches!(
            blend(&Measurement::new(1.0, -2.0), &other),
            Err(Error::Domain(_))
        ));
        assert!(matches!(
            blend(&Measurement::new(1.0, f64::NAN), &other),
            Err(Error::Domain(_))
        ));
    }
}
