use std::fmt;

use num_traits::Float;

/// Two-sided standard normal quantile for a 95% confidence interval
pub const Z_95: f64 = 1.96;

/// A point estimate with its one standard deviation uncertainty
///
/// Rates are carried in tons per hour throughout the fusion workflow. The uncertainty is
/// expected to be non-negative, the value may take any sign.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement<E> {
    pub(crate) value: E,
    pub(crate) uncertainty: E,
}

impl<E: Copy> Measurement<E> {
    pub const fn new(value: E, uncertainty: E) -> Self {
        Self { value, uncertainty }
    }

    pub const fn value(&self) -> E {
        self.value
    }

    pub const fn uncertainty(&self) -> E {
        self.uncertainty
    }
}

impl<E: Float> Measurement<E> {
    /// The interval $\mu \pm z \sigma$
    pub fn confidence_interval(&self, z: E) -> Interval<E> {
        Interval {
            lower: self.value - z * self.uncertainty,
            upper: self.value + z * self.uncertainty,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.value.is_nan() || self.uncertainty.is_nan()
    }
}

impl<E: fmt::Display> fmt::Display for Measurement<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.p$} ± {:.p$}", self.value, self.uncertainty),
            None => write!(f, "{} ± {}", self.value, self.uncertainty),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval<E> {
    pub lower: E,
    pub upper: E,
}

/// Combine independent uncertainties as $\sqrt{\sum_i \sigma_i^2}$
pub fn quadrature<E: Float>(uncertainties: impl IntoIterator<Item = E>) -> E {
    uncertainties
        .into_iter()
        .fold(E::zero(), |acc, sigma| acc + sigma * sigma)
        .sqrt()
}

/// The finite values of `values`, treating `None`, `NaN` and infinities alike as missing
fn present<E: Float>(values: impl IntoIterator<Item = Option<E>>) -> impl Iterator<Item = E> {
    values.into_iter().flatten().filter(|value| value.is_finite())
}

/// Sum the present values, skipping missing ones
///
/// Returns `None` when every value is missing, so an absent contribution is never confused
/// with a zero one.
pub fn sum_present<E: Float>(values: impl IntoIterator<Item = Option<E>>) -> Option<E> {
    present(values).fold(None, |acc, value| Some(acc.unwrap_or_else(E::zero) + value))
}

/// Quadrature sum of the present uncertainties, `None` when every one is missing
pub fn quadrature_present<E: Float>(
    uncertainties: impl IntoIterator<Item = Option<E>>,
) -> Option<E> {
    let finite: Vec<E> = present(uncertainties).collect();
    if finite.is_empty() {
        None
    } else {
        Some(quadrature(finite))
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::{quadrature, quadrature_present, sum_present, Measurement, Z_95};

    proptest! {
        #[test]
        fn quadrature_of_two_equal_uncertainties_scales_by_root_two(sigma in 1e-6..1e6f64) {
            let combined = quadrature([sigma, sigma]);
            approx::assert_relative_eq!(
                combined,
                sigma * std::f64::consts::SQRT_2,
                max_relative = 1e-12
            );
            prop_assert!(combined < 2. * sigma);
        }
    }

    #[test]
    fn quadrature_of_three_four_is_five() {
        approx::assert_relative_eq!(quadrature([3.0, 4.0]), 5.0);
    }

    #[test]
    fn missing_values_are_skipped_rather_than_zeroed() {
        let values = [Some(1.0), None, Some(2.5)];
        assert_eq!(sum_present(values), Some(3.5));

        let uncertainties = [None, Some(3.0), Some(4.0)];
        approx::assert_relative_eq!(quadrature_present(uncertainties).unwrap(), 5.0);
    }

    #[test]
    fn all_missing_values_have_no_aggregate() {
        assert_eq!(sum_present::<f64>([None, None]), None);
        assert_eq!(quadrature_present::<f64>([None]), None);
        assert_eq!(sum_present::<f64>([]), None);
    }

    #[test]
    fn non_finite_values_count_as_missing() {
        let values = [Some(1.0), Some(f64::NAN), Some(f64::INFINITY), Some(2.0)];
        assert_eq!(sum_present(values), Some(3.0));
        assert_eq!(sum_present([Some(f64::NAN)]), None);

        let uncertainties = [Some(3.0), Some(f64::NAN), Some(f64::NEG_INFINITY), Some(4.0)];
        approx::assert_relative_eq!(quadrature_present(uncertainties).unwrap(), 5.0);
        assert_eq!(quadrature_present([Some(f64::NAN)]), None);
    }

    #[test]
    fn explicit_zero_is_a_contribution() {
        assert_eq!(sum_present([Some(0.0), None]), Some(0.0));
    }

    #[test]
    fn confidence_interval_is_symmetric_about_the_value() {
        let measurement = Measurement::new(100.0, 5.0);
        let interval = measurement.confidence_interval(Z_95);
        approx::assert_relative_eq!(interval.lower, 90.2, max_relative = 1e-12);
        approx::assert_relative_eq!(interval.upper, 109.8, max_relative = 1e-12);
    }

    #[test]
    fn nan_in_either_field_marks_the_measurement() {
        assert!(Measurement::new(f64::NAN, 1.0).is_nan());
        assert!(Measurement::new(1.0, f64::NAN).is_nan());
        assert!(!Measurement::new(1.0, 0.0).is_nan());
    }

    #[test]
    fn display_honours_precision() {
        let measurement = Measurement::new(100.944, 4.8507);
        assert_eq!(format!("{measurement:.2}"), "100.94 ± 4.85");
    }
}
