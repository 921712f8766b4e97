//! Emission rate from integrated mass enhancement
//!
//! The plume mass is assumed to be advected along the measured length at the wind speed, so
//! the source replenishes the whole enhancement once every `length / speed` seconds:
//!
//! $$
//!     Q = \frac{IME}{L / U} \cdot 3600
//! $$
use tracing::debug;

use crate::geometry::{PlumeGeometry, WindState};
use crate::margin::Measurement;

pub const SECONDS_PER_HOUR: f64 = 3600.;
pub const KG_PER_TON: f64 = 1000.;

/// Per-plume side information: the wind at the source and the integrated mass enhancement
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlumeRecord {
    pub wind: WindState,
    /// IME and its one standard deviation uncertainty, in kg
    pub ime: Measurement<f64>,
}

/// Emission rate in kg/h of a plume holding `ime_kg` spread over `length_m` along a wind of
/// `wind_speed_mps`
///
/// Returns `NaN` when any input is not positive. The plume is then unmeasurable, which callers
/// skip rather than treat as a failure.
pub fn flow_rate(length_m: f64, wind_speed_mps: f64, ime_kg: f64) -> f64 {
    if !(length_m > 0. && wind_speed_mps > 0. && ime_kg > 0.) {
        return f64::NAN;
    }
    let travel_time_s = length_m / wind_speed_mps;
    ime_kg / travel_time_s * SECONDS_PER_HOUR
}

/// Emission rate of a plume in tons per hour with an IME only uncertainty
///
/// The measurement axis is aligned with the wind so the full wind speed is taken as the
/// parallel component. Only the IME uncertainty is carried, scaled by the relative error
/// `ime.uncertainty / ime.value`; wind and length errors are neglected. Both fields are `NaN`
/// when the rate is unmeasurable.
pub fn rate_estimate(
    geometry: &PlumeGeometry,
    wind: &WindState,
    ime: &Measurement<f64>,
) -> Measurement<f64> {
    let value = flow_rate(geometry.length_m, wind.speed_mps, ime.value) / KG_PER_TON;
    if value.is_nan() {
        debug!(
            length_m = geometry.length_m,
            speed_mps = wind.speed_mps,
            ime_kg = ime.value,
            "plume is unmeasurable"
        );
        return Measurement {
            value,
            uncertainty: f64::NAN,
        };
    }

    Measurement {
        value,
        uncertainty: ime.uncertainty / ime.value * value,
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::{flow_rate, rate_estimate};
    use crate::geometry::{PlumeGeometry, WindState};
    use crate::margin::Measurement;

    fn geometry(length_m: f64) -> PlumeGeometry {
        PlumeGeometry {
            length_m,
            axis_azimuth_deg: 90.,
        }
    }

    fn wind(speed_mps: f64) -> WindState {
        WindState {
            speed_mps,
            from_deg: 270.,
        }
    }

    #[test]
    fn non_positive_inputs_are_unmeasurable() {
        assert!(flow_rate(0., 5., 100.).is_nan());
        assert!(flow_rate(100., 0., 100.).is_nan());
        assert!(flow_rate(100., 5., 0.).is_nan());
        assert!(flow_rate(-100., 5., 100.).is_nan());
        assert!(flow_rate(f64::NAN, 5., 100.).is_nan());
    }

    #[test]
    fn five_hundred_metres_at_five_metres_per_second() {
        // 100 s travel time, 10 t replaced every 100 s
        let rate = flow_rate(500., 5., 10_000.);
        approx::assert_relative_eq!(rate, 360_000., max_relative = 1e-12);

        let ime = Measurement::new(10_000., 1_000.);
        let estimate = rate_estimate(&geometry(500.), &wind(5.), &ime);
        approx::assert_relative_eq!(estimate.value(), 360., max_relative = 1e-12);
        approx::assert_relative_eq!(estimate.uncertainty(), 36., max_relative = 1e-12);
    }

    #[test]
    fn unmeasurable_plumes_propagate_nan() {
        let estimate = rate_estimate(&geometry(0.), &wind(5.), &Measurement::new(10_000., 1_000.));
        assert!(estimate.value().is_nan());
        assert!(estimate.uncertainty().is_nan());
        assert!(estimate.is_nan());
    }

    proptest! {
        #[test]
        fn relative_uncertainty_of_the_rate_matches_the_ime(
            length_m in 1.0..1e4f64,
            speed_mps in 0.1..30.0f64,
            ime_kg in 1.0..1e7f64,
            relative in 0.0..1.0f64,
        ) {
            let ime = Measurement::new(ime_kg, ime_kg * relative);
            let estimate = rate_estimate(&geometry(length_m), &wind(speed_mps), &ime);

            prop_assert!(estimate.value() > 0.);
            prop_assert!((estimate.uncertainty() / estimate.value() - relative).abs() < 1e-9);
        }

        #[test]
        fn rate_scales_inversely_with_length(
            length_m in 1.0..1e4f64,
            speed_mps in 0.1..30.0f64,
            ime_kg in 1.0..1e7f64,
        ) {
            let single = flow_rate(length_m, speed_mps, ime_kg);
            let double = flow_rate(2. * length_m, speed_mps, ime_kg);
            prop_assert!((single / double - 2.).abs() < 1e-9);
        }
    }
}
