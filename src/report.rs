use std::fmt;

use crate::geometry::{PlumeGeometry, WindState};
use crate::margin::{Interval, Measurement, Z_95};

/// Outcome of fusing plume observations with the prior inventory, all in tons per hour
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FusionReport {
    pub plume: Measurement<f64>,
    pub prior: Measurement<f64>,
    pub posterior: Measurement<f64>,
    /// 95% interval of the posterior
    pub interval: Interval<f64>,
}

impl FusionReport {
    pub fn new(
        plume: Measurement<f64>,
        prior: Measurement<f64>,
        posterior: Measurement<f64>,
    ) -> Self {
        Self {
            plume,
            prior,
            posterior,
            interval: posterior.confidence_interval(Z_95),
        }
    }
}

impl fmt::Display for FusionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Plumes: {:.2} t/h", self.plume)?;
        writeln!(f, "Prior : {:.2} t/h", self.prior)?;
        write!(
            f,
            "Post  : {:.2} t/h  (95% [{:.2}, {:.2}])",
            self.posterior, self.interval.lower, self.interval.upper
        )
    }
}

/// Emission rate of a single plume from its geometry and IME
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlumeRateReport {
    pub geometry: PlumeGeometry,
    pub wind: WindState,
    /// IME in kg
    pub ime: Measurement<f64>,
    /// Rate in tons per hour, `NaN` when unmeasurable
    pub rate: Measurement<f64>,
}

impl fmt::Display for PlumeRateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "L = {:.0} m, axis ≈ {:.1}°, U = {:.2} m/s",
            self.geometry.length_m, self.geometry.axis_azimuth_deg, self.wind.speed_mps
        )?;
        write!(
            f,
            "IME = {:.0} kg  →  Rate ≈ {:.2} t/h  (± {:.2} t/h, IME-only)",
            self.ime.value, self.rate.value, self.rate.uncertainty
        )
    }
}
