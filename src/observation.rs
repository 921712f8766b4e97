//! Totals of sensor derived plume detections
use serde::Deserialize;
use tracing::debug;

use crate::margin::{quadrature_present, sum_present, Measurement};
use crate::{Error, Result};

/// A single plume detection as published by the observation catalogue
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationRow {
    pub gas: String,
    /// Emission rate in catalogue units (kg/h)
    pub emission: Option<f64>,
    /// One standard deviation uncertainty of `emission`
    pub uncertainty: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    /// Only detections of this gas are counted, compared case-insensitively
    pub gas: String,
    /// Factor converting catalogue units to tons per hour
    pub to_tph: f64,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            gas: "CO2".into(),
            to_tph: 1e-3,
        }
    }
}

/// Total emission of all detections of the configured gas, in tons per hour
///
/// Detections are treated as independent so rates add and uncertainties combine in
/// quadrature. Missing cells are skipped.
///
/// # Errors
/// Returns [`Error::Insufficient`] if no detection of the gas carries a rate.
pub fn total(rows: &[ObservationRow], config: &ObservationConfig) -> Result<Measurement<f64>> {
    let matching = rows
        .iter()
        .filter(|row| row.gas.trim().eq_ignore_ascii_case(&config.gas))
        .collect::<Vec<_>>();

    let value = sum_present(matching.iter().map(|row| row.emission))
        .ok_or_else(|| Error::Insufficient(format!("no {} detection carries a rate", config.gas)))?;
    let uncertainty =
        quadrature_present(matching.iter().map(|row| row.uncertainty)).unwrap_or(0.);

    debug!(
        gas = %config.gas,
        detections = matching.len(),
        of = rows.len(),
        "summed plume detections"
    );

    Ok(Measurement {
        value: value * config.to_tph,
        uncertainty: uncertainty * config.to_tph.abs(),
    })
}
