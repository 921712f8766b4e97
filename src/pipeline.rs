//! Composition of the estimators into the two estimation workflows
use tracing::{info, warn};

use crate::blend::blend;
use crate::config::Config;
use crate::flow::{rate_estimate, PlumeRecord};
use crate::geometry::plume_length;
use crate::observation::{self, ObservationRow};
use crate::prior::{self, PriorRow};
use crate::raster::RasterMask;
use crate::report::{FusionReport, PlumeRateReport};
use crate::Result;

/// Fuse the total of the plume detections with the representative prior estimate
///
/// # Errors
/// Returns an error if either source cannot be reduced to an estimate, or if either estimate
/// has a zero uncertainty and so cannot be weighted.
pub fn fuse(
    observations: &[ObservationRow],
    priors: &[PriorRow],
    config: &Config,
) -> Result<FusionReport> {
    let plume = observation::total(observations, &config.observation)?;
    let prior = prior::aggregate(priors, &config.prior)?;
    let posterior = blend(&plume, &prior)?;

    info!(
        plume = plume.value,
        prior = prior.value,
        posterior = posterior.value,
        sigma = posterior.uncertainty,
        policy = ?config.prior.policy,
        "fused plume observations with prior"
    );

    Ok(FusionReport::new(plume, prior, posterior))
}

/// Derive the emission rate of one plume from its mask and side information
///
/// An unmeasurable plume is not an error, its report carries a `NaN` rate.
///
/// # Errors
/// Returns an error if the plume length cannot be measured from `mask`.
pub fn estimate_plume(mask: &RasterMask, record: &PlumeRecord) -> Result<PlumeRateReport> {
    let geometry = plume_length(mask, record.wind.from_deg)?;
    let rate = rate_estimate(&geometry, &record.wind, &record.ime);

    info!(
        length_m = geometry.length_m,
        axis_azimuth_deg = geometry.axis_azimuth_deg,
        rate_tph = rate.value,
        "estimated plume rate"
    );

    Ok(PlumeRateReport {
        geometry,
        wind: record.wind,
        ime: record.ime,
        rate,
    })
}

/// Estimate a batch of independent plumes
///
/// Plumes which fail or turn out unmeasurable are logged and left out, the rest of the batch
/// is still estimated.
pub fn estimate_plumes<'a>(
    plumes: impl IntoIterator<Item = (&'a RasterMask, &'a PlumeRecord)>,
) -> Vec<PlumeRateReport> {
    plumes
        .into_iter()
        .enumerate()
        .filter_map(|(index, (mask, record))| match estimate_plume(mask, record) {
            Ok(report) if report.rate.is_nan() => {
                warn!(index, "plume is unmeasurable, skipping");
                None
            }
            Ok(report) => Some(report),
            Err(e) => {
                warn!(index, error = %e, "failed to estimate plume, skipping");
                None
            }
        })
        .collect()
}
