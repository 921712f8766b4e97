//! Reduction of a per-asset emission inventory to a single site estimate
//!
//! An inventory holds one row per asset and timestamp. Two policies turn it into one
//! [`Measurement`] for the site:
//!
//! - [`Policy::GrandSum`] adds every row rate and combines every row uncertainty in quadrature.
//! - [`Policy::RepresentativeHour`] bins rows by the hour, aggregates each bin the same way and
//!   then picks one representative hour relative to the median of the hourly site rates.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Deserialize;
use tracing::debug;

use crate::margin::{quadrature_present, sum_present, Measurement};
use crate::{Error, Result};

/// Relative uncertainty assumed for rows which carry no uncertainty of their own
pub const DEFAULT_RELATIVE_SIGMA: f64 = 0.20;

/// One asset level entry of the prior inventory
///
/// Numeric cells which could not be parsed are held as `None` and never contribute to an
/// aggregate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriorRow {
    /// Asset emission rate in tons per hour
    pub prior_tph: Option<f64>,
    /// Explicit one standard deviation uncertainty in tons per hour
    pub sigma_prior_tph: Option<f64>,
    /// Uncertainty as a fraction of `prior_tph`
    pub sigma_prior_rel: Option<f64>,
    pub time_utc: Option<DateTime<Utc>>,
}

impl PriorRow {
    /// The uncertainty of this row
    ///
    /// An explicit `sigma_prior_tph` wins, otherwise the rate is scaled by the row's relative
    /// uncertainty, falling back to `default_relative_sigma`.
    pub fn sigma(&self, default_relative_sigma: f64) -> Option<f64> {
        self.sigma_prior_tph.or_else(|| {
            self.prior_tph
                .map(|rate| rate * self.sigma_prior_rel.unwrap_or(default_relative_sigma))
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Sum all rows into one total without any time binning
    GrandSum,
    /// Bin rows by hour and select one representative hour
    #[default]
    RepresentativeHour,
}

/// Which hourly bin represents the site under [`Policy::RepresentativeHour`]
///
/// The established behaviour picks the hour whose site rate lies farthest from the median of
/// all hourly rates, so that is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HourSelection {
    #[default]
    FarthestFromMedian,
    ClosestToMedian,
}

impl HourSelection {
    /// Whether a bin with `candidate` deviation from the median replaces one with `incumbent`
    ///
    /// Strict comparison keeps the earliest hour on ties.
    fn prefers(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::FarthestFromMedian => candidate > incumbent,
            Self::ClosestToMedian => candidate < incumbent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub policy: Policy,
    pub selection: HourSelection,
    /// Relative uncertainty for rows with neither `sigma_prior_tph` nor `sigma_prior_rel`
    pub default_relative_sigma: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            selection: HourSelection::default(),
            default_relative_sigma: DEFAULT_RELATIVE_SIGMA,
        }
    }
}

impl AggregationConfig {
    /// # Errors
    /// Returns [`Error::Config`] if the default relative uncertainty is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.default_relative_sigma.is_finite() && self.default_relative_sigma >= 0.) {
            return Err(Error::Config(format!(
                "default relative sigma must be a finite non-negative fraction, got {}",
                self.default_relative_sigma
            )));
        }
        Ok(())
    }
}

/// The site level estimate for one clock hour
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HourlyBin {
    /// Start of the hour
    pub hour: DateTime<Utc>,
    pub estimate: Measurement<f64>,
}

/// Reduce the inventory `rows` to one representative site estimate
///
/// # Errors
/// - [`Error::Config`] if `config` is invalid
/// - [`Error::Insufficient`] if no row, or under the hourly policy no bin, has a usable rate
pub fn aggregate(rows: &[PriorRow], config: &AggregationConfig) -> Result<Measurement<f64>> {
    config.validate()?;

    match config.policy {
        Policy::GrandSum => grand_sum(rows, config.default_relative_sigma),
        Policy::RepresentativeHour => {
            representative_hour(rows, config.selection, config.default_relative_sigma)
                .map(|bin| bin.estimate)
        }
    }
}

fn combine<'a>(
    rows: impl IntoIterator<Item = &'a PriorRow> + Clone,
    default_relative_sigma: f64,
) -> Option<Measurement<f64>> {
    let value = sum_present(rows.clone().into_iter().map(|row| row.prior_tph))?;
    let uncertainty =
        quadrature_present(rows.into_iter().map(|row| row.sigma(default_relative_sigma)))?;
    Some(Measurement { value, uncertainty })
}

fn grand_sum(rows: &[PriorRow], default_relative_sigma: f64) -> Result<Measurement<f64>> {
    let total = combine(rows, default_relative_sigma)
        .ok_or_else(|| Error::Insufficient("no prior row carries a rate".into()))?;
    debug!(rows = rows.len(), rate = total.value, sigma = total.uncertainty, "grand sum");
    Ok(total)
}

/// Floor `time` to the start of its clock hour
pub fn floor_to_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = time.timestamp().div_euclid(3600) * 3600;
    // The floored instant is earlier than `time` by under an hour, so it is always representable
    DateTime::from_timestamp(seconds, 0).unwrap_or(time)
}

/// Group `rows` by hour and aggregate each group into a site estimate
///
/// Bins are returned in chronological order. Rows without a timestamp cannot be binned and
/// are dropped, as are hours in which no row carries a finite rate or uncertainty.
pub fn hourly_bins(rows: &[PriorRow], default_relative_sigma: f64) -> Vec<HourlyBin> {
    let mut groups: BTreeMap<DateTime<Utc>, Vec<&PriorRow>> = BTreeMap::new();
    for row in rows {
        if let Some(time) = row.time_utc {
            groups.entry(floor_to_hour(time)).or_default().push(row);
        }
    }

    groups
        .into_iter()
        .filter_map(|(hour, group)| {
            let estimate = combine(group.iter().copied(), default_relative_sigma).filter(
                |estimate| estimate.value.is_finite() && estimate.uncertainty.is_finite(),
            );
            if estimate.is_none() {
                debug!(%hour, rows = group.len(), "hour has no usable aggregate, skipping");
            }
            estimate.map(|estimate| HourlyBin { hour, estimate })
        })
        .collect()
}

/// Median of the finite `values`, taking the mean of the two central values for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .sorted_by(f64::total_cmp)
        .collect::<Vec<_>>();
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => None,
        n if n % 2 == 1 => Some(sorted[mid]),
        _ => Some((sorted[mid - 1] + sorted[mid]) / 2.),
    }
}

/// Bin `rows` by hour and pick the representative bin by `selection`
///
/// # Errors
/// Returns [`Error::Insufficient`] if no hour has a usable aggregate.
pub fn representative_hour(
    rows: &[PriorRow],
    selection: HourSelection,
    default_relative_sigma: f64,
) -> Result<HourlyBin> {
    let bins = hourly_bins(rows, default_relative_sigma);
    let rates = bins.iter().map(|bin| bin.estimate.value).collect::<Vec<_>>();
    let median = median(&rates)
        .ok_or_else(|| Error::Insufficient("no hourly bin has a usable site rate".into()))?;

    let deviation = |bin: &HourlyBin| (bin.estimate.value - median).abs();
    let selected = bins
        .iter()
        .fold(None, |best: Option<&HourlyBin>, bin| match best {
            Some(current) if !selection.prefers(deviation(bin), deviation(current)) => {
                Some(current)
            }
            _ => Some(bin),
        })
        .copied()
        .ok_or_else(|| Error::Insufficient("no hourly bin has a usable site rate".into()))?;

    debug!(
        bins = bins.len(),
        median,
        hour = %selected.hour,
        rate = selected.estimate.value,
        sigma = selected.estimate.uncertainty,
        ?selection,
        "selected representative hour"
    );

    Ok(selected)
}
