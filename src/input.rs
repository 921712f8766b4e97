//! Loaders turning on-disk tables into the inputs of the estimators
//!
//! Numeric cells which cannot be parsed, or which hold `NaN` or an infinity, are read as
//! missing rather than rejected, so one bad cell does not discard a whole table.
use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::flow::PlumeRecord;
use crate::geometry::WindState;
use crate::margin::Measurement;
use crate::observation::ObservationRow;
use crate::prior::PriorRow;
use crate::raster::{AffineTransform, Crs, RasterMask};
use crate::{Error, Result};

/// Read a numeric cell, treating unparseable, `NaN` and infinite values as missing
fn finite_option<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = csv::invalid_option(deserializer)?;
    Ok(value.filter(|value| value.is_finite()))
}

#[derive(Deserialize)]
struct ObservationRecord {
    gas: String,
    #[serde(default, deserialize_with = "finite_option")]
    emission_auto: Option<f64>,
    #[serde(default, deserialize_with = "finite_option")]
    emission_uncertainty_auto: Option<f64>,
}

#[derive(Deserialize)]
struct PriorRecord {
    #[serde(default, deserialize_with = "finite_option")]
    prior_tph: Option<f64>,
    #[serde(default, deserialize_with = "finite_option")]
    sigma_prior_tph: Option<f64>,
    #[serde(default, deserialize_with = "finite_option")]
    sigma_prior_rel: Option<f64>,
    #[serde(default)]
    time_utc: Option<String>,
}

#[derive(Deserialize)]
struct PlumeSideRecord {
    #[serde(default, deserialize_with = "finite_option")]
    wind_speed_avg_auto: Option<f64>,
    #[serde(default, deserialize_with = "finite_option")]
    wind_direction_avg_auto: Option<f64>,
    #[serde(default, deserialize_with = "finite_option")]
    emission_auto: Option<f64>,
    #[serde(default, deserialize_with = "finite_option")]
    emission_uncertainty_auto: Option<f64>,
}

/// Sidecar describing where a mask grid sits on the ground
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MaskMetadata {
    pub crs: Crs,
    pub transform: AffineTransform,
}

/// Parse an inventory timestamp as UTC
///
/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS` with an optional fraction and offset. Values
/// without an offset are taken to be UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.with_timezone(&Utc));
    }
    if let Ok(time) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(time.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// # Errors
/// Returns an error if the table is not valid CSV or lacks a `gas` column.
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<ObservationRow>> {
    csv_reader(reader)
        .deserialize()
        .map(|record| -> Result<ObservationRow> {
            let record: ObservationRecord = record?;
            Ok(ObservationRow {
                gas: record.gas,
                emission: record.emission_auto,
                uncertainty: record.emission_uncertainty_auto,
            })
        })
        .collect()
}

/// # Errors
/// Returns an error if the file cannot be read or is not a valid observation table.
pub fn load_observations(path: &Path) -> Result<Vec<ObservationRow>> {
    let file = fs::read(path)?;
    let rows = read_observations(&file[..])?;
    debug!(?path, rows = rows.len(), "read observation table");
    Ok(rows)
}

/// # Errors
/// Returns an error if the table is not valid CSV.
pub fn read_priors<R: Read>(reader: R) -> Result<Vec<PriorRow>> {
    csv_reader(reader)
        .deserialize()
        .map(|record| -> Result<PriorRow> {
            let record: PriorRecord = record?;
            let time_utc = record.time_utc.as_deref().and_then(parse_timestamp);
            if time_utc.is_none() {
                debug!(time_utc = ?record.time_utc, "prior row has no usable timestamp");
            }
            Ok(PriorRow {
                prior_tph: record.prior_tph,
                sigma_prior_tph: record.sigma_prior_tph,
                sigma_prior_rel: record.sigma_prior_rel,
                time_utc,
            })
        })
        .collect()
}

/// # Errors
/// Returns an error if the file cannot be read or is not a valid inventory table.
pub fn load_priors(path: &Path) -> Result<Vec<PriorRow>> {
    let file = fs::read(path)?;
    let rows = read_priors(&file[..])?;
    debug!(?path, rows = rows.len(), "read prior inventory");
    Ok(rows)
}

/// Read the first row of a plume side table
///
/// Missing or unparseable cells become `NaN` so the plume is reported as unmeasurable
/// downstream.
///
/// # Errors
/// Returns [`Error::Insufficient`] if the table has no rows.
pub fn read_plume_record<R: Read>(reader: R) -> Result<PlumeRecord> {
    let record: PlumeSideRecord = csv_reader(reader)
        .deserialize()
        .next()
        .ok_or_else(|| Error::Insufficient("plume table has no rows".into()))??;

    let or_nan = |value: Option<f64>| value.unwrap_or(f64::NAN);
    Ok(PlumeRecord {
        wind: WindState {
            speed_mps: or_nan(record.wind_speed_avg_auto),
            from_deg: or_nan(record.wind_direction_avg_auto),
        },
        ime: Measurement {
            value: or_nan(record.emission_auto),
            uncertainty: or_nan(record.emission_uncertainty_auto),
        },
    })
}

/// # Errors
/// Returns an error if the file cannot be read or holds no plume row.
pub fn load_plume_record(path: &Path) -> Result<PlumeRecord> {
    let file = fs::read(path)?;
    read_plume_record(&file[..])
}

/// Read a headerless CSV grid of pixel values
///
/// Cells which are not numbers are read as `NaN`, which never counts as plume.
///
/// # Errors
/// Returns [`Error::Validation`] if the rows differ in length.
pub fn read_grid<R: Read>(reader: R) -> Result<Array2<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut values = vec![];
    let mut ncols = None;
    let mut nrows = 0;
    for record in rdr.records() {
        let record = record?;
        match ncols {
            None => ncols = Some(record.len()),
            Some(width) if width != record.len() => {
                return Err(Error::Validation(format!(
                    "grid row {nrows} has {} cells, expected {width}",
                    record.len()
                )));
            }
            Some(_) => {}
        }
        values.extend(
            record
                .iter()
                .map(|cell| cell.parse::<f64>().unwrap_or(f64::NAN)),
        );
        nrows += 1;
    }

    Array2::from_shape_vec((nrows, ncols.unwrap_or(0)), values)
        .map_err(|e| Error::Validation(format!("grid has an inconsistent shape: {e}")))
}

/// # Errors
/// Returns an error if the metadata is not valid TOML or lacks `crs` or `transform`.
pub fn parse_mask_metadata(contents: &str) -> Result<MaskMetadata> {
    Ok(toml::from_str(contents)?)
}

/// Load a plume mask from its grid and metadata sidecar
///
/// # Errors
/// Returns an error if either file cannot be read or parsed.
pub fn load_mask(grid_path: &Path, metadata_path: &Path) -> Result<RasterMask> {
    let file = fs::read(grid_path)?;
    let data = read_grid(&file[..])?;
    let metadata = parse_mask_metadata(&fs::read_to_string(metadata_path)?)?;
    debug!(
        ?grid_path,
        shape = ?data.dim(),
        crs = %metadata.crs,
        "read plume mask"
    );
    Ok(RasterMask::new(data, metadata.transform, metadata.crs))
}
