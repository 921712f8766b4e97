//! Plume length along the wind axis
//!
//! The plume is treated as a single roughly linear feature. Its length is the extent of the
//! plume pixels projected onto the direction the wind blows towards, not a traced centreline.
use ndarray::{arr1, Array1};
use tracing::debug;

use crate::raster::RasterMask;
use crate::{Error, Result};

/// Wind at the source
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindState {
    pub speed_mps: f64,
    /// Meteorological direction the wind blows from, degrees clockwise from north
    pub from_deg: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlumeGeometry {
    /// Extent of the plume along the measurement axis, in the linear unit of the raster CRS
    pub length_m: f64,
    /// Direction the wind blows towards, degrees clockwise from north
    pub axis_azimuth_deg: f64,
}

/// Convert a meteorological "from" direction to the azimuth of travel, in `[0, 360)`
pub fn axis_azimuth(from_deg: f64) -> f64 {
    (from_deg + 180.).rem_euclid(360.)
}

/// Unit vector `(east, north)` pointing along `azimuth_deg`
pub fn unit_vector(azimuth_deg: f64) -> Array1<f64> {
    let theta = (90. - azimuth_deg).rem_euclid(360.).to_radians();
    arr1(&[theta.cos(), theta.sin()])
}

/// Measure the length of the plume in `mask` along the wind axis
///
/// # Errors
/// - [`Error::Validation`] if the mask is in a geographic CRS, where lengths would be in degrees
/// - [`Error::Insufficient`] if the mask holds fewer than two plume pixels
pub fn plume_length(mask: &RasterMask, wind_from_deg: f64) -> Result<PlumeGeometry> {
    let axis_azimuth_deg = axis_azimuth(wind_from_deg);
    let axis = unit_vector(axis_azimuth_deg);

    if mask.crs().is_geographic() {
        return Err(Error::Validation(format!(
            "mask CRS {} is geographic (lat/lon), reproject to a metric CRS such as UTM first",
            mask.crs()
        )));
    }

    let pixels = mask.plume_pixels();
    if pixels.len() < 2 {
        return Err(Error::Insufficient(format!(
            "found {} plume pixels, at least 2 are needed to measure a length",
            pixels.len()
        )));
    }

    let projections = mask.map_coordinates(&pixels).dot(&axis);
    let (min, max) = projections
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &t| {
            (min.min(t), max.max(t))
        });
    let length_m = max - min;

    debug!(
        pixels = pixels.len(),
        grid = ?mask.data().dim(),
        axis_azimuth_deg,
        length_m,
        "measured plume extent"
    );

    Ok(PlumeGeometry {
        length_m,
        axis_azimuth_deg,
    })
}
