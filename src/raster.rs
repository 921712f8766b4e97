use std::fmt;

use ndarray::{Array2, ArrayView2};
use serde::Deserialize;

/// Six coefficient affine map from pixel space to map space
///
/// Coefficients follow the ordering of the `affine` convention used by GeoTIFF tooling
///
/// $$
///     x = a \cdot col + b \cdot row + c, \quad y = d \cdot col + e \cdot row + f
/// $$
///
/// so for a north-up raster `a` is the pixel width, `e` the negated pixel height and
/// `(c, f)` the map position of the upper left corner.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(from = "[f64; 6]")]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl From<[f64; 6]> for AffineTransform {
    fn from([a, b, c, d, e, f]: [f64; 6]) -> Self {
        Self { a, b, c, d, e, f }
    }
}

impl AffineTransform {
    /// A transform without rotation, anchored at the upper left corner `(x_origin, y_origin)`
    pub fn north_up(x_origin: f64, y_origin: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            a: pixel_width,
            b: 0.,
            c: x_origin,
            d: 0.,
            e: -pixel_height,
            f: y_origin,
        }
    }

    /// Map coordinates of the centre of the pixel at (`row`, `col`)
    #[allow(clippy::cast_precision_loss)]
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let col = col as f64 + 0.5;
        let row = row as f64 + 0.5;
        (
            self.a.mul_add(col, self.b.mul_add(row, self.c)),
            self.d.mul_add(col, self.e.mul_add(row, self.f)),
        )
    }
}

/// Coordinate reference system tag of a raster, e.g. `EPSG:32639`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Crs(pub String);

/// Geographic (angular) reference systems commonly attached to plume products
const GEOGRAPHIC_CRS: [&str; 7] = [
    "EPSG:4326",
    "EPSG:4269",
    "EPSG:4258",
    "EPSG:4267",
    "EPSG:4283",
    "EPSG:4979",
    "OGC:CRS84",
];

impl Crs {
    /// Whether coordinates in this system are latitude and longitude rather than metric
    ///
    /// Compound tags such as `EPSG:4326+3855` are geographic when their horizontal part is.
    pub fn is_geographic(&self) -> bool {
        let tag = self.0.trim().to_ascii_uppercase();
        GEOGRAPHIC_CRS.iter().any(|geographic| {
            tag.strip_prefix(geographic)
                .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphanumeric()))
        }) || tag.starts_with("GEOGCS")
            || tag.starts_with("GEOGCRS")
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single band raster mask in which positive pixels belong to the plume
#[derive(Clone, Debug)]
pub struct RasterMask {
    data: Array2<f64>,
    transform: AffineTransform,
    crs: Crs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeReason {
    FirstPlumePixel,
    /// The mask has no plume pixel so the grid centre was used
    GridCentre,
}

impl fmt::Display for ProbeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstPlumePixel => f.write_str("first plume pixel"),
            Self::GridCentre => f.write_str("no plume pixels found, using grid centre"),
        }
    }
}

/// A pixel of the mask located in map space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Probe {
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
    pub reason: ProbeReason,
}

impl RasterMask {
    pub fn new(data: Array2<f64>, transform: AffineTransform, crs: Crs) -> Self {
        Self {
            data,
            transform,
            crs,
        }
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub const fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    pub const fn crs(&self) -> &Crs {
        &self.crs
    }

    /// `(row, col)` of every pixel with a value above zero, in row-major order
    ///
    /// `NaN` no-data pixels never compare above zero so they are not part of the plume.
    pub fn plume_pixels(&self) -> Vec<(usize, usize)> {
        self.data
            .indexed_iter()
            .filter(|(_, &value)| value > 0.)
            .map(|(index, _)| index)
            .collect()
    }

    /// Map coordinates of the centres of `pixels` as an `(n, 2)` array of `(x, y)` rows
    pub fn map_coordinates(&self, pixels: &[(usize, usize)]) -> Array2<f64> {
        let mut coordinates = Array2::zeros((pixels.len(), 2));
        for (mut point, &(row, col)) in coordinates.rows_mut().into_iter().zip(pixels) {
            let (x, y) = self.transform.pixel_center(row, col);
            point[0] = x;
            point[1] = y;
        }
        coordinates
    }

    /// Locate the first plume pixel in map space, falling back to the centre of the grid
    pub fn probe(&self) -> Probe {
        let (nrows, ncols) = self.data.dim();
        let ((row, col), reason) = self
            .data
            .indexed_iter()
            .find(|(_, &value)| value > 0.)
            .map_or(((nrows / 2, ncols / 2), ProbeReason::GridCentre), |(index, _)| {
                (index, ProbeReason::FirstPlumePixel)
            });
        let (x, y) = self.transform.pixel_center(row, col);
        Probe {
            row,
            col,
            x,
            y,
            reason,
        }
    }
}
