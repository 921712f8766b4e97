//! Error taxonomy for the estimation workflows

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before computation, e.g. a geographic CRS handed to length measurement
    #[error("validation error: {0}")]
    Validation(String),

    /// Not enough usable data to compute a result
    #[error("insufficient data: {0}")]
    Insufficient(String),

    /// Arguments outside the domain of the computation, e.g. a zero standard deviation
    #[error("domain error: {0}")]
    Domain(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
