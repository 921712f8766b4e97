use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::observation::ObservationConfig;
use crate::prior::AggregationConfig;
use crate::Result;

/// Settings of the inventory fusion workflow
///
/// Every table and field is optional in the TOML file, e.g.
///
/// ```toml
/// [observation]
/// gas = "CO2"
/// to_tph = 0.001
///
/// [prior]
/// policy = "representative-hour"
/// selection = "farthest-from-median"
/// default_relative_sigma = 0.2
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub observation: ObservationConfig,
    pub prior: AggregationConfig,
}

impl Config {
    /// # Errors
    /// Returns an error if the TOML is malformed or holds invalid values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.prior.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or holds an invalid configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }
}
