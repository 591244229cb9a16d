//! Configuration file parser for EM and OSEM reconstruction runs
//!
//! ```toml
//! epsilon = 1e-11   # optional
//!
//! [em]
//! iterations = 30
//!
//! [osem]
//! iterations = 3
//! subsets = 12
//! ```
//!
//! Every field is optional; missing ones take the defaults shown above.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::types::{Ratio, DEFAULT_EPSILON};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {

    /// Floor for divisors and for the image sum before renormalization
    #[serde(default = "default_epsilon")]
    pub epsilon: Ratio,

    #[serde(default)]
    pub em: Em,

    #[serde(default)]
    pub osem: Osem,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Em {
    /// Number of ML-EM iterations to perform
    #[serde(default = "default_em_iterations")]
    pub iterations: usize,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Osem {
    /// Number of full OSEM iterations to perform
    #[serde(default = "default_osem_iterations")]
    pub iterations: usize,

    /// Number of OSEM subsets per iteration
    #[serde(default = "default_subsets")]
    pub subsets: usize,
}

fn default_epsilon() -> Ratio { DEFAULT_EPSILON }
fn default_em_iterations() -> usize { 30 }
fn default_osem_iterations() -> usize { 3 }
fn default_subsets() -> usize { 12 }

impl Default for Em   { fn default() -> Self { Self { iterations: default_em_iterations() } } }
impl Default for Osem { fn default() -> Self { Self { iterations: default_osem_iterations(), subsets: default_subsets() } } }

impl Default for Config {
    fn default() -> Self {
        Self { epsilon: default_epsilon(), em: Em::default(), osem: Osem::default() }
    }
}

impl Config {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.osem.subsets == 0 {
            return Err(ConfigError::Invalid("osem.subsets must be positive".into()))
        }
        if !(self.epsilon > 0.0) || !self.epsilon.is_finite() {
            return Err(ConfigError::Invalid(format!("epsilon must be positive and finite, got {}", self.epsilon)))
        }
        Ok(self)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("couldn't read config file `{path}`: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("couldn't parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text)?;
    config.validate()
}

pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
    parse_config(&text)
}
