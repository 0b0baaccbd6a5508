//! Run configuration
//!
//! Loaded from YAML; every field has a default so a file only needs the
//! values it changes. Command-line flags override file values.

use crate::interval::{Threshold, YearRange};
use crate::projection::{EvictionPolicy, ProjectionConfig, DEFAULT_PROGRESS_EVERY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("min_days_together must be -1 or non-negative, got {0}")]
    InvalidThreshold(i64),

    #[error("partition_count must be at least 1")]
    ZeroPartitions,

    #[error("min_year {min} is after max_year {max}")]
    InvertedYears { min: i32, max: i32 },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Minimum overlapping days; -1 connects any pair sharing an employer
    pub min_days_together: i64,
    pub min_year: Option<i32>,
    /// Inclusive
    pub max_year: i32,
    pub partition_count: usize,
    pub progress_every: usize,
    pub eviction: EvictionPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_days_together: 1,
            min_year: None,
            max_year: i32::MAX,
            partition_count: 1,
            progress_every: DEFAULT_PROGRESS_EVERY,
            eviction: EvictionPolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: RunConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.threshold()?;
        self.years()?;
        if self.partition_count == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        Ok(())
    }

    pub fn threshold(&self) -> ConfigResult<Threshold> {
        Threshold::from_min_days(self.min_days_together)
            .ok_or(ConfigError::InvalidThreshold(self.min_days_together))
    }

    pub fn years(&self) -> ConfigResult<YearRange> {
        let range = match self.min_year {
            Some(min) => YearRange::new(min, self.max_year),
            None => YearRange::up_to(self.max_year),
        };
        if range.is_empty() {
            return Err(ConfigError::InvertedYears {
                min: range.min,
                max: range.max,
            });
        }
        Ok(range)
    }

    /// Validated projection parameters
    pub fn projection(&self) -> ConfigResult<ProjectionConfig> {
        Ok(ProjectionConfig::new(self.threshold()?, self.years()?)
            .with_progress_every(self.progress_every)
            .with_eviction(self.eviction))
    }
}
