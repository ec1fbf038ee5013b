use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tripaudit_parser::{SensorField, SensorLimits};

use crate::error::{PipelineError, Result};

pub const DEFAULT_GAP_THRESHOLD_S: f64 = 300.0;

/// Tunable knobs for one audit run. Every field has a production default, so
/// a partial (or absent) TOML file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub gap_threshold_s: f64,
    pub limits: SensorLimits,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            gap_threshold_s: DEFAULT_GAP_THRESHOLD_S,
            limits: SensorLimits::default(),
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gap_threshold_s.is_finite() || self.gap_threshold_s < 0.0 {
            return Err(PipelineError::Config(format!(
                "gap_threshold_s must be a non-negative number of seconds, got {}",
                self.gap_threshold_s
            )));
        }
        for field in SensorField::ALL {
            let range = self.limits.range(field);
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(PipelineError::Config(format!(
                    "invalid {field} range: min {} exceeds max {}",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}
