//! Scenario configuration
//!
//! Defines the parameters of an initial-access sweep run: one UE scanning a
//! set of gNBs over a number of milliseconds of SS bursts.

use mmwave_core::{NumerologyConfig, NumerologyParams};
use serde::{Deserialize, Serialize};

use super::ScenarioError;

/// Configuration for [`SweepScenario`](super::SweepScenario)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepScenarioConfig {
    /// Run length in milliseconds (one subframe per ms)
    pub duration_ms: u64,
    /// Numerology driving slot timing and SS burst eligibility
    pub numerology: NumerologyParams,
    /// SS blocks a gNB transmits on each beam before moving on
    pub blocks_per_beam: u32,
    /// Number of SINR sub-bands reported per measurement
    pub num_bands: usize,
    /// Log-normal shadowing standard deviation in dB
    pub shadowing_std_db: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SweepScenarioConfig {
    fn default() -> Self {
        Self {
            duration_ms: 10, // one radio frame
            numerology: NumerologyParams::default(),
            blocks_per_beam: 1,
            num_bands: 4,
            shadowing_std_db: 1.0,
            seed: 42,
        }
    }
}

impl SweepScenarioConfig {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.numerology.validate()?;
        if self.duration_ms == 0 {
            return Err(ScenarioError::InvalidConfig("duration_ms must be positive".into()));
        }
        if self.blocks_per_beam == 0 {
            return Err(ScenarioError::InvalidConfig("blocks_per_beam must be positive".into()));
        }
        if self.num_bands == 0 {
            return Err(ScenarioError::InvalidConfig("num_bands must be positive".into()));
        }
        if !self.shadowing_std_db.is_finite() || self.shadowing_std_db < 0.0 {
            return Err(ScenarioError::InvalidConfig(format!(
                "shadowing_std_db must be non-negative, got {}",
                self.shadowing_std_db
            )));
        }
        Ok(())
    }

    /// Validated numerology for this run.
    pub fn numerology(&self) -> Result<NumerologyConfig, ScenarioError> {
        Ok(NumerologyConfig::from_params(self.numerology.clone())?)
    }

    /// Total number of slots simulated.
    pub fn total_slots(&self, numerology: &NumerologyConfig) -> u64 {
        self.duration_ms * numerology.slots_per_subframe() as u64
    }
}
