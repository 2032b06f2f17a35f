//! Sweep scenario for initial access
//!
//! Drives a UE and a set of gNBs through SS bursts on simulated time, so that
//! numerology, beam sweeping and best pair selection can be exercised together.
//! Link quality comes from a [`SinrProvider`]; [`SyntheticSinrProvider`] is a
//! seeded line-of-sight model.

pub mod config;
pub mod engine;
pub mod provider;

use mmwave_core::NumerologyError;
use thiserror::Error;

use crate::beam_sweep::SweepError;

pub use config::SweepScenarioConfig;
pub use engine::{ScenarioReport, SweepScenario};
pub use provider::{array_gain, steering_vector, LinkGeometry, SinrProvider, SyntheticSinrProvider};

/// Result type for scenario operations.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Error type for scenario setup and runs.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("beam sweep failed: {0}")]
    Sweep(#[from] SweepError),

    #[error("numerology: {0}")]
    Numerology(#[from] NumerologyError),

    #[error("invalid scenario: {0}")]
    InvalidConfig(String),
}
