//! # mmWave Beam Management Core
//!
//! Shared building blocks for simulating 5G millimeter-wave beam management:
//!
//! - **Codebooks**: parsing and generating beamforming weight tables
//! - **Numerology**: sub-carrier spacing driven slot/symbol/SS-burst timing
//! - **Timing**: explicit simulated-time values (no global clock)
//! - **Configuration**: YAML config with search path and validation
//! - **Observability**: `tracing` subscriber setup
//!
//! The stateful parts of the model (beam sweeping, SINR bookkeeping, best
//! beam pair selection) live in `mmwave-sim` and build on these types.
//!
//! ## Example
//!
//! ```rust
//! use mmwave_core::{Codebook, NumerologyConfig, SubcarrierSpacing};
//!
//! let codebook = Codebook::kronecker(&Codebook::dft(4), &Codebook::dft(2));
//! assert_eq!(codebook.len(), 8);
//!
//! let numerology = NumerologyConfig::new(SubcarrierSpacing::Khz120);
//! assert_eq!(numerology.max_ss_block_slot_id(), 40);
//! ```

pub mod codebook;
pub mod config;
pub mod numerology;
pub mod observe;
pub mod timing;
pub mod types;

pub use codebook::{parse_weight, Codebook, CodebookError, CodebookResult, WeightParseError};
pub use config::{BeamSweepConfig, ConfigError, MmWaveConfig};
pub use numerology::{
    NumerologyConfig, NumerologyError, NumerologyParams, NumerologyResult, SubcarrierSpacing,
};
pub use timing::SimTime;
pub use types::{BeamId, ComplexWeight, WeightVector, NO_SINR, UNSET_BEAM_ID};
