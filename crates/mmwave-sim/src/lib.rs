//! # mmWave Beam Management Simulation
//!
//! Stateful half of the beam management model:
//!
//! - [`beam_sweep`]: cycles a node through its beamforming codebook on
//!   simulated time
//! - [`measurement`]: latest SINR per (device, tx beam, rx beam) and best
//!   beam pair selection
//! - [`beam_management`]: per-node facade bundling the two
//! - [`scenario`]: SS burst driven initial access between one UE and a set
//!   of gNBs
//!
//! Time is always an explicit [`SimTime`](mmwave_core::SimTime) argument and
//! remote devices are referred to by [`DeviceId`](device::DeviceId).
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use mmwave_core::{Codebook, SimTime};
//! use mmwave_sim::beam_management::BeamManagement;
//! use mmwave_sim::device::DeviceId;
//!
//! let mut gnb = BeamManagement::with_codebook(Codebook::dft(8), Duration::from_micros(125), SimTime::ZERO);
//! assert!(gnb.sweep_step_tx(SimTime::ZERO).unwrap());
//! assert_eq!(gnb.current_beam_id(), 1);
//!
//! let mut ue = BeamManagement::with_codebook(Codebook::dft(4), Duration::from_micros(125), SimTime::ZERO);
//! ue.add_sinr(DeviceId(0), gnb.current_beam_id(), ue.current_beam_id(), vec![12.0, 14.0]);
//! ue.update_best_scanned(SimTime::from_micros(125));
//! assert_eq!(ue.best_scanned().avg_sinr, 13.0);
//! ```

pub mod beam_management;
pub mod beam_sweep;
pub mod device;
pub mod measurement;
pub mod scenario;

pub use beam_management::{BeamManagement, SweepSide};
pub use beam_sweep::{BeamSweepEngine, SweepError, SweepResult, SweepState};
pub use device::{DeviceId, DeviceInfo, DeviceRegistry, DeviceRole};
pub use measurement::{
    BeamMeasurementTable, BeamPairKey, BestBeamPairInfo, LinearMean, SinrMetric, SinrSpectrum,
    WeightedMean,
};
pub use scenario::{ScenarioError, ScenarioReport, ScenarioResult, SweepScenario, SweepScenarioConfig};
