//! Scenario engine: SS burst driven initial access
//!
//! Steps slot by slot through the configured duration. In every slot that may
//! carry SS blocks, each gNB transmits on its current beam and the UE measures
//! it with its current receive beam. gNBs move to their next beam after
//! `blocks_per_beam` blocks; the UE moves to its next receive beam once every
//! gNB has swept its whole codebook, and commits the best pair whenever its
//! receive sweep wraps around.

use mmwave_core::{Codebook, NumerologyConfig, SimTime, SubcarrierSpacing};
use serde::{Deserialize, Serialize};

use super::config::SweepScenarioConfig;
use super::provider::SinrProvider;
use super::{ScenarioError, ScenarioResult};
use crate::beam_management::BeamManagement;
use crate::beam_sweep::SweepError;
use crate::device::DeviceId;
use crate::measurement::BestBeamPairInfo;

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub sub_carrier_spacing: SubcarrierSpacing,
    pub slots_simulated: u64,
    pub burst_slots: u64,
    pub measurements: usize,
    pub scans_completed: u32,
    pub end_time: SimTime,
    pub best: BestBeamPairInfo,
}

impl ScenarioReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug)]
struct GnbNode {
    id: DeviceId,
    node: BeamManagement,
}

/// One UE scanning a set of gNBs
pub struct SweepScenario<P: SinrProvider> {
    config: SweepScenarioConfig,
    numerology: NumerologyConfig,
    gnbs: Vec<GnbNode>,
    ue: BeamManagement,
    provider: P,
}

impl<P: SinrProvider> SweepScenario<P> {
    /// Scenario whose UE sweeps `ue_codebook`.
    pub fn new(config: SweepScenarioConfig, ue_codebook: Codebook, provider: P) -> ScenarioResult<Self> {
        config.validate()?;
        if ue_codebook.is_empty() {
            return Err(SweepError::EmptyCodebook.into());
        }
        let numerology = config.numerology()?;
        let ue = BeamManagement::with_codebook(ue_codebook, numerology.slot_period(), SimTime::ZERO);
        Ok(Self {
            config,
            numerology,
            gnbs: Vec::new(),
            ue,
            provider,
        })
    }

    /// Add a gNB sweeping `codebook`, one slot per SS block.
    pub fn add_gnb(&mut self, id: DeviceId, codebook: Codebook) -> ScenarioResult<()> {
        if codebook.is_empty() {
            return Err(SweepError::EmptyCodebook.into());
        }
        let interval = self.numerology.slot_period();
        self.gnbs.push(GnbNode {
            id,
            node: BeamManagement::with_codebook(codebook, interval, SimTime::ZERO),
        });
        Ok(())
    }

    /// Run the configured duration and report the committed best pair.
    pub fn run(&mut self) -> ScenarioResult<ScenarioReport> {
        if self.gnbs.is_empty() {
            return Err(ScenarioError::InvalidConfig("no gNB in scenario".into()));
        }

        let total_slots = self.config.total_slots(&self.numerology);
        let slot_ns = self.numerology.slot_period().as_nanos() as u64;
        let half_frame = u64::from(self.numerology.max_ss_block_slot_id());
        let blocks_per_beam = self.config.blocks_per_beam;
        let dwell = self.tx_cycle_blocks();

        tracing::info!(
            scs_khz = self.numerology.sub_carrier_spacing().khz(),
            total_slots,
            gnbs = self.gnbs.len(),
            rx_beams = self.ue.sweep().codebook().len(),
            "Starting sweep scenario"
        );

        let mut burst_slots = 0u64;
        let mut scans_completed = 0u32;
        let mut now = SimTime::ZERO;

        for slot in 0..total_slots {
            now = SimTime::from_nanos(slot_ns.saturating_mul(slot));
            self.numerology
                .set_current_ss_block_slot_id((slot % half_frame) as u16);
            if !self.numerology.current_sync_burst_slot_status() {
                continue;
            }
            burst_slots += 1;

            let rx_beam = self.ue.current_beam_id();
            for gnb in &mut self.gnbs {
                let sinr = {
                    let tx = gnb.node.current_beamforming_vector()?;
                    let rx = self.ue.current_beamforming_vector()?;
                    self.provider.sinr(gnb.id, tx, rx, now)
                };
                self.ue.add_sinr(gnb.id, gnb.node.current_beam_id(), rx_beam, sinr);

                if gnb.node.sweep_mut().increment_block_counter() >= blocks_per_beam
                    && gnb.node.sweep_step_tx(now)?
                {
                    gnb.node.sweep_mut().reset_block_counter();
                }
            }

            if burst_slots % dwell == 0 && self.ue.sweep_step_rx(now)? == 0 {
                scans_completed += 1;
                self.ue.update_best_scanned(now);
            }
        }

        // A partial scan still counts if it found something.
        if burst_slots % (dwell * self.ue.sweep().codebook().len() as u64) != 0 {
            self.ue.update_best_scanned(now);
        }

        let report = ScenarioReport {
            sub_carrier_spacing: self.numerology.sub_carrier_spacing(),
            slots_simulated: total_slots,
            burst_slots,
            measurements: self.ue.measurements().len(),
            scans_completed,
            end_time: now,
            best: self.ue.best_scanned().clone(),
        };
        tracing::info!(
            burst_slots,
            scans_completed,
            best_device = ?report.best.device,
            tx = report.best.tx_beam_id,
            rx = report.best.rx_beam_id,
            "Sweep scenario finished"
        );
        Ok(report)
    }

    /// SS blocks the UE dwells on each receive beam.
    fn tx_cycle_blocks(&self) -> u64 {
        let longest = self
            .gnbs
            .iter()
            .map(|g| g.node.sweep().codebook().len())
            .max()
            .unwrap_or(1);
        longest as u64 * u64::from(self.config.blocks_per_beam)
    }

    pub fn config(&self) -> &SweepScenarioConfig {
        &self.config
    }

    pub fn numerology(&self) -> &NumerologyConfig {
        &self.numerology
    }

    pub fn ue(&self) -> &BeamManagement {
        &self.ue
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
