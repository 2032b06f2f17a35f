//! Per-node beam management
//!
//! [`BeamManagement`] bundles the sweep engine and the measurement table that
//! each network node owns. A gNB sweeps its transmit codebook at a fixed
//! interval; a UE steps its receive codebook once per completed transmit
//! sweep. The node's host feeds SINR measurements back in and commits the best
//! pair at the end of a scan.

use std::path::Path;
use std::time::Duration;

use mmwave_core::{BeamId, BeamSweepConfig, Codebook, SimTime, WeightVector};

use crate::beam_sweep::{BeamSweepEngine, SweepResult};
use crate::device::DeviceId;
use crate::measurement::{BeamMeasurementTable, BestBeamPairInfo, SinrMetric, SinrSpectrum};

/// Which codebook a node sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepSide {
    Tx,
    Rx,
}

/// Sweep engine plus SINR bookkeeping for one node.
#[derive(Debug, Default)]
pub struct BeamManagement {
    sweep: BeamSweepEngine,
    measurements: BeamMeasurementTable,
}

impl BeamManagement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node sweeping an in-memory codebook.
    pub fn with_codebook(codebook: Codebook, interval: Duration, now: SimTime) -> Self {
        Self {
            sweep: BeamSweepEngine::with_codebook(codebook, interval, now),
            measurements: BeamMeasurementTable::new(),
        }
    }

    /// Node configured from the `beam_sweep` config section.
    pub fn from_config(config: &BeamSweepConfig, side: SweepSide, now: SimTime) -> SweepResult<Self> {
        let mut node = Self::new();
        match side {
            SweepSide::Tx => node.initialize_tx(&config.tx_codebook, config.tx_interval(), now)?,
            SweepSide::Rx => node.initialize_rx(&config.rx_codebook, config.rx_interval(), now)?,
        }
        Ok(node)
    }

    /// Load the transmit codebook and restart the sweep.
    pub fn initialize_tx(&mut self, path: impl AsRef<Path>, interval: Duration, now: SimTime) -> SweepResult<()> {
        self.sweep.initialize(path, interval, now)?;
        tracing::debug!(%now, side = "tx", "Node sweep ready");
        Ok(())
    }

    /// Load the receive codebook and restart the sweep.
    pub fn initialize_rx(&mut self, path: impl AsRef<Path>, interval: Duration, now: SimTime) -> SweepResult<()> {
        self.sweep.initialize(path, interval, now)?;
        tracing::debug!(%now, side = "rx", "Node sweep ready");
        Ok(())
    }

    /// Transmit-side step: advances only once the sweep interval elapsed.
    pub fn sweep_step_tx(&mut self, now: SimTime) -> SweepResult<bool> {
        self.sweep.advance_if_due(now)
    }

    /// Receive-side step: always advances.
    pub fn sweep_step_rx(&mut self, now: SimTime) -> SweepResult<usize> {
        self.sweep.advance_unconditional(now)
    }

    /// Weights of the beam currently in use.
    pub fn current_beamforming_vector(&self) -> SweepResult<&WeightVector> {
        self.sweep.current_vector()
    }

    pub fn current_beam_id(&self) -> BeamId {
        self.sweep.current_beam_id()
    }

    /// Record SINR measured against `device` with beam pair (tx, rx).
    pub fn add_sinr(&mut self, device: DeviceId, tx: BeamId, rx: BeamId, sinr: SinrSpectrum) {
        self.measurements.record_measurement(device, tx, rx, sinr);
    }

    /// Best pair over the measurements seen so far, without committing.
    pub fn find_best_scanned(&self) -> BestBeamPairInfo {
        self.measurements.best_pair()
    }

    /// Commit the best pair of the current scan.
    pub fn update_best_scanned(&mut self, now: SimTime) -> bool {
        self.measurements.commit_best(now)
    }

    pub fn best_scanned(&self) -> &BestBeamPairInfo {
        self.measurements.best_scanned()
    }

    /// Swap the scoring metric used by best pair selection.
    pub fn set_metric(&mut self, metric: impl SinrMetric + 'static) {
        self.measurements.set_metric(metric);
    }

    pub fn sweep(&self) -> &BeamSweepEngine {
        &self.sweep
    }

    pub fn sweep_mut(&mut self) -> &mut BeamSweepEngine {
        &mut self.sweep
    }

    pub fn measurements(&self) -> &BeamMeasurementTable {
        &self.measurements
    }

    pub fn measurements_mut(&mut self) -> &mut BeamMeasurementTable {
        &mut self.measurements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam_sweep::SweepError;
    use crate::measurement::WeightedMean;
    use std::io::Write;

    fn write_codebook(dir: &tempfile::TempDir, name: &str, beams: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(Codebook::dft(beams).to_text().as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_initialize_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let tx = write_codebook(&dir, "tx.txt", 8);
        let rx = write_codebook(&dir, "rx.txt", 4);

        let mut gnb = BeamManagement::new();
        gnb.initialize_tx(&tx, Duration::from_micros(125), SimTime::ZERO).unwrap();
        assert_eq!(gnb.sweep().codebook().len(), 8);
        assert_eq!(gnb.current_beamforming_vector().unwrap().len(), 8);

        let mut ue = BeamManagement::new();
        ue.initialize_rx(&rx, Duration::from_micros(125), SimTime::ZERO).unwrap();
        assert_eq!(ue.sweep().codebook().len(), 4);
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = BeamSweepConfig {
            tx_codebook: write_codebook(&dir, "tx.txt", 16),
            rx_codebook: write_codebook(&dir, "rx.txt", 2),
            tx_interval_us: 250.0,
            rx_interval_us: 125.0,
        };

        let gnb = BeamManagement::from_config(&config, SweepSide::Tx, SimTime::ZERO).unwrap();
        assert_eq!(gnb.sweep().codebook().len(), 16);
        assert_eq!(gnb.sweep().sweep_interval(), Duration::from_micros(250));

        let ue = BeamManagement::from_config(&config, SweepSide::Rx, SimTime::ZERO).unwrap();
        assert_eq!(ue.sweep().codebook().len(), 2);
    }

    #[test]
    fn test_shipped_codebooks() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let defaults = BeamSweepConfig::default();
        let config = BeamSweepConfig {
            tx_codebook: root.join(&defaults.tx_codebook),
            rx_codebook: root.join(&defaults.rx_codebook),
            ..defaults
        };

        let gnb = BeamManagement::from_config(&config, SweepSide::Tx, SimTime::ZERO).unwrap();
        assert_eq!(gnb.sweep().codebook().len(), 64);
        assert_eq!(gnb.sweep().codebook().antenna_count(), Some(64));

        let ue = BeamManagement::from_config(&config, SweepSide::Rx, SimTime::ZERO).unwrap();
        assert_eq!(ue.sweep().codebook().len(), 16);
        assert_eq!(ue.sweep().codebook().antenna_count(), Some(16));
    }

    #[test]
    fn test_missing_codebook_propagates() {
        let mut node = BeamManagement::new();
        let err = node
            .initialize_tx("/nonexistent/tx.txt", Duration::from_micros(125), SimTime::ZERO)
            .unwrap_err();
        assert!(matches!(err, SweepError::CodebookLoad(_)));
    }

    #[test]
    fn test_tx_and_rx_steps() {
        let interval = Duration::from_micros(125);
        let mut gnb = BeamManagement::with_codebook(Codebook::dft(4), interval, SimTime::ZERO);
        assert!(gnb.sweep_step_tx(SimTime::ZERO).unwrap());
        assert!(!gnb.sweep_step_tx(SimTime::from_micros(100)).unwrap());
        assert!(gnb.sweep_step_tx(SimTime::from_micros(125)).unwrap());
        assert_eq!(gnb.current_beam_id(), 2);

        let mut ue = BeamManagement::with_codebook(Codebook::dft(2), interval, SimTime::ZERO);
        assert_eq!(ue.sweep_step_rx(SimTime::from_micros(1)).unwrap(), 1);
        assert_eq!(ue.sweep_step_rx(SimTime::from_micros(2)).unwrap(), 0);
    }

    #[test]
    fn test_best_scanned_flow() {
        let mut ue = BeamManagement::new();
        assert!(!ue.best_scanned().is_selected());

        ue.add_sinr(DeviceId(1), 3, 0, vec![10.0, 2.0]);
        ue.add_sinr(DeviceId(2), 5, 1, vec![4.0, 12.0]);
        assert_eq!(ue.find_best_scanned().device, Some(DeviceId(2)));
        assert!(!ue.best_scanned().is_selected());

        assert!(ue.update_best_scanned(SimTime::from_millis(20)));
        assert_eq!(ue.best_scanned().tx_beam_id, 5);

        ue.set_metric(WeightedMean::new(vec![4.0, 1.0]));
        assert!(ue.update_best_scanned(SimTime::from_millis(40)));
        assert_eq!(ue.best_scanned().device, Some(DeviceId(1)));
    }
}
