//! SINR bookkeeping and best beam pair selection
//!
//! [`BeamMeasurementTable`] stores the latest SINR spectrum for every
//! (remote device, tx beam, rx beam) combination seen during a scan:
//!
//! ```text
//!   DeviceId ──► (tx, rx) ──► [sinr band 0, sinr band 1, …]
//! ```
//!
//! A repeated measurement for the same combination replaces the previous one
//! in place. Devices are visited in the order they were first measured, and
//! each device's beam pairs in the order they were first recorded; that is
//! also how [`best_pair`](BeamMeasurementTable::best_pair) breaks ties: the
//! first entry with the highest score wins.
//!
//! Scores come from a [`SinrMetric`]. The default, [`LinearMean`], is a plain
//! average over band indices. It ignores band widths and noise power, so it
//! is only an approximation of link quality; [`WeightedMean`] can be swapped
//! in without touching the table.
//!
//! ## Example
//!
//! ```
//! use mmwave_core::SimTime;
//! use mmwave_sim::device::DeviceId;
//! use mmwave_sim::measurement::BeamMeasurementTable;
//!
//! let mut table = BeamMeasurementTable::new();
//! table.record_measurement(DeviceId(1), 0, 3, vec![2.0, 4.0]);
//! table.record_measurement(DeviceId(2), 5, 1, vec![6.0, 8.0]);
//!
//! let best = table.best_pair();
//! assert_eq!(best.device, Some(DeviceId(2)));
//! assert_eq!((best.tx_beam_id, best.rx_beam_id), (5, 1));
//! assert_eq!(best.avg_sinr, 7.0);
//!
//! assert!(table.commit_best(SimTime::from_millis(20)));
//! ```

use std::collections::HashMap;
use std::fmt;

use mmwave_core::{BeamId, SimTime, NO_SINR, UNSET_BEAM_ID};
use serde::{Deserialize, Serialize};

use crate::device::DeviceId;

/// SINR per frequency band, indexed by band number.
pub type SinrSpectrum = Vec<f64>;

/// A (tx beam, rx beam) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BeamPairKey {
    pub tx: BeamId,
    pub rx: BeamId,
}

impl BeamPairKey {
    pub fn new(tx: BeamId, rx: BeamId) -> Self {
        Self { tx, rx }
    }
}

impl fmt::Display for BeamPairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(tx={}, rx={})", self.tx, self.rx)
    }
}

/// Scores a SINR spectrum; higher is better.
///
/// Returning NaN excludes the measurement from selection.
pub trait SinrMetric: fmt::Debug + Send + Sync {
    fn score(&self, sinr: &[f64]) -> f64;
}

/// Unweighted mean over band indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearMean;

impl SinrMetric for LinearMean {
    fn score(&self, sinr: &[f64]) -> f64 {
        if sinr.is_empty() {
            return f64::NAN;
        }
        sinr.iter().sum::<f64>() / sinr.len() as f64
    }
}

/// Mean weighted per band, e.g. by band width in Hz.
///
/// Bands beyond the end of the weight vector do not contribute.
#[derive(Debug, Clone, Default)]
pub struct WeightedMean {
    weights: Vec<f64>,
}

impl WeightedMean {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }
}

impl SinrMetric for WeightedMean {
    fn score(&self, sinr: &[f64]) -> f64 {
        let (num, den) = sinr
            .iter()
            .zip(&self.weights)
            .fold((0.0, 0.0), |(num, den), (s, w)| (num + s * w, den + w));
        if den > 0.0 {
            num / den
        } else {
            f64::NAN
        }
    }
}

/// Best beam pair found by a scan.
///
/// `device == None` means nothing has been selected; the other fields then
/// hold their sentinels (`avg_sinr == -100`, beam ids `65535`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestBeamPairInfo {
    pub avg_sinr: f64,
    pub tx_beam_id: BeamId,
    pub rx_beam_id: BeamId,
    pub sinr: SinrSpectrum,
    pub device: Option<DeviceId>,
}

impl Default for BestBeamPairInfo {
    fn default() -> Self {
        Self {
            avg_sinr: NO_SINR,
            tx_beam_id: UNSET_BEAM_ID,
            rx_beam_id: UNSET_BEAM_ID,
            sinr: Vec::new(),
            device: None,
        }
    }
}

impl BestBeamPairInfo {
    /// Whether a device has been selected.
    pub fn is_selected(&self) -> bool {
        self.device.is_some()
    }

    pub fn key(&self) -> BeamPairKey {
        BeamPairKey::new(self.tx_beam_id, self.rx_beam_id)
    }
}

#[derive(Debug, Clone)]
struct DeviceMeasurements {
    device: DeviceId,
    slots: HashMap<BeamPairKey, usize>,
    entries: Vec<(BeamPairKey, SinrSpectrum)>,
}

impl DeviceMeasurements {
    fn new(device: DeviceId) -> Self {
        Self {
            device,
            slots: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn upsert(&mut self, key: BeamPairKey, sinr: SinrSpectrum) {
        match self.slots.get(&key) {
            Some(&slot) => self.entries[slot].1 = sinr,
            None => {
                self.slots.insert(key, self.entries.len());
                self.entries.push((key, sinr));
            }
        }
    }
}

/// Latest SINR per (device, beam pair), plus the committed best pair.
#[derive(Debug)]
pub struct BeamMeasurementTable {
    devices: Vec<DeviceMeasurements>,
    by_device: HashMap<DeviceId, usize>,
    metric: Box<dyn SinrMetric>,
    best_scanned: BestBeamPairInfo,
}

impl Default for BeamMeasurementTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BeamMeasurementTable {
    /// Empty table scoring with [`LinearMean`].
    pub fn new() -> Self {
        Self::with_metric(LinearMean)
    }

    /// Empty table with a custom scoring metric.
    pub fn with_metric(metric: impl SinrMetric + 'static) -> Self {
        Self {
            devices: Vec::new(),
            by_device: HashMap::new(),
            metric: Box::new(metric),
            best_scanned: BestBeamPairInfo::default(),
        }
    }

    /// Replace the scoring metric. Stored measurements are kept.
    pub fn set_metric(&mut self, metric: impl SinrMetric + 'static) {
        self.metric = Box::new(metric);
    }

    /// Store a measurement, replacing any earlier one for the same
    /// (device, tx, rx).
    pub fn record_measurement(&mut self, device: DeviceId, tx: BeamId, rx: BeamId, sinr: SinrSpectrum) {
        let slot = match self.by_device.get(&device) {
            Some(&slot) => slot,
            None => {
                self.by_device.insert(device, self.devices.len());
                self.devices.push(DeviceMeasurements::new(device));
                self.devices.len() - 1
            }
        };
        self.devices[slot].upsert(BeamPairKey::new(tx, rx), sinr);
    }

    /// Latest measurement for (device, key).
    pub fn get(&self, device: DeviceId, key: BeamPairKey) -> Option<&[f64]> {
        let dev = &self.devices[*self.by_device.get(&device)?];
        let slot = *dev.slots.get(&key)?;
        Some(&dev.entries[slot].1)
    }

    /// Every (device, key, sinr), grouped by device in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, BeamPairKey, &[f64])> {
        self.devices.iter().flat_map(|dev| {
            dev.entries
                .iter()
                .map(move |(key, sinr)| (dev.device, *key, sinr.as_slice()))
        })
    }

    /// Measurements recorded for one device, in insertion order.
    pub fn measurements_for(&self, device: DeviceId) -> impl Iterator<Item = (BeamPairKey, &[f64])> {
        self.by_device
            .get(&device)
            .map(|&slot| &self.devices[slot])
            .into_iter()
            .flat_map(|dev| dev.entries.iter().map(|(key, sinr)| (*key, sinr.as_slice())))
    }

    /// Devices with at least one measurement, in first-seen order.
    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.devices.iter().map(|d| d.device)
    }

    /// Total number of stored measurements.
    pub fn len(&self) -> usize {
        self.devices.iter().map(|d| d.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Highest-scoring measurement; ties keep the first one visited.
    ///
    /// Returns the sentinel [`BestBeamPairInfo::default`] when nothing is
    /// stored.
    pub fn best_pair(&self) -> BestBeamPairInfo {
        let mut best = BestBeamPairInfo::default();
        let mut best_score: Option<f64> = None;

        for (device, key, sinr) in self.iter() {
            let score = self.metric.score(sinr);
            if score.is_nan() {
                continue;
            }
            if best_score.map_or(true, |b| score > b) {
                best_score = Some(score);
                best = BestBeamPairInfo {
                    avg_sinr: score,
                    tx_beam_id: key.tx,
                    rx_beam_id: key.rx,
                    sinr: sinr.to_vec(),
                    device: Some(device),
                };
            }
        }
        best
    }

    /// Recompute the best pair and keep it if the scan found one.
    ///
    /// An empty scan leaves the previously committed pair in place. Returns
    /// whether a new pair was committed.
    pub fn commit_best(&mut self, now: SimTime) -> bool {
        let best = self.best_pair();
        let Some(device) = best.device else {
            tracing::debug!(%now, "No beam pair measured; keeping previous best");
            return false;
        };
        tracing::info!(
            %now,
            %device,
            tx = best.tx_beam_id,
            rx = best.rx_beam_id,
            avg_sinr = best.avg_sinr,
            "Best beam pair update"
        );
        self.best_scanned = best;
        true
    }

    /// Last committed best pair (sentinel until the first commit).
    pub fn best_scanned(&self) -> &BestBeamPairInfo {
        &self.best_scanned
    }

    /// Drop all measurements. The committed best pair is kept.
    pub fn reset(&mut self) {
        self.devices.clear();
        self.by_device.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV_A: DeviceId = DeviceId(10);
    const DEV_B: DeviceId = DeviceId(3);

    #[test]
    fn test_last_write_wins() {
        let mut table = BeamMeasurementTable::new();
        table.record_measurement(DEV_A, 1, 2, vec![1.0, 1.0]);
        table.record_measurement(DEV_A, 1, 2, vec![5.0, 7.0]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(DEV_A, BeamPairKey::new(1, 2)), Some(&[5.0, 7.0][..]));
    }

    #[test]
    fn test_distinct_keys_accumulate() {
        let mut table = BeamMeasurementTable::new();
        table.record_measurement(DEV_A, 1, 2, vec![1.0]);
        table.record_measurement(DEV_A, 2, 1, vec![2.0]);
        table.record_measurement(DEV_B, 1, 2, vec![3.0]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.device_count(), 2);
        assert_eq!(table.measurements_for(DEV_A).count(), 2);
        assert_eq!(table.measurements_for(DeviceId(99)).count(), 0);
        assert_eq!(table.devices().collect::<Vec<_>>(), vec![DEV_A, DEV_B]);
    }

    #[test]
    fn test_best_pair_first_of_tied_maxima() {
        let mut table = BeamMeasurementTable::new();
        table.record_measurement(DEV_A, 0, 1, vec![4.0, 6.0]);
        table.record_measurement(DEV_B, 2, 3, vec![8.0, 10.0]);
        table.record_measurement(DEV_B, 4, 5, vec![9.0, 9.0]);

        let best = table.best_pair();
        assert_eq!(best.device, Some(DEV_B));
        assert_eq!(best.avg_sinr, 9.0);
        assert_eq!((best.tx_beam_id, best.rx_beam_id), (2, 3));
        assert_eq!(best.sinr, vec![8.0, 10.0]);
    }

    #[test]
    fn test_tie_break_follows_insertion_not_key_order() {
        let mut table = BeamMeasurementTable::new();
        table.record_measurement(DEV_A, 7, 7, vec![3.0]);
        table.record_measurement(DEV_A, 0, 0, vec![3.0]);
        assert_eq!(table.best_pair().key(), BeamPairKey::new(7, 7));
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut table = BeamMeasurementTable::new();
        table.record_measurement(DEV_A, 0, 0, vec![1.0]);
        table.record_measurement(DEV_A, 1, 1, vec![5.0]);
        table.record_measurement(DEV_A, 0, 0, vec![5.0]);
        // (0,0) was inserted first, so it wins the tie after the update.
        assert_eq!(table.best_pair().key(), BeamPairKey::new(0, 0));
    }

    #[test]
    fn test_best_pair_empty_table() {
        let table = BeamMeasurementTable::new();
        let best = table.best_pair();
        assert_eq!(best.avg_sinr, -100.0);
        assert_eq!(best.device, None);
        assert_eq!(best.tx_beam_id, 65535);
        assert_eq!(best.rx_beam_id, 65535);
        assert!(!best.is_selected());
    }

    #[test]
    fn test_negative_scores_still_selected() {
        let mut table = BeamMeasurementTable::new();
        table.record_measurement(DEV_A, 0, 0, vec![-12.0, -8.0]);
        let best = table.best_pair();
        assert_eq!(best.device, Some(DEV_A));
        assert_eq!(best.avg_sinr, -10.0);
    }

    #[test]
    fn test_empty_spectrum_skipped() {
        let mut table = BeamMeasurementTable::new();
        table.record_measurement(DEV_A, 0, 0, vec![]);
        table.record_measurement(DEV_A, 1, 0, vec![0.5]);
        assert_eq!(table.best_pair().key(), BeamPairKey::new(1, 0));

        let mut only_empty = BeamMeasurementTable::new();
        only_empty.record_measurement(DEV_A, 0, 0, vec![]);
        assert!(!only_empty.best_pair().is_selected());
    }

    #[test]
    fn test_commit_best_keeps_previous_on_empty_scan() {
        let mut table = BeamMeasurementTable::new();
        assert!(!table.commit_best(SimTime::ZERO));
        assert!(!table.best_scanned().is_selected());

        table.record_measurement(DEV_B, 4, 2, vec![20.0]);
        assert!(table.commit_best(SimTime::from_millis(20)));
        assert_eq!(table.best_scanned().device, Some(DEV_B));

        table.reset();
        assert!(table.is_empty());
        assert!(!table.commit_best(SimTime::from_millis(40)));
        assert_eq!(table.best_scanned().device, Some(DEV_B));
        assert_eq!(table.best_scanned().key(), BeamPairKey::new(4, 2));
    }

    #[test]
    fn test_weighted_metric_changes_winner() {
        let mut table = BeamMeasurementTable::new();
        // Wide band 0, narrow band 1.
        table.record_measurement(DEV_A, 0, 0, vec![10.0, 2.0]);
        table.record_measurement(DEV_B, 1, 1, vec![4.0, 12.0]);
        assert_eq!(table.best_pair().device, Some(DEV_B));

        table.set_metric(WeightedMean::new(vec![400e6, 100e6]));
        let best = table.best_pair();
        assert_eq!(best.device, Some(DEV_A));
        assert!((best.avg_sinr - 8.4).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_mean_without_weights() {
        assert!(WeightedMean::default().score(&[1.0, 2.0]).is_nan());
        assert_eq!(WeightedMean::new(vec![1.0]).score(&[4.0, 100.0]), 4.0);
    }

    #[test]
    fn test_best_info_serializes() {
        let info = BestBeamPairInfo::default();
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"device\":null"));
    }
}
