//! Beam sweeping
//!
//! [`BeamSweepEngine`] walks a node through its codebook one beam at a time,
//! wrapping back to beam 0 after the last one. The host scheduler decides
//! when to step it:
//!
//! ```text
//!   SS burst slot ──► advance_if_due(now)   tx side, paced by the interval
//!   rx dwell done ──► advance_unconditional  rx side, paced by the caller
//!
//!   beam:  0 → 1 → 2 → … → N-1 → 0 → …
//! ```
//!
//! The engine never reads a clock; every time-dependent call takes `now`.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use mmwave_core::{Codebook, SimTime};
//! use mmwave_sim::beam_sweep::BeamSweepEngine;
//!
//! let mut engine = BeamSweepEngine::with_codebook(
//!     Codebook::dft(4),
//!     Duration::from_micros(125),
//!     SimTime::ZERO,
//! );
//! engine.advance(SimTime::from_micros(125)).unwrap();
//! assert_eq!(engine.current_index(), 1);
//! assert_eq!(engine.current_vector().unwrap().len(), 4);
//! ```

use std::path::Path;
use std::time::Duration;

use mmwave_core::{BeamId, Codebook, CodebookError, SimTime, WeightVector, UNSET_BEAM_ID};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for sweep operations.
pub type SweepResult<T> = Result<T, SweepError>;

/// Errors raised by the sweep engine.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The codebook file is missing or malformed.
    #[error("failed to load codebook: {0}")]
    CodebookLoad(#[from] CodebookError),

    /// A sweep step was attempted with no beams loaded.
    #[error("cannot sweep an empty codebook")]
    EmptyCodebook,

    /// Beam lookup past the end of the codebook.
    #[error("beam index {index} out of range for codebook of {len} beams")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Cursor and clock of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepState {
    /// Index of the active beam
    pub current_index: usize,
    /// Minimum time between interval-paced beam changes
    pub sweep_interval: Duration,
    /// Time of the last beam change (or initialization)
    pub last_update: SimTime,
    /// SS blocks observed since the last beam change
    pub blocks_since_update: u32,
}

/// Cycles a node through its beamforming codebook.
#[derive(Debug, Clone, Default)]
pub struct BeamSweepEngine {
    codebook: Codebook,
    state: SweepState,
}

impl BeamSweepEngine {
    /// Engine with no codebook; load one with [`initialize`](Self::initialize).
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine over an already-built codebook.
    pub fn with_codebook(codebook: Codebook, sweep_interval: Duration, now: SimTime) -> Self {
        Self {
            codebook,
            state: SweepState {
                sweep_interval,
                last_update: now,
                ..Default::default()
            },
        }
    }

    /// Load a codebook file and restart the sweep at beam 0.
    ///
    /// On failure the engine keeps its previous codebook and cursor.
    pub fn initialize(
        &mut self,
        codebook_path: impl AsRef<Path>,
        sweep_interval: Duration,
        now: SimTime,
    ) -> SweepResult<()> {
        let codebook = Codebook::load(codebook_path)?;
        self.codebook = codebook;
        self.state.current_index = 0;
        self.state.sweep_interval = sweep_interval;
        self.state.last_update = now;
        tracing::info!(
            beams = self.codebook.len(),
            interval_us = sweep_interval.as_micros() as u64,
            "Beam sweep initialized"
        );
        Ok(())
    }

    /// Replace the codebook. The cursor is kept if it still points at a beam,
    /// otherwise it restarts at 0.
    pub fn set_codebook(&mut self, codebook: Codebook) {
        self.codebook = codebook;
        if self.state.current_index >= self.codebook.len() {
            self.state.current_index = 0;
        }
    }

    pub fn set_sweep_interval(&mut self, interval: Duration) {
        self.state.sweep_interval = interval;
    }

    /// Weights of the active beam.
    pub fn current_vector(&self) -> SweepResult<&WeightVector> {
        self.vector_at(self.state.current_index)
    }

    /// Weights of beam `index`.
    pub fn vector_at(&self, index: usize) -> SweepResult<&WeightVector> {
        self.codebook.get(index).ok_or(SweepError::IndexOutOfRange {
            index,
            len: self.codebook.len(),
        })
    }

    /// Step to the next beam, wrapping after the last one.
    ///
    /// Returns the new beam index.
    pub fn advance(&mut self, now: SimTime) -> SweepResult<usize> {
        let len = self.codebook.len();
        if len == 0 {
            return Err(SweepError::EmptyCodebook);
        }
        self.state.current_index = (self.state.current_index + 1) % len;
        self.state.last_update = now;
        tracing::debug!(
            %now,
            beam = self.state.current_index,
            last = len - 1,
            "Beam index changed"
        );
        Ok(self.state.current_index)
    }

    /// Interval-paced step used on the transmit side.
    ///
    /// Advances when `now` is the simulation start or at least one sweep
    /// interval has passed since the last change. An early tick means the
    /// scheduler is out of step with the sweep; it is logged and the current
    /// beam is kept. Returns whether the beam changed.
    pub fn advance_if_due(&mut self, now: SimTime) -> SweepResult<bool> {
        if now.is_zero() || now >= self.state.last_update + self.state.sweep_interval {
            self.advance(now)?;
            Ok(true)
        } else {
            tracing::warn!(
                %now,
                last_update = %self.state.last_update,
                interval_us = self.state.sweep_interval.as_micros() as u64,
                "Sweep tick arrived before the interval elapsed"
            );
            Ok(false)
        }
    }

    /// Receive-side step: always advances, the caller owns the cadence.
    pub fn advance_unconditional(&mut self, now: SimTime) -> SweepResult<usize> {
        self.advance(now)
    }

    pub fn blocks_since_last_update(&self) -> u32 {
        self.state.blocks_since_update
    }

    /// Count one more SS block on the current beam; returns the new count.
    pub fn increment_block_counter(&mut self) -> u32 {
        self.state.blocks_since_update = self.state.blocks_since_update.saturating_add(1);
        self.state.blocks_since_update
    }

    pub fn reset_block_counter(&mut self) {
        self.state.blocks_since_update = 0;
    }

    /// Restart the sweep at beam 0.
    pub fn reset(&mut self, now: SimTime) {
        self.state.current_index = 0;
        self.state.blocks_since_update = 0;
        self.state.last_update = now;
    }

    /// Emit the active beam as a diagnostic record.
    pub fn log_current_beam(&self, now: SimTime) {
        tracing::info!(
            %now,
            beam = self.state.current_index,
            of = self.codebook.len().saturating_sub(1),
            "Current beam"
        );
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    /// Active beam as a wire-sized id.
    pub fn current_beam_id(&self) -> BeamId {
        BeamId::try_from(self.state.current_index).unwrap_or(UNSET_BEAM_ID)
    }

    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    pub fn sweep_interval(&self) -> Duration {
        self.state.sweep_interval
    }

    pub fn last_update(&self) -> SimTime {
        self.state.last_update
    }

    pub fn state(&self) -> &SweepState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmwave_core::ComplexWeight;
    use std::io::Write;

    fn engine(beams: usize, interval_us: u64) -> BeamSweepEngine {
        BeamSweepEngine::with_codebook(
            Codebook::dft(beams),
            Duration::from_micros(interval_us),
            SimTime::ZERO,
        )
    }

    #[test]
    fn test_cycles_through_codebook() {
        for n in 1..=7 {
            let mut eng = engine(n, 0);
            let mut seen = Vec::new();
            for step in 1..=(2 * n) {
                seen.push(eng.advance(SimTime::from_micros(step as u64)).unwrap());
            }
            let expected: Vec<usize> = (1..=(2 * n)).map(|k| k % n).collect();
            assert_eq!(seen, expected);
            assert_eq!(eng.current_index(), 0);
        }
    }

    #[test]
    fn test_advance_empty_codebook() {
        let mut eng = BeamSweepEngine::new();
        assert!(matches!(eng.advance(SimTime::ZERO), Err(SweepError::EmptyCodebook)));
        assert!(matches!(
            eng.advance_if_due(SimTime::ZERO),
            Err(SweepError::EmptyCodebook)
        ));
        assert!(matches!(
            eng.current_vector(),
            Err(SweepError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_vector_at_bounds() {
        let eng = engine(4, 0);
        assert_eq!(eng.vector_at(3).unwrap().len(), 4);
        assert!(matches!(
            eng.vector_at(4),
            Err(SweepError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_advance_records_time() {
        let mut eng = engine(3, 100);
        eng.advance(SimTime::from_micros(40)).unwrap();
        assert_eq!(eng.last_update(), SimTime::from_micros(40));
    }

    #[test]
    fn test_advance_if_due() {
        let mut eng = engine(4, 100);

        // Simulation start always advances.
        assert!(eng.advance_if_due(SimTime::ZERO).unwrap());
        assert_eq!(eng.current_index(), 1);

        // Early tick keeps the beam.
        assert!(!eng.advance_if_due(SimTime::from_micros(50)).unwrap());
        assert_eq!(eng.current_index(), 1);
        assert_eq!(eng.last_update(), SimTime::ZERO);

        // Exactly one interval later.
        assert!(eng.advance_if_due(SimTime::from_micros(100)).unwrap());
        assert_eq!(eng.current_index(), 2);
        assert!(!eng.advance_if_due(SimTime::from_micros(199)).unwrap());
        assert!(eng.advance_if_due(SimTime::from_micros(250)).unwrap());
        assert_eq!(eng.current_index(), 3);
    }

    #[test]
    fn test_advance_unconditional_ignores_interval() {
        let mut eng = engine(2, 1_000);
        eng.advance_unconditional(SimTime::from_micros(1)).unwrap();
        eng.advance_unconditional(SimTime::from_micros(2)).unwrap();
        eng.advance_unconditional(SimTime::from_micros(3)).unwrap();
        assert_eq!(eng.current_index(), 1);
    }

    #[test]
    fn test_block_counter() {
        let mut eng = engine(2, 0);
        assert_eq!(eng.blocks_since_last_update(), 0);
        assert_eq!(eng.increment_block_counter(), 1);
        assert_eq!(eng.increment_block_counter(), 2);
        eng.reset_block_counter();
        assert_eq!(eng.blocks_since_last_update(), 0);
    }

    #[test]
    fn test_initialize_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1,0,0").unwrap();
        writeln!(file, "0,1i,0").unwrap();
        writeln!(file, "0,0,-1").unwrap();

        let mut eng = engine(8, 10);
        eng.advance(SimTime::from_micros(5)).unwrap();
        eng.initialize(file.path(), Duration::from_micros(125), SimTime::from_micros(7))
            .unwrap();

        assert_eq!(eng.codebook().len(), 3);
        assert_eq!(eng.current_index(), 0);
        assert_eq!(eng.sweep_interval(), Duration::from_micros(125));
        assert_eq!(eng.last_update(), SimTime::from_micros(7));
        assert_eq!(eng.vector_at(1).unwrap()[1], ComplexWeight::new(0.0, 1.0));
    }

    #[test]
    fn test_failed_initialize_leaves_engine_untouched() {
        let mut eng = engine(4, 10);
        eng.advance(SimTime::from_micros(3)).unwrap();

        let err = eng
            .initialize("/nonexistent/tx.txt", Duration::from_micros(1), SimTime::from_micros(9))
            .unwrap_err();
        assert!(matches!(err, SweepError::CodebookLoad(CodebookError::Io { .. })));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "1,2").unwrap();
        writeln!(bad).unwrap();
        let err = eng
            .initialize(bad.path(), Duration::from_micros(1), SimTime::from_micros(9))
            .unwrap_err();
        assert!(matches!(err, SweepError::CodebookLoad(CodebookError::EmptyRow { .. })));

        assert_eq!(eng.codebook().len(), 4);
        assert_eq!(eng.current_index(), 1);
        assert_eq!(eng.sweep_interval(), Duration::from_micros(10));
        assert_eq!(eng.last_update(), SimTime::from_micros(3));
    }

    #[test]
    fn test_reset() {
        let mut eng = engine(4, 0);
        eng.advance(SimTime::from_micros(1)).unwrap();
        eng.increment_block_counter();
        eng.reset(SimTime::from_micros(2));
        assert_eq!(eng.current_index(), 0);
        assert_eq!(eng.blocks_since_last_update(), 0);
        assert_eq!(eng.current_beam_id(), 0);
    }

    #[test]
    fn test_set_codebook_keeps_cursor_in_range() {
        let mut eng = engine(8, 0);
        for k in 1..=5 {
            eng.advance(SimTime::from_micros(k)).unwrap();
        }
        assert_eq!(eng.current_index(), 5);

        eng.set_codebook(Codebook::dft(2));
        assert_eq!(eng.current_index(), 0);
        assert_eq!(eng.current_vector().unwrap().len(), 2);
        assert_eq!(eng.advance(SimTime::from_micros(6)).unwrap(), 1);

        eng.set_codebook(Codebook::dft(4));
        assert_eq!(eng.current_index(), 1);

        eng.set_codebook(Codebook::default());
        assert_eq!(eng.current_index(), 0);
        assert!(matches!(
            eng.current_vector(),
            Err(SweepError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }
}
