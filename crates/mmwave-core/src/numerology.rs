//! # NR Numerology and PHY/MAC Timing
//!
//! Holds the frame structure and HARQ timing parameters used by the scheduler
//! and frame generator. The sub-carrier spacing (SCS) selects a row of the
//! timing table below; everything else derived from it is recomputed in one
//! step so the configuration is never observed half-updated.
//!
//! | SCS     | Symbol (us) | Slots/subframe | Slot (us) | SS burst pattern |
//! |---------|-------------|----------------|-----------|------------------|
//! | 60 kHz  | 16.67       | 4              | 250       | yes              |
//! | 120 kHz | 8.33        | 8              | 125       | yes              |
//! | 240 kHz | 4.16        | 16             | 62.5      | yes              |
//! | 480 kHz | 2.08        | 32             | 31.25     | none (all slots) |
//! | 960 kHz | 1.04        | 64             | 15.625    | none (all slots) |
//!
//! Slots always carry 14 OFDM symbols, so
//! `symbols_per_subframe = 14 * slots_per_subframe` and the highest SS block
//! slot id within a 5 ms half-frame is `5 * slots_per_subframe`.
//!
//! ## Example
//!
//! ```
//! use mmwave_core::numerology::{NumerologyConfig, SubcarrierSpacing};
//!
//! let mut num = NumerologyConfig::default();
//! num.set_sub_carrier_spacing(SubcarrierSpacing::Khz240);
//! assert_eq!(num.symbols_per_subframe(), 224);
//! assert!(num.is_sync_burst_slot(3));
//! assert!(!num.is_sync_burst_slot(17));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timing::micros_f64;

/// OFDM symbols per slot (normal cyclic prefix).
pub const SYMBOLS_PER_SLOT: u32 = 14;

/// Subframes in one SS burst half-frame window.
const SUBFRAMES_PER_HALF_FRAME: u32 = 5;

/// Result type for numerology operations.
pub type NumerologyResult<T> = Result<T, NumerologyError>;

/// Numerology configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumerologyError {
    #[error("unsupported sub-carrier spacing: {0} kHz")]
    UnsupportedSpacing(u32),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("invalid TDD pattern {0:?}: expected a non-empty sequence of 'c' and 'd'")]
    InvalidTddPattern(String),
}

/// Sub-carrier spacing selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubcarrierSpacing {
    #[serde(rename = "60khz")]
    Khz60,
    #[serde(rename = "120khz")]
    Khz120,
    #[serde(rename = "240khz")]
    Khz240,
    #[serde(rename = "480khz")]
    Khz480,
    #[serde(rename = "960khz")]
    Khz960,
}

/// One row of the spacing table.
#[derive(Debug, Clone, Copy)]
struct SpacingTiming {
    symbol_period_us: f64,
    slots_per_subframe: u32,
    slot_period_us: f64,
}

impl SubcarrierSpacing {
    /// Every supported spacing, narrowest first.
    pub const ALL: [SubcarrierSpacing; 5] = [
        SubcarrierSpacing::Khz60,
        SubcarrierSpacing::Khz120,
        SubcarrierSpacing::Khz240,
        SubcarrierSpacing::Khz480,
        SubcarrierSpacing::Khz960,
    ];

    /// Spacing in kHz.
    pub fn khz(self) -> u32 {
        match self {
            SubcarrierSpacing::Khz60 => 60,
            SubcarrierSpacing::Khz120 => 120,
            SubcarrierSpacing::Khz240 => 240,
            SubcarrierSpacing::Khz480 => 480,
            SubcarrierSpacing::Khz960 => 960,
        }
    }

    /// Look up a spacing by its value in kHz.
    pub fn from_khz(khz: u32) -> NumerologyResult<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.khz() == khz)
            .ok_or(NumerologyError::UnsupportedSpacing(khz))
    }

    fn timing(self) -> SpacingTiming {
        let (symbol_period_us, slots_per_subframe, slot_period_us) = match self {
            SubcarrierSpacing::Khz60 => (16.67, 4, 250.0),
            SubcarrierSpacing::Khz120 => (8.33, 8, 125.0),
            SubcarrierSpacing::Khz240 => (4.16, 16, 62.5),
            SubcarrierSpacing::Khz480 => (2.08, 32, 31.25),
            SubcarrierSpacing::Khz960 => (1.04, 64, 15.625),
        };
        SpacingTiming {
            symbol_period_us,
            slots_per_subframe,
            slot_period_us,
        }
    }

    /// Slot ids (within a 5 ms half-frame) that carry SS blocks.
    ///
    /// An empty set means every slot is eligible.
    pub fn ss_burst_pattern(self) -> BTreeSet<u16> {
        match self {
            // 120 kHz layout at half the slot rate.
            SubcarrierSpacing::Khz60 => (0..20).filter(|s| s % 5 < 4).collect(),
            // Blocks at symbols {4,8,16,20}+28n, n in {0..3,5..8,10..13,15..18}.
            SubcarrierSpacing::Khz120 => (0..40).filter(|s| s % 10 < 8).collect(),
            // Blocks at symbols {8,12,16,20,32,36,40,44}+56n, n in {0..3,5..8}.
            SubcarrierSpacing::Khz240 => (0..40).filter(|s| s % 20 < 16).collect(),
            SubcarrierSpacing::Khz480 | SubcarrierSpacing::Khz960 => BTreeSet::new(),
        }
    }
}

impl Default for SubcarrierSpacing {
    fn default() -> Self {
        SubcarrierSpacing::Khz120
    }
}

impl fmt::Display for SubcarrierSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz", self.khz())
    }
}

/// Independent numerology parameters, as read from configuration.
///
/// Fields derived from the sub-carrier spacing are not part of this
/// structure; [`NumerologyConfig::from_params`] computes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumerologyParams {
    /// Sub-carrier spacing selector
    pub sub_carrier_spacing: SubcarrierSpacing,
    /// Subframe period in microseconds
    pub subframe_period_us: f64,
    /// OFDM symbols for DL control per subframe
    pub ctrl_symbols: u32,
    /// DL control symbols (SS block occupies 4)
    pub dl_ctrl_symbols: u32,
    /// UL control symbols
    pub ul_ctrl_symbols: u32,
    /// Subframes per frame
    pub subframes_per_frame: u32,
    /// Reference symbols per slot
    pub num_ref_symbols: u32,
    /// Resource blocks per resource block group
    pub num_rb_per_rbg: u32,
    /// Sub-carriers per chunk
    pub num_sub_carriers_per_chunk: u32,
    /// Chunks per resource block
    pub chunks_per_rb: u32,
    /// Reference sub-carriers per resource block
    pub num_ref_sc_per_rb: u32,
    /// Reference sub-carriers per symbol
    pub num_ref_sc_per_sym: u32,
    /// Chunk width in Hz
    pub chunk_width_hz: f64,
    /// Resource blocks spanning the bandwidth
    pub num_rb: u32,
    /// Concurrent stop-and-wait HARQ processes per user
    pub num_harq_process: u8,
    /// HARQ DL timeout in slots
    pub harq_timeout: u8,
    /// Carrier center frequency in Hz
    pub center_frequency_hz: f64,
    /// UL-to-DL guard period in microseconds
    pub guard_period_us: f64,
    /// L1/L2 control latency in slots
    pub l1_l2_ctrl_latency: u32,
    /// L1/L2 data latency in slots
    pub l1_l2_data_latency: u32,
    /// Slots between an UL scheduling decision and the slot it applies to
    pub ul_sched_delay: u32,
    /// Wideband DL-CQI report period in microseconds
    pub wb_cqi_period_us: u32,
    /// Transport block decode latency in microseconds
    pub tb_decode_latency_us: u32,
    /// Maximum transport block size in bytes
    pub max_tb_size_bytes: u32,
    /// Periodic CSI report period in slots
    pub csi_report_periodicity: u32,
    /// Control/data TDD pattern, e.g. "ccddccdd"
    pub tdd_pattern: String,
}

impl Default for NumerologyParams {
    fn default() -> Self {
        Self {
            sub_carrier_spacing: SubcarrierSpacing::Khz120,
            subframe_period_us: 1000.0,
            ctrl_symbols: 1,
            dl_ctrl_symbols: 4,
            ul_ctrl_symbols: 1,
            subframes_per_frame: 10,
            num_ref_symbols: 6,
            num_rb_per_rbg: 1,
            num_sub_carriers_per_chunk: 48,
            chunks_per_rb: 72,
            num_ref_sc_per_rb: 6,
            num_ref_sc_per_sym: 864,
            chunk_width_hz: 13.889e6,
            num_rb: 1,
            num_harq_process: 20,
            harq_timeout: 20,
            center_frequency_hz: 28e9,
            guard_period_us: 16.67,
            l1_l2_ctrl_latency: 2,
            l1_l2_data_latency: 2,
            ul_sched_delay: 1,
            wb_cqi_period_us: 500,
            tb_decode_latency_us: 100,
            max_tb_size_bytes: 0x7FFF,
            csi_report_periodicity: 5,
            tdd_pattern: "ccddccdd".to_string(),
        }
    }
}

fn positive(field: &'static str, value: f64) -> NumerologyResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(NumerologyError::Invalid {
            field,
            reason: format!("must be positive, got {value}"),
        })
    }
}

fn nonzero(field: &'static str, value: u32) -> NumerologyResult<()> {
    if value == 0 {
        Err(NumerologyError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        })
    } else {
        Ok(())
    }
}

fn within_slot(field: &'static str, value: u32) -> NumerologyResult<()> {
    if value > SYMBOLS_PER_SLOT {
        Err(NumerologyError::Invalid {
            field,
            reason: format!("{value} exceeds {SYMBOLS_PER_SLOT} symbols per slot"),
        })
    } else {
        Ok(())
    }
}

impl NumerologyParams {
    /// Check every field for a usable value.
    pub fn validate(&self) -> NumerologyResult<()> {
        positive("subframe_period_us", self.subframe_period_us)?;
        positive("chunk_width_hz", self.chunk_width_hz)?;
        positive("center_frequency_hz", self.center_frequency_hz)?;
        if !self.guard_period_us.is_finite() || self.guard_period_us < 0.0 {
            return Err(NumerologyError::Invalid {
                field: "guard_period_us",
                reason: format!("must be non-negative, got {}", self.guard_period_us),
            });
        }

        nonzero("subframes_per_frame", self.subframes_per_frame)?;
        nonzero("num_sub_carriers_per_chunk", self.num_sub_carriers_per_chunk)?;
        nonzero("chunks_per_rb", self.chunks_per_rb)?;
        nonzero("num_rb", self.num_rb)?;
        nonzero("num_rb_per_rbg", self.num_rb_per_rbg)?;
        nonzero("num_harq_process", u32::from(self.num_harq_process))?;

        within_slot("ctrl_symbols", self.ctrl_symbols)?;
        within_slot("dl_ctrl_symbols", self.dl_ctrl_symbols)?;
        within_slot("ul_ctrl_symbols", self.ul_ctrl_symbols)?;
        within_slot("num_ref_symbols", self.num_ref_symbols)?;

        if self.tdd_pattern.is_empty() || !self.tdd_pattern.chars().all(|c| c == 'c' || c == 'd') {
            return Err(NumerologyError::InvalidTddPattern(self.tdd_pattern.clone()));
        }
        Ok(())
    }
}

/// A consistent numerology: independent parameters plus the timing derived
/// from the sub-carrier spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct NumerologyConfig {
    params: NumerologyParams,
    symbols_per_slot: u32,
    symbol_period_us: f64,
    slots_per_subframe: u32,
    symbols_per_subframe: u32,
    slot_period_us: f64,
    ss_burst_pattern: BTreeSet<u16>,
    max_ss_block_slot_id: u16,
    current_ss_block_slot_id: u16,
}

impl Default for NumerologyConfig {
    fn default() -> Self {
        Self::build(NumerologyParams::default())
    }
}

impl NumerologyConfig {
    /// Default configuration at the given spacing.
    pub fn new(spacing: SubcarrierSpacing) -> Self {
        Self::build(NumerologyParams {
            sub_carrier_spacing: spacing,
            ..Default::default()
        })
    }

    /// Validate parameters and derive the spacing-dependent timing.
    pub fn from_params(params: NumerologyParams) -> NumerologyResult<Self> {
        params.validate()?;
        Ok(Self::build(params))
    }

    fn build(params: NumerologyParams) -> Self {
        let spacing = params.sub_carrier_spacing;
        let mut config = Self {
            params,
            symbols_per_slot: SYMBOLS_PER_SLOT,
            symbol_period_us: 0.0,
            slots_per_subframe: 0,
            symbols_per_subframe: 0,
            slot_period_us: 0.0,
            ss_burst_pattern: BTreeSet::new(),
            max_ss_block_slot_id: 0,
            current_ss_block_slot_id: 0,
        };
        config.set_sub_carrier_spacing(spacing);
        config
    }

    /// Switch sub-carrier spacing and recompute every dependent field.
    pub fn set_sub_carrier_spacing(&mut self, spacing: SubcarrierSpacing) {
        let timing = spacing.timing();
        self.params.sub_carrier_spacing = spacing;
        self.symbols_per_slot = SYMBOLS_PER_SLOT;
        self.symbol_period_us = timing.symbol_period_us;
        self.slots_per_subframe = timing.slots_per_subframe;
        self.slot_period_us = timing.slot_period_us;
        self.ss_burst_pattern = spacing.ss_burst_pattern();
        self.symbols_per_subframe = self.symbols_per_slot * self.slots_per_subframe;
        self.max_ss_block_slot_id = (SUBFRAMES_PER_HALF_FRAME * self.slots_per_subframe) as u16;

        tracing::debug!(
            scs_khz = spacing.khz(),
            slots_per_subframe = self.slots_per_subframe,
            burst_slots = self.ss_burst_pattern.len(),
            "Numerology updated"
        );
    }

    /// Whether `slot_id` may carry SS blocks.
    ///
    /// With no burst pattern configured every slot is eligible.
    pub fn is_sync_burst_slot(&self, slot_id: u16) -> bool {
        if self.ss_burst_pattern.is_empty() {
            return true;
        }
        let included = self.ss_burst_pattern.contains(&slot_id);
        tracing::trace!(slot_id, included, "SS burst slot check");
        included
    }

    /// [`is_sync_burst_slot`](Self::is_sync_burst_slot) for the tracked
    /// current slot.
    pub fn current_sync_burst_slot_status(&self) -> bool {
        self.is_sync_burst_slot(self.current_ss_block_slot_id)
    }

    /// Set the SS block slot cursor (driven by the scheduler).
    pub fn set_current_ss_block_slot_id(&mut self, slot_id: u16) {
        self.current_ss_block_slot_id = slot_id;
    }

    pub fn current_ss_block_slot_id(&self) -> u16 {
        self.current_ss_block_slot_id
    }

    // ── Derived timing ──────────────────────────────────────────────────

    pub fn sub_carrier_spacing(&self) -> SubcarrierSpacing {
        self.params.sub_carrier_spacing
    }

    pub fn symbols_per_slot(&self) -> u32 {
        self.symbols_per_slot
    }

    /// Symbol period in microseconds.
    pub fn symbol_period_us(&self) -> f64 {
        self.symbol_period_us
    }

    pub fn slots_per_subframe(&self) -> u32 {
        self.slots_per_subframe
    }

    pub fn symbols_per_subframe(&self) -> u32 {
        self.symbols_per_subframe
    }

    /// Slot period in microseconds.
    pub fn slot_period_us(&self) -> f64 {
        self.slot_period_us
    }

    pub fn slot_period(&self) -> Duration {
        micros_f64(self.slot_period_us)
    }

    pub fn symbol_period(&self) -> Duration {
        micros_f64(self.symbol_period_us)
    }

    /// Slot ids carrying SS blocks; empty means all slots.
    pub fn ss_burst_pattern(&self) -> &BTreeSet<u16> {
        &self.ss_burst_pattern
    }

    /// Number of slots in the SS burst window (5 ms).
    pub fn max_ss_block_slot_id(&self) -> u16 {
        self.max_ss_block_slot_id
    }

    pub fn slots_per_frame(&self) -> u32 {
        self.slots_per_subframe * self.params.subframes_per_frame
    }

    /// Frame period in microseconds.
    pub fn frame_period_us(&self) -> f64 {
        self.params.subframe_period_us * f64::from(self.params.subframes_per_frame)
    }

    /// Occupied bandwidth in Hz.
    pub fn total_bandwidth_hz(&self) -> f64 {
        self.params.chunk_width_hz * f64::from(self.params.chunks_per_rb) * f64::from(self.params.num_rb)
    }

    // ── Independent parameters ──────────────────────────────────────────

    /// All independent parameters.
    pub fn params(&self) -> &NumerologyParams {
        &self.params
    }

    pub fn subframe_period_us(&self) -> f64 {
        self.params.subframe_period_us
    }

    pub fn subframes_per_frame(&self) -> u32 {
        self.params.subframes_per_frame
    }

    pub fn num_harq_process(&self) -> u8 {
        self.params.num_harq_process
    }

    pub fn harq_timeout(&self) -> u8 {
        self.params.harq_timeout
    }

    pub fn tb_decode_latency_us(&self) -> u32 {
        self.params.tb_decode_latency_us
    }

    pub fn guard_period_us(&self) -> f64 {
        self.params.guard_period_us
    }

    pub fn l1_l2_ctrl_latency(&self) -> u32 {
        self.params.l1_l2_ctrl_latency
    }

    pub fn l1_l2_data_latency(&self) -> u32 {
        self.params.l1_l2_data_latency
    }

    pub fn center_frequency_hz(&self) -> f64 {
        self.params.center_frequency_hz
    }

    pub fn tdd_pattern(&self) -> &str {
        &self.params.tdd_pattern
    }
}
