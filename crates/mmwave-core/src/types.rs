//! Core types shared by the beam management crates.

use num_complex::Complex64;

/// Beamforming weight for a single antenna element.
pub type ComplexWeight = Complex64;

/// One beam: a weight per antenna element.
pub type WeightVector = Vec<ComplexWeight>;

/// Index of a beam within a tx or rx codebook.
pub type BeamId = u16;

/// Beam id reported when no beam pair has been selected yet.
pub const UNSET_BEAM_ID: BeamId = 65535;

/// Average SINR reported when no beam pair has been selected yet.
pub const NO_SINR: f64 = -100.0;
