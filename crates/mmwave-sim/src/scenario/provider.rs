//! SINR providers
//!
//! The scenario asks a [`SinrProvider`] for the SINR a UE would measure
//! against a gNB given both nodes' current beamforming weights.
//! [`SyntheticSinrProvider`] models each link as a single line-of-sight path
//! between two half-wavelength uniform linear arrays, plus per-band log-normal
//! shadowing.

use std::collections::HashMap;
use std::f64::consts::PI;

use mmwave_core::{ComplexWeight, SimTime};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use super::{ScenarioError, ScenarioResult};
use crate::device::DeviceId;
use crate::measurement::SinrSpectrum;

/// Array gain below this is treated as a null.
const MIN_ARRAY_GAIN: f64 = 1e-12;

/// Source of per-band SINR measurements.
pub trait SinrProvider {
    /// SINR in dB per band seen by the UE from `device` with the given
    /// transmit and receive weights.
    fn sinr(
        &mut self,
        device: DeviceId,
        tx_weights: &[ComplexWeight],
        rx_weights: &[ComplexWeight],
        now: SimTime,
    ) -> SinrSpectrum;
}

/// Geometry and budget of one gNB to UE link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkGeometry {
    /// Angle of departure at the gNB array, degrees from broadside
    pub departure_deg: f64,
    /// Angle of arrival at the UE array, degrees from broadside
    pub arrival_deg: f64,
    /// SINR with single-element arrays at both ends, in dB
    pub element_sinr_db: f64,
}

/// Steering vector of an `n`-element half-wavelength ULA.
pub fn steering_vector(n: usize, angle_deg: f64) -> Vec<Complex64> {
    let sin_theta = angle_deg.to_radians().sin();
    (0..n)
        .map(|m| Complex64::from_polar(1.0, -PI * m as f64 * sin_theta))
        .collect()
}

/// Power gain `|w^H a|^2` of weights `w` towards `angle_deg`.
pub fn array_gain(weights: &[ComplexWeight], angle_deg: f64) -> f64 {
    let steering = steering_vector(weights.len(), angle_deg);
    weights
        .iter()
        .zip(&steering)
        .map(|(w, a)| w.conj() * a)
        .sum::<Complex64>()
        .norm_sqr()
}

/// Line-of-sight SINR model with seeded shadowing.
#[derive(Debug, Clone)]
pub struct SyntheticSinrProvider {
    links: HashMap<DeviceId, LinkGeometry>,
    num_bands: usize,
    shadowing: Normal<f64>,
    rng: StdRng,
    seed: u64,
}

impl SyntheticSinrProvider {
    pub fn new(num_bands: usize, shadowing_std_db: f64, seed: u64) -> ScenarioResult<Self> {
        let shadowing = Normal::new(0.0, shadowing_std_db).map_err(|e| {
            ScenarioError::InvalidConfig(format!("shadowing std {shadowing_std_db}: {e}"))
        })?;
        Ok(Self {
            links: HashMap::new(),
            num_bands,
            shadowing,
            rng: StdRng::seed_from_u64(seed),
            seed,
        })
    }

    pub fn add_link(&mut self, device: DeviceId, link: LinkGeometry) {
        self.links.insert(device, link);
    }

    pub fn link(&self, device: DeviceId) -> Option<&LinkGeometry> {
        self.links.get(&device)
    }

    /// Restart the shadowing sequence.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

impl SinrProvider for SyntheticSinrProvider {
    fn sinr(
        &mut self,
        device: DeviceId,
        tx_weights: &[ComplexWeight],
        rx_weights: &[ComplexWeight],
        _now: SimTime,
    ) -> SinrSpectrum {
        // Unknown devices report nothing; an empty spectrum is never selected.
        let Some(&link) = self.links.get(&device) else {
            return Vec::new();
        };

        let gain = array_gain(tx_weights, link.departure_deg) * array_gain(rx_weights, link.arrival_deg);
        let mean_db = link.element_sinr_db + 10.0 * gain.max(MIN_ARRAY_GAIN).log10();

        (0..self.num_bands)
            .map(|_| mean_db + self.shadowing.sample(&mut self.rng))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmwave_core::Codebook;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    /// Angle at which DFT beam `k` of an `n`-element array peaks.
    fn dft_angle(k: usize, n: usize) -> f64 {
        (2.0 * k as f64 / n as f64).asin().to_degrees()
    }

    #[test]
    fn test_dft_beam_peaks_at_its_angle() {
        let cb = Codebook::dft(8);
        let angle = dft_angle(1, 8);
        let gains: Vec<f64> = cb.iter().map(|w| array_gain(w, angle)).collect();
        assert!(approx_eq(gains[1], 8.0, 1e-9));
        for (k, g) in gains.iter().enumerate() {
            if k != 1 {
                assert!(*g < 1e-9, "beam {k} gain {g}");
            }
        }
    }

    #[test]
    fn test_broadside_gain() {
        let w = vec![Complex64::new(0.5, 0.0); 4];
        assert!(approx_eq(array_gain(&w, 0.0), 4.0, 1e-12));
    }

    #[test]
    fn test_sinr_without_shadowing() {
        let cb_tx = Codebook::dft(8);
        let cb_rx = Codebook::dft(4);
        let mut provider = SyntheticSinrProvider::new(3, 0.0, 1).unwrap();
        provider.add_link(
            DeviceId(0),
            LinkGeometry {
                departure_deg: dft_angle(3, 8),
                arrival_deg: dft_angle(1, 4),
                element_sinr_db: 0.0,
            },
        );

        let sinr = provider.sinr(DeviceId(0), cb_tx.get(3).unwrap(), cb_rx.get(1).unwrap(), SimTime::ZERO);
        assert_eq!(sinr.len(), 3);
        let expected = 10.0 * 32.0_f64.log10();
        assert!(sinr.iter().all(|s| approx_eq(*s, expected, 1e-9)));

        let null = provider.sinr(DeviceId(0), cb_tx.get(0).unwrap(), cb_rx.get(1).unwrap(), SimTime::ZERO);
        assert!(null.iter().all(|s| *s <= -100.0));
    }

    #[test]
    fn test_unknown_device_reports_nothing() {
        let mut provider = SyntheticSinrProvider::new(4, 1.0, 7).unwrap();
        let w = vec![Complex64::new(1.0, 0.0)];
        assert!(provider.sinr(DeviceId(9), &w, &w, SimTime::ZERO).is_empty());
    }

    #[test]
    fn test_shadowing_is_seeded() {
        let w = vec![Complex64::new(1.0, 0.0); 2];
        let link = LinkGeometry {
            departure_deg: 0.0,
            arrival_deg: 0.0,
            element_sinr_db: 5.0,
        };
        let mut a = SyntheticSinrProvider::new(4, 3.0, 99).unwrap();
        let mut b = SyntheticSinrProvider::new(4, 3.0, 99).unwrap();
        a.add_link(DeviceId(0), link);
        b.add_link(DeviceId(0), link);

        let first = a.sinr(DeviceId(0), &w, &w, SimTime::ZERO);
        assert_eq!(first, b.sinr(DeviceId(0), &w, &w, SimTime::ZERO));

        a.reset();
        assert_eq!(first, a.sinr(DeviceId(0), &w, &w, SimTime::ZERO));
    }

    #[test]
    fn test_invalid_shadowing() {
        assert!(SyntheticSinrProvider::new(4, f64::NAN, 0).is_err());
    }
}
