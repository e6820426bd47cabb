//! Per-segment apodization and chirp profile synthesis.
//!
//! Profiles are value objects built once per simulation run from a
//! `DeviceConfig`; nothing here mutates shared state.

use serde::{Deserialize, Serialize};

use crate::cache::ChirpCache;
use crate::config::{ApodShape, ChirpRange, DeviceConfig};
use crate::error::{CdcError, Result};
use crate::mode_index::ModeIndexProvider;
use crate::optimize;

/// Sharpness of the raised-tanh apodization window.
const TANH_EXPONENT: f64 = 2.0;
const TANH_STEEPNESS: f64 = 3.0;

/// Ordered per-segment physical profiles of one grating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    /// Coupling strength per segment [1/m].
    pub kappa: Vec<f64>,
    /// Grating pitch per segment [m].
    pub period: Vec<f64>,
    /// Waveguide 1 width per segment [m].
    pub w1: Vec<f64>,
    /// Waveguide 2 width per segment [m].
    pub w2: Vec<f64>,
    /// Temperature per segment [K].
    pub temperature: Vec<f64>,
}

impl SegmentProfile {
    pub fn len(&self) -> usize {
        self.kappa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kappa.is_empty()
    }
}

/// Snap a value onto the grid of exact multiples of `step`.
pub fn snap_to_grid(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Build the coupling-strength apodization sequence, length `n_seg`.
pub fn build_apodization(config: &DeviceConfig) -> Vec<f64> {
    let n_seg = config.n_seg;
    match config.apod_shape {
        ApodShape::Gaussian => {
            if config.apod_gauss_const == 0.0 {
                // No windowing: uniform maximum coupling.
                return vec![config.kappa; n_seg];
            }
            // Gaussian window evaluated at half-sample segment centers.
            let a = config.apod_gauss_const;
            let n = n_seg as f64;
            let window: Vec<f64> = (0..n_seg)
                .map(|i| {
                    let x = (i as f64 + 0.5) - 0.5 * n;
                    (-a * x * x / (n * n)).exp()
                })
                .collect();

            let min = window.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;

            let mut kappa: Vec<f64> = window
                .iter()
                .map(|&w| {
                    let normalized = if span > 0.0 { (w - min) / span } else { 1.0 };
                    config.kappa * normalized
                })
                .collect();

            // Force zero coupling at both ends to avoid abrupt
            // discontinuities at the grating boundaries.
            kappa[0] = 0.0;
            kappa[n_seg - 1] = 0.0;
            kappa
        }
        ApodShape::Tanh => {
            // Raised-tanh half-window, mirrored about the device center.
            let n = n_seg as f64;
            let half_len = n_seg - n_seg / 2;
            let half: Vec<f64> = (0..half_len)
                .map(|z| {
                    let u = (2.0 * z as f64 / n).powf(TANH_EXPONENT);
                    0.5 * (1.0 + (TANH_STEEPNESS * (1.0 - 2.0 * u)).tanh())
                })
                .collect();

            let mut apod: Vec<f64> = half.iter().rev().cloned().collect();
            // Odd lengths keep a single center sample.
            apod.extend(half.iter().skip(n_seg % 2).cloned());
            apod.iter().map(|&w| config.kappa * w).collect()
        }
    }
}

/// Build the pitch and width chirp sequences without target-wavelength
/// optimization, each of length `n_seg` and snapped to its step grid.
pub fn build_chirp(config: &DeviceConfig) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n_seg = config.n_seg;

    // Pitch: ladder of mask-resolvable steps from start to end, each rung
    // repeated so the ladder spans the device, padded with the last rung.
    let step = config.period_chirp_step;
    let mut rungs = Vec::new();
    let mut p = config.period.start;
    while p <= config.period.end + step / 100.0 {
        rungs.push(snap_to_grid(p, step));
        p += step;
    }
    if rungs.is_empty() {
        rungs.push(snap_to_grid(config.period.start, step));
    }

    let per_rung = ((n_seg as f64 / rungs.len() as f64).round() as usize).max(1);
    let mut period = Vec::with_capacity(n_seg);
    'outer: for &rung in &rungs {
        for _ in 0..per_rung {
            period.push(rung);
            if period.len() == n_seg {
                break 'outer;
            }
        }
    }
    while period.len() < n_seg {
        period.push(*rungs.last().unwrap());
    }

    // Widths: linear interpolation snapped to the width grid.
    let linspace_snapped = |range: &ChirpRange| -> Vec<f64> {
        (0..n_seg)
            .map(|i| {
                let t = if n_seg > 1 {
                    i as f64 / (n_seg - 1) as f64
                } else {
                    0.0
                };
                let w = range.start + t * (range.end - range.start);
                snap_to_grid(w, config.w_chirp_step)
            })
            .collect()
    };

    (period, linspace_snapped(&config.w1), linspace_snapped(&config.w2))
}

/// Build the full per-segment profile for a device.
///
/// When a target wavelength range is configured the pitch/width sequences
/// come from the chirp optimizer (read through the cache when one is
/// given); otherwise they follow the configured linear chirp.
pub fn build_profile<P: ModeIndexProvider>(
    config: &DeviceConfig,
    provider: &P,
    cache: Option<&ChirpCache>,
) -> Result<SegmentProfile> {
    config.validate()?;

    let kappa = build_apodization(config);
    let (period, w1, w2) = match config.target_wvl {
        Some(_) => optimize::optimize_chirp(config, provider, cache)?,
        None => {
            if config.period.start > config.period.end {
                return Err(CdcError::Configuration(format!(
                    "period chirp must be non-decreasing, got [{:.4e}, {:.4e}]",
                    config.period.start, config.period.end
                )));
            }
            build_chirp(config)
        }
    };
    let temperature = vec![config.temperature_k; config.n_seg];

    Ok(SegmentProfile {
        kappa,
        period,
        w1,
        w2,
        temperature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApodShape, ChirpRange, DeviceConfig};

    #[test]
    fn test_profile_lengths_match_n_seg() {
        let config = DeviceConfig {
            n_seg: 37,
            ..Default::default()
        };
        let kappa = build_apodization(&config);
        let (period, w1, w2) = build_chirp(&config);
        assert_eq!(kappa.len(), 37);
        assert_eq!(period.len(), 37);
        assert_eq!(w1.len(), 37);
        assert_eq!(w2.len(), 37);
    }

    #[test]
    fn test_gaussian_endpoints_zero() {
        let config = DeviceConfig::default();
        let kappa = build_apodization(&config);
        assert_eq!(kappa[0], 0.0);
        assert_eq!(kappa[config.n_seg - 1], 0.0);
    }

    #[test]
    fn test_gaussian_bounded_by_kappa_max() {
        let config = DeviceConfig::default();
        let kappa = build_apodization(&config);
        for &k in &kappa {
            assert!(k >= 0.0 && k <= config.kappa + 1e-9);
        }
        let peak = kappa.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!((peak - config.kappa).abs() < 1e-6);
    }

    #[test]
    fn test_gaussian_zero_constant_is_uniform() {
        let config = DeviceConfig {
            apod_gauss_const: 0.0,
            ..Default::default()
        };
        let kappa = build_apodization(&config);
        assert!(kappa.iter().all(|&k| k == config.kappa));
    }

    #[test]
    fn test_tanh_symmetric_and_sized() {
        for n_seg in [20, 21] {
            let config = DeviceConfig {
                apod_shape: ApodShape::Tanh,
                n_seg,
                ..Default::default()
            };
            let kappa = build_apodization(&config);
            assert_eq!(kappa.len(), n_seg);
            for i in 0..n_seg {
                assert!((kappa[i] - kappa[n_seg - 1 - i]).abs() < 1e-9);
            }
            // Window peaks at the center, not at the edges.
            assert!(kappa[n_seg / 2] > kappa[0]);
        }
    }

    #[test]
    fn test_chirp_values_on_step_grid() {
        let config = DeviceConfig {
            period: ChirpRange::new(316e-9, 324e-9),
            w1: ChirpRange::new(0.55e-6, 0.57e-6),
            w2: ChirpRange::new(0.43e-6, 0.45e-6),
            ..Default::default()
        };
        let (period, w1, w2) = build_chirp(&config);
        for &p in &period {
            let m = p / config.period_chirp_step;
            assert!((m - m.round()).abs() < 1e-6, "period {} off grid", p);
        }
        for &w in w1.iter().chain(w2.iter()) {
            let m = w / config.w_chirp_step;
            assert!((m - m.round()).abs() < 1e-6, "width {} off grid", w);
        }
    }

    #[test]
    fn test_chirp_monotone_and_spanning() {
        let config = DeviceConfig {
            period: ChirpRange::new(316e-9, 324e-9),
            ..Default::default()
        };
        let (period, _, _) = build_chirp(&config);
        assert!((period[0] - 316e-9).abs() < 1e-15);
        assert!((period[config.n_seg - 1] - 324e-9).abs() < 1e-15);
        for w in period.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn test_scalar_period_behaves_as_degenerate_range() {
        let scalar = DeviceConfig::default();
        let range = DeviceConfig {
            period: ChirpRange::new(322e-9, 322e-9),
            ..Default::default()
        };
        assert_eq!(build_chirp(&scalar).0, build_chirp(&range).0);
    }

    #[test]
    fn test_descending_period_range_rejected() {
        let provider = crate::mode_index::EffectiveIndexTable::silicon_strip();
        let config = DeviceConfig {
            period: ChirpRange::new(324e-9, 316e-9),
            ..Default::default()
        };
        assert!(matches!(
            build_profile(&config, &provider, None),
            Err(CdcError::Configuration(_))
        ));
    }

    #[test]
    fn test_snap_to_grid() {
        assert!((snap_to_grid(321.4e-9, 2e-9) - 322e-9).abs() < 1e-18);
        assert!((snap_to_grid(0.5604e-6, 1e-9) - 0.560e-6).abs() < 1e-18);
    }
}
