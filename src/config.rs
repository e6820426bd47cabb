//! Device configuration for chirped contra-directional couplers.

use serde::{Deserialize, Serialize};

use crate::error::{CdcError, Result};

/// Speed of light in vacuum [m/s].
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Shape of the coupling-strength apodization window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApodShape {
    Gaussian,
    Tanh,
}

/// A device parameter that may be uniform or linearly chirped along the
/// grating. A scalar value is the degenerate range `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChirpRange {
    pub start: f64,
    pub end: f64,
}

impl ChirpRange {
    pub fn uniform(value: f64) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn mean(&self) -> f64 {
        0.5 * (self.start + self.end)
    }

    pub fn is_uniform(&self) -> bool {
        self.start == self.end
    }
}

impl From<f64> for ChirpRange {
    fn from(value: f64) -> Self {
        Self::uniform(value)
    }
}

impl From<(f64, f64)> for ChirpRange {
    fn from((start, end): (f64, f64)) -> Self {
        Self::new(start, end)
    }
}

/// Immutable description of a chirped contra-directional coupler.
///
/// All lengths are in meters, temperatures in kelvin, coupling in 1/m and
/// propagation loss in dB/cm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Total number of grating periods.
    pub n_periods: u64,
    /// Number of apodization/chirp segments.
    pub n_seg: usize,
    /// Grating pitch, uniform or [start, end] for a linear chirp.
    pub period: ChirpRange,
    /// Maximum coupling strength kappa [1/m].
    pub kappa: f64,
    /// Apodization window shape.
    pub apod_shape: ApodShape,
    /// Gaussian apodization constant; 0 disables windowing.
    pub apod_gauss_const: f64,
    /// Propagation loss [dB/cm].
    pub alpha_db_per_cm: f64,
    /// Device temperature [K].
    pub temperature_k: f64,
    /// Number of wavelength samples across `wvl_range`.
    pub resolution: usize,
    /// Simulated wavelength window [m], strictly increasing.
    pub wvl_range: (f64, f64),
    /// Number of cascaded stages.
    pub stages: usize,
    /// Width of waveguide 1, uniform or chirped [m].
    pub w1: ChirpRange,
    /// Width of waveguide 2, uniform or chirped [m].
    pub w2: ChirpRange,
    /// Target reflection wavelength range enabling chirp optimization.
    pub target_wvl: Option<(f64, f64)>,
    /// Smallest resolvable pitch increment (mask grid) [m].
    pub period_chirp_step: f64,
    /// Smallest resolvable width increment (mask grid) [m].
    pub w_chirp_step: f64,
    /// Self-coupling strength relative to cross-coupling.
    pub anti_reflection_ratio: f64,
    /// Thermo-optic coefficient dn_eff/dT [1/K].
    pub thermal_coeff: f64,
    /// Reference temperature of the index tables [K].
    pub reference_temperature_k: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            n_periods: 1000,
            n_seg: 50,
            period: ChirpRange::uniform(322e-9),
            kappa: 48_000.0,
            apod_shape: ApodShape::Gaussian,
            apod_gauss_const: 12.0,
            alpha_db_per_cm: 10.0,
            temperature_k: 300.0,
            resolution: 300,
            wvl_range: (1530e-9, 1580e-9),
            stages: 1,
            w1: ChirpRange::uniform(0.56e-6),
            w2: ChirpRange::uniform(0.44e-6),
            target_wvl: None,
            period_chirp_step: 2e-9,
            w_chirp_step: 1e-9,
            anti_reflection_ratio: 0.01,
            thermal_coeff: 1.87e-4,
            reference_temperature_k: 300.0,
        }
    }
}

impl DeviceConfig {
    /// Check all configuration invariants, eagerly, before any simulation.
    pub fn validate(&self) -> Result<()> {
        if self.n_seg < 1 {
            return Err(CdcError::Configuration(format!(
                "n_seg must be >= 1, got {}",
                self.n_seg
            )));
        }
        if self.n_periods < 1 {
            return Err(CdcError::Configuration(format!(
                "n_periods must be >= 1, got {}",
                self.n_periods
            )));
        }
        if self.resolution < 2 {
            return Err(CdcError::Configuration(format!(
                "resolution must be >= 2, got {}",
                self.resolution
            )));
        }
        if self.wvl_range.0 >= self.wvl_range.1 {
            return Err(CdcError::Configuration(format!(
                "wavelength range must be strictly increasing, got [{:.4e}, {:.4e}]",
                self.wvl_range.0, self.wvl_range.1
            )));
        }
        if self.stages < 1 {
            return Err(CdcError::Configuration(format!(
                "stages must be >= 1, got {}",
                self.stages
            )));
        }
        if self.kappa < 0.0 {
            return Err(CdcError::Configuration(format!(
                "kappa must be non-negative, got {}",
                self.kappa
            )));
        }
        if self.period_chirp_step <= 0.0 || self.w_chirp_step <= 0.0 {
            return Err(CdcError::Configuration(
                "chirp step sizes must be positive".into(),
            ));
        }
        if let Some((start, end)) = self.target_wvl {
            if start > end {
                return Err(CdcError::Configuration(format!(
                    "target wavelength range must be non-decreasing, got [{:.4e}, {:.4e}]",
                    start, end
                )));
            }
        }
        Ok(())
    }

    /// Wavelength sampling grid: `resolution` points across `wvl_range`.
    pub fn wavelength_grid(&self) -> Vec<f64> {
        let (lo, hi) = self.wvl_range;
        let step = (hi - lo) / (self.resolution - 1) as f64;
        (0..self.resolution).map(|i| lo + i as f64 * step).collect()
    }

    /// Mean physical length of one apodization segment [m].
    pub fn segment_length(&self) -> f64 {
        self.n_periods as f64 * self.period.mean() / self.n_seg as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(DeviceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_wavelength_range() {
        let config = DeviceConfig {
            wvl_range: (1580e-9, 1530e-9),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(crate::error::CdcError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_low_resolution() {
        let config = DeviceConfig {
            resolution: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_segments() {
        let config = DeviceConfig {
            n_seg: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wavelength_grid_endpoints() {
        let config = DeviceConfig {
            resolution: 100,
            ..Default::default()
        };
        let grid = config.wavelength_grid();
        assert_eq!(grid.len(), 100);
        assert!((grid[0] - 1530e-9).abs() < 1e-18);
        assert!((grid[99] - 1580e-9).abs() < 1e-18);
    }

    #[test]
    fn test_segment_length() {
        let config = DeviceConfig::default();
        assert!((config.segment_length() - 6.44e-6).abs() < 1e-12);
    }

    #[test]
    fn test_scalar_equals_degenerate_range() {
        let range: ChirpRange = (322e-9).into();
        assert!(range.is_uniform());
        assert_eq!(range.mean(), 322e-9);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = DeviceConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: DeviceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_seg, config.n_seg);
        assert_eq!(back.period, config.period);
    }
}
