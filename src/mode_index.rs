//! Effective-index lookup and propagation-constant tables.
//!
//! The simulation core consumes mode indices through [`ModeIndexProvider`];
//! the bundled implementation interpolates a precomputed rectilinear
//! (w1, w2, wavelength) table trilinearly. Queries outside the table
//! domain are a hard error, never extrapolated.

use std::f64::consts::PI;

use ndarray::Array2;

use crate::config::DeviceConfig;
use crate::error::{CdcError, Result};
use crate::profile::SegmentProfile;

/// Supplies supermode effective indices per (geometry, wavelength).
pub trait ModeIndexProvider: Send + Sync {
    /// Effective indices (n1, n2) for waveguide widths `w1`, `w2` [m] at
    /// `wavelength` [m]. Deterministic and side-effect free.
    fn lookup(&self, w1: f64, w2: f64, wavelength: f64) -> Result<(f64, f64)>;
}

/// Precomputed effective-index table with trilinear interpolation.
#[derive(Debug, Clone)]
pub struct EffectiveIndexTable {
    w1_axis: Vec<f64>,
    w2_axis: Vec<f64>,
    wvl_axis: Vec<f64>,
    n1: Vec<f64>,
    n2: Vec<f64>,
}

impl EffectiveIndexTable {
    /// Build a table from grid axes and flattened index values laid out as
    /// `[w1][w2][wavelength]`.
    pub fn new(
        w1_axis: Vec<f64>,
        w2_axis: Vec<f64>,
        wvl_axis: Vec<f64>,
        n1: Vec<f64>,
        n2: Vec<f64>,
    ) -> Result<Self> {
        let expected = w1_axis.len() * w2_axis.len() * wvl_axis.len();
        if n1.len() != expected || n2.len() != expected {
            return Err(CdcError::Configuration(format!(
                "index table size mismatch: axes give {} nodes, data has {}/{}",
                expected,
                n1.len(),
                n2.len()
            )));
        }
        for axis in [&w1_axis, &w2_axis, &wvl_axis] {
            if axis.len() < 2 || axis.windows(2).any(|w| w[1] <= w[0]) {
                return Err(CdcError::Configuration(
                    "index table axes must be strictly increasing with >= 2 nodes".into(),
                ));
            }
        }
        Ok(Self {
            w1_axis,
            w2_axis,
            wvl_axis,
            n1,
            n2,
        })
    }

    /// Bundled silicon strip-waveguide dataset on a 5x5x5 grid covering
    /// w1 in [550, 570] nm, w2 in [430, 450] nm, wavelength in
    /// [1500, 1600] nm. Supermode index planes are fit to the reference
    /// device: phase match at 1561.2 nm for a 322 nm pitch, with pitch and
    /// width sensitivities matching the chirp optimizer's regression.
    pub fn silicon_strip() -> Self {
        let w1_axis = grid_axis(550e-9, 570e-9, 5);
        let w2_axis = grid_axis(430e-9, 450e-9, 5);
        let wvl_axis = grid_axis(1.5e-6, 1.6e-6, 5);

        let n1_at = |w1: f64, w2: f64, wvl: f64| {
            2.6193 - 1.086e6 * (wvl - 1.5612e-6)
                + 1.25e6 * (w1 - 0.56e-6)
                + 0.387e6 * (w2 - 0.44e-6)
        };
        let n2_at = |w1: f64, w2: f64, wvl: f64| {
            2.2292 - 1.086e6 * (wvl - 1.5612e-6)
                + 0.387e6 * (w1 - 0.56e-6)
                + 1.25e6 * (w2 - 0.44e-6)
        };

        let nodes = w1_axis.len() * w2_axis.len() * wvl_axis.len();
        let mut n1 = Vec::with_capacity(nodes);
        let mut n2 = Vec::with_capacity(nodes);
        for &w1 in &w1_axis {
            for &w2 in &w2_axis {
                for &wvl in &wvl_axis {
                    n1.push(n1_at(w1, w2, wvl));
                    n2.push(n2_at(w1, w2, wvl));
                }
            }
        }

        Self {
            w1_axis,
            w2_axis,
            wvl_axis,
            n1,
            n2,
        }
    }

    fn node(&self, i: usize, j: usize, k: usize) -> (f64, f64) {
        let idx = (i * self.w2_axis.len() + j) * self.wvl_axis.len() + k;
        (self.n1[idx], self.n2[idx])
    }
}

/// Inclusive linear grid axis with `count` nodes.
fn grid_axis(start: f64, end: f64, count: usize) -> Vec<f64> {
    let step = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// Locate the interpolation cell of `value` on `axis`.
fn cell(axis: &[f64], value: f64, name: &'static str) -> Result<(usize, f64)> {
    let min = axis[0];
    let max = axis[axis.len() - 1];
    if value < min || value > max {
        return Err(CdcError::DomainLookup {
            axis: name,
            value,
            min,
            max,
        });
    }
    let mut i = axis.partition_point(|&a| a <= value);
    // `value` == max lands past the end; interpolate in the last cell.
    i = i.clamp(1, axis.len() - 1) - 1;
    let t = (value - axis[i]) / (axis[i + 1] - axis[i]);
    Ok((i, t))
}

impl ModeIndexProvider for EffectiveIndexTable {
    fn lookup(&self, w1: f64, w2: f64, wavelength: f64) -> Result<(f64, f64)> {
        let (i, ti) = cell(&self.w1_axis, w1, "w1")?;
        let (j, tj) = cell(&self.w2_axis, w2, "w2")?;
        let (k, tk) = cell(&self.wvl_axis, wavelength, "wavelength")?;

        let mut n1 = 0.0;
        let mut n2 = 0.0;
        for (di, wi) in [(0, 1.0 - ti), (1, ti)] {
            for (dj, wj) in [(0, 1.0 - tj), (1, tj)] {
                for (dk, wk) in [(0, 1.0 - tk), (1, tk)] {
                    let (a, b) = self.node(i + di, j + dj, k + dk);
                    let w = wi * wj * wk;
                    n1 += w * a;
                    n2 += w * b;
                }
            }
        }
        Ok((n1, n2))
    }
}

/// Effective indices and propagation constants per (wavelength, segment).
#[derive(Debug, Clone)]
pub struct ModeIndexTable {
    /// Shape (resolution, n_seg).
    pub n1: Array2<f64>,
    pub n2: Array2<f64>,
    pub beta1: Array2<f64>,
    pub beta2: Array2<f64>,
}

/// Evaluate the provider over the full (wavelength, segment) grid, apply
/// the linear thermal correction and derive propagation constants.
pub fn build_mode_index_table<P: ModeIndexProvider>(
    config: &DeviceConfig,
    profile: &SegmentProfile,
    provider: &P,
) -> Result<ModeIndexTable> {
    let resolution = config.resolution;
    let n_seg = profile.len();
    let wavelength = config.wavelength_grid();

    let mut n1 = Array2::zeros((resolution, n_seg));
    let mut n2 = Array2::zeros((resolution, n_seg));
    let mut beta1 = Array2::zeros((resolution, n_seg));
    let mut beta2 = Array2::zeros((resolution, n_seg));

    for j in 0..n_seg {
        let dn_thermal =
            config.thermal_coeff * (profile.temperature[j] - config.reference_temperature_k);
        for (i, &wvl) in wavelength.iter().enumerate() {
            let (a, b) = provider.lookup(profile.w1[j], profile.w2[j], wvl)?;
            n1[[i, j]] = a + dn_thermal;
            n2[[i, j]] = b + dn_thermal;
            beta1[[i, j]] = 2.0 * PI / wvl * n1[[i, j]];
            beta2[[i, j]] = 2.0 * PI / wvl * n2[[i, j]];
        }
    }

    Ok(ModeIndexTable {
        n1,
        n2,
        beta1,
        beta2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::build_profile;

    #[test]
    fn test_corner_lookup_is_exact() {
        let table = EffectiveIndexTable::silicon_strip();
        let (n1, n2) = table.lookup(550e-9, 430e-9, 1.5e-6).unwrap();
        let (e1, e2) = table.node(0, 0, 0);
        assert!((n1 - e1).abs() < 1e-12);
        assert!((n2 - e2).abs() < 1e-12);

        // Far corner, upper-inclusive.
        let (n1, n2) = table.lookup(570e-9, 450e-9, 1.6e-6).unwrap();
        let (e1, e2) = table.node(4, 4, 4);
        assert!((n1 - e1).abs() < 1e-12);
        assert!((n2 - e2).abs() < 1e-12);
    }

    #[test]
    fn test_custom_table_construction() {
        let table = EffectiveIndexTable::new(
            vec![0.5e-6, 0.6e-6],
            vec![0.4e-6, 0.5e-6],
            vec![1.5e-6, 1.6e-6],
            vec![2.5; 8],
            vec![2.2; 8],
        )
        .unwrap();
        let (n1, n2) = table.lookup(0.55e-6, 0.45e-6, 1.55e-6).unwrap();
        assert!((n1 - 2.5).abs() < 1e-12);
        assert!((n2 - 2.2).abs() < 1e-12);
    }

    #[test]
    fn test_table_rejects_bad_shape() {
        let bad = EffectiveIndexTable::new(
            vec![0.5e-6, 0.6e-6],
            vec![0.4e-6, 0.5e-6],
            vec![1.5e-6, 1.6e-6],
            vec![2.5; 7],
            vec![2.2; 8],
        );
        assert!(matches!(bad, Err(CdcError::Configuration(_))));

        let decreasing = EffectiveIndexTable::new(
            vec![0.6e-6, 0.5e-6],
            vec![0.4e-6, 0.5e-6],
            vec![1.5e-6, 1.6e-6],
            vec![2.5; 8],
            vec![2.2; 8],
        );
        assert!(decreasing.is_err());
    }

    #[test]
    fn test_out_of_domain_is_error() {
        let table = EffectiveIndexTable::silicon_strip();
        let err = table.lookup(0.60e-6, 0.44e-6, 1.55e-6).unwrap_err();
        assert!(matches!(err, CdcError::DomainLookup { axis: "w1", .. }));

        let err = table.lookup(0.56e-6, 0.44e-6, 1.7e-6).unwrap_err();
        assert!(matches!(
            err,
            CdcError::DomainLookup {
                axis: "wavelength",
                ..
            }
        ));
    }

    #[test]
    fn test_interior_lookup_matches_planes() {
        // The bundled dataset is linear in each axis, so trilinear
        // interpolation reproduces the generating planes exactly.
        let table = EffectiveIndexTable::silicon_strip();
        let (n1, n2) = table.lookup(0.561e-6, 0.439e-6, 1.553e-6).unwrap();
        let e1 = 2.6193 - 1.086e6 * (1.553e-6 - 1.5612e-6)
            + 1.25e6 * (0.561e-6 - 0.56e-6)
            + 0.387e6 * (0.439e-6 - 0.44e-6);
        let e2 = 2.2292 - 1.086e6 * (1.553e-6 - 1.5612e-6)
            + 0.387e6 * (0.561e-6 - 0.56e-6)
            + 1.25e6 * (0.439e-6 - 0.44e-6);
        assert!((n1 - e1).abs() < 1e-9);
        assert!((n2 - e2).abs() < 1e-9);
    }

    #[test]
    fn test_table_shape_and_thermal_shift() {
        let config = DeviceConfig {
            resolution: 10,
            n_seg: 4,
            ..Default::default()
        };
        let provider = EffectiveIndexTable::silicon_strip();
        let profile = build_profile(&config, &provider, None).unwrap();
        let base = build_mode_index_table(&config, &profile, &provider).unwrap();
        assert_eq!(base.n1.dim(), (10, 4));

        let hot = DeviceConfig {
            temperature_k: 310.0,
            ..config
        };
        let hot_profile = build_profile(&hot, &provider, None).unwrap();
        let heated = build_mode_index_table(&hot, &hot_profile, &provider).unwrap();
        let shift = heated.n1[[0, 0]] - base.n1[[0, 0]];
        assert!((shift - 1.87e-4 * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_beta_consistent_with_index() {
        let config = DeviceConfig {
            resolution: 5,
            n_seg: 3,
            ..Default::default()
        };
        let provider = EffectiveIndexTable::silicon_strip();
        let profile = build_profile(&config, &provider, None).unwrap();
        let table = build_mode_index_table(&config, &profile, &provider).unwrap();
        let wvl = config.wavelength_grid();
        let expected = 2.0 * PI / wvl[2] * table.n1[[2, 1]];
        assert!((table.beta1[[2, 1]] - expected).abs() < 1e-6);
    }
}
