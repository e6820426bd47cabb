//! Chirp optimization: pitch/width search for a target reflection
//! wavelength.
//!
//! A first-order regression seeds the pitch and width detuning; a bounded
//! bracket-and-bisect search on the discrete width grid then drives the
//! simulated center wavelength onto the target, using a reduced
//! simulation as its objective oracle.

use log::debug;

use crate::cache::{ChirpCache, ChirpRecord};
use crate::config::{ChirpRange, DeviceConfig};
use crate::error::{CdcError, Result};
use crate::mode_index::{build_mode_index_table, ModeIndexProvider};
use crate::performance::summarize;
use crate::profile::{build_profile, snap_to_grid};
use crate::transfer_matrix::propagate;

/// Center wavelength vs. pitch and vs. common width detuning, first-order
/// fit to the reference device family.
const DLAM_DP: f64 = 2.853181818181853;
const P0: f64 = 6.423545454545346e-7;
const DLAM_DW: f64 = 0.6204545454543569;

/// Reduced-simulation oracle: fewer periods, coarse resolution, localized
/// wavelength window around the target.
const ORACLE_N_PERIODS: u64 = 500;
const ORACLE_RESOLUTION: usize = 50;
const ORACLE_HALF_WINDOW: f64 = 30e-9;

/// Hard iteration budget for one solve; exceeding it is an error.
const MAX_ITERATIONS: usize = 32;
/// Early-exit tolerance on the center-wavelength error [m]. The reachable
/// residual is otherwise limited by the width grid and the oracle's
/// wavelength sampling.
const EARLY_EXIT_TOLERANCE: f64 = 10e-12;

/// Signed center-wavelength error of the oracle device at width detuning
/// `dw` from the base widths.
fn signed_error<P: ModeIndexProvider>(
    base: &DeviceConfig,
    provider: &P,
    period: f64,
    dw: f64,
    target_wvl: f64,
) -> Result<f64> {
    let config = DeviceConfig {
        n_periods: ORACLE_N_PERIODS,
        resolution: ORACLE_RESOLUTION,
        wvl_range: (target_wvl - ORACLE_HALF_WINDOW, target_wvl + ORACLE_HALF_WINDOW),
        stages: 1,
        period: ChirpRange::uniform(period),
        w1: ChirpRange::uniform(base.w1.start + dw),
        w2: ChirpRange::uniform(base.w2.start + dw),
        target_wvl: None,
        ..base.clone()
    };

    let profile = build_profile(&config, provider, None)?;
    let modes = build_mode_index_table(&config, &profile, provider)?;
    let result = propagate(&config, &profile, &modes)?;
    let summary = summarize(&result)?;
    Ok(summary.center_wavelength.value * 1e-9 - target_wvl)
}

/// Find the (period, w1, w2) combination whose reflection centers on
/// `target_wvl`.
///
/// The search walks the `w_chirp_step` grid with doubling strides until
/// the signed error brackets zero, then bisects the bracket down to
/// adjacent grid points and returns the best-sampled point. Exhausting
/// the iteration budget, or walking out of the index-table domain before
/// a bracket is found, raises `OptimizationNonConvergence`.
pub fn solve<P: ModeIndexProvider>(
    target_wvl: f64,
    base: &DeviceConfig,
    provider: &P,
) -> Result<(f64, f64, f64)> {
    base.validate()?;

    let period = snap_to_grid((target_wvl - P0) / DLAM_DP, base.period_chirp_step);
    let dw0 = snap_to_grid(
        (target_wvl - DLAM_DP * period - P0) / DLAM_DW,
        base.w_chirp_step,
    );
    let step = base.w_chirp_step;

    let widths = |k: i64| {
        let dw = dw0 + k as f64 * step;
        (base.w1.start + dw, base.w2.start + dw)
    };
    let eval = |k: i64| -> Result<f64> {
        let dw = dw0 + k as f64 * step;
        signed_error(base, provider, period, dw, target_wvl)
    };
    // The oracle leaving the index-table domain means the target is not
    // reachable from this seed: report it as non-convergence.
    let non_convergence = |iterations: usize, residual: f64| CdcError::OptimizationNonConvergence {
        target_m: target_wvl,
        iterations,
        residual_m: residual,
    };
    let map_domain = |err: CdcError, iterations: usize, residual: f64| match err {
        CdcError::DomainLookup { .. } => non_convergence(iterations, residual),
        other => other,
    };

    let mut iterations = 0usize;
    let f0 = eval(0).map_err(|e| map_domain(e, 1, f64::INFINITY))?;
    iterations += 1;
    if f0.abs() <= EARLY_EXIT_TOLERANCE {
        let (w1, w2) = widths(0);
        return Ok((period, w1, w2));
    }
    let mut best = (0i64, f0);
    let direction: i64 = if f0 > 0.0 { -1 } else { 1 };

    // Walk with doubling strides until the error changes sign.
    let mut prev_k = 0i64;
    let mut prev_f = f0;
    let mut stride = 1i64;
    let (mut lo, mut hi) = loop {
        if iterations >= MAX_ITERATIONS {
            return Err(non_convergence(iterations, best.1.abs()));
        }
        let k = prev_k + direction * stride;
        let f = eval(k).map_err(|e| map_domain(e, iterations, best.1.abs()))?;
        iterations += 1;
        debug!(
            "chirp solve: target {:.2} nm, step {}, error {:.3} nm",
            target_wvl * 1e9,
            k,
            f * 1e9
        );
        if f.abs() < best.1.abs() {
            best = (k, f);
        }
        if f.abs() <= EARLY_EXIT_TOLERANCE {
            let (w1, w2) = widths(k);
            return Ok((period, w1, w2));
        }
        if f.signum() != prev_f.signum() {
            break (prev_k, k);
        }
        prev_k = k;
        prev_f = f;
        stride *= 2;
    };

    // Discrete bisection down to adjacent grid points.
    while (hi - lo).abs() > 1 {
        if iterations >= MAX_ITERATIONS {
            return Err(non_convergence(iterations, best.1.abs()));
        }
        let mid = lo + (hi - lo) / 2;
        let f = eval(mid).map_err(|e| map_domain(e, iterations, best.1.abs()))?;
        iterations += 1;
        if f.abs() < best.1.abs() {
            best = (mid, f);
        }
        if f.abs() <= EARLY_EXIT_TOLERANCE {
            let (w1, w2) = widths(mid);
            return Ok((period, w1, w2));
        }
        if f.signum() == f0.signum() {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    // Bracket is at grid resolution; the best sampled point wins.
    let (w1, w2) = widths(best.0);
    Ok((period, w1, w2))
}

/// Solve the per-segment chirp for a target wavelength range, reading
/// through the cache when one is given.
pub fn optimize_chirp<P: ModeIndexProvider>(
    config: &DeviceConfig,
    provider: &P,
    cache: Option<&ChirpCache>,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    config.validate()?;
    let (start, end) = config.target_wvl.ok_or_else(|| {
        CdcError::Configuration("chirp optimization requires a target wavelength range".into())
    })?;
    let n_seg = config.n_seg;

    if let Some(cache) = cache {
        if cache.contains(n_seg, start, end) {
            let record = cache.load(n_seg, start, end)?;
            if record.period.len() == n_seg {
                debug!("chirp profile for {} segments loaded from cache", n_seg);
                return Ok((record.period, record.w1, record.w2));
            }
        }
    }

    let targets: Vec<f64> = (0..n_seg)
        .map(|i| {
            if n_seg > 1 {
                start + (end - start) * i as f64 / (n_seg - 1) as f64
            } else {
                start
            }
        })
        .collect();

    let mut period = Vec::with_capacity(n_seg);
    let mut w1 = Vec::with_capacity(n_seg);
    let mut w2 = Vec::with_capacity(n_seg);
    for (i, &target) in targets.iter().enumerate() {
        debug!(
            "optimizing segment {}/{} for {:.2} nm",
            i + 1,
            n_seg,
            target * 1e9
        );
        let (p, a, b) = solve(target, config, provider)?;
        period.push(p);
        w1.push(a);
        w2.push(b);
    }

    if let Some(cache) = cache {
        cache.store(
            n_seg,
            start,
            end,
            &ChirpRecord {
                period: period.clone(),
                w1: w1.clone(),
                w2: w2.clone(),
            },
        )?;
    }

    Ok((period, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode_index::EffectiveIndexTable;

    fn base_config() -> DeviceConfig {
        DeviceConfig {
            n_seg: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_solve_seeds_period_from_regression() {
        let provider = EffectiveIndexTable::silicon_strip();
        let config = base_config();
        let (period, w1, w2) = solve(1555e-9, &config, &provider).unwrap();

        let seeded = snap_to_grid((1555e-9 - P0) / DLAM_DP, config.period_chirp_step);
        assert_eq!(period, seeded);
        // Width detuning stays small for a target near the reference device.
        assert!((w1 - 0.56e-6).abs() <= 4e-9);
        assert!((w2 - 0.44e-6).abs() <= 4e-9);
        // Common-mode detuning on the width grid.
        let dw = w1 - 0.56e-6;
        assert!((dw - (w2 - 0.44e-6)).abs() < 1e-15);
        let steps = dw / config.w_chirp_step;
        assert!((steps - steps.round()).abs() < 1e-6);
    }

    #[test]
    fn test_solve_bounded_on_unreachable_target() {
        let provider = EffectiveIndexTable::silicon_strip();
        let config = base_config();
        // Far beyond the regression's extrapolation limits and the table.
        let err = solve(1650e-9, &config, &provider).unwrap_err();
        assert!(matches!(
            err,
            CdcError::OptimizationNonConvergence { .. }
        ));
    }

    #[test]
    fn test_optimize_chirp_lengths_and_monotonicity() {
        let provider = EffectiveIndexTable::silicon_strip();
        let config = DeviceConfig {
            target_wvl: Some((1552e-9, 1558e-9)),
            ..base_config()
        };
        let (period, w1, w2) = optimize_chirp(&config, &provider, None).unwrap();
        assert_eq!(period.len(), 4);
        assert_eq!(w1.len(), 4);
        assert_eq!(w2.len(), 4);
        // Longer targets need equal or larger pitch.
        for pair in period.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_optimize_chirp_cache_roundtrip() {
        let provider = EffectiveIndexTable::silicon_strip();
        let root = std::env::temp_dir().join("contradc_optimize_cache");
        let _ = std::fs::remove_dir_all(&root);
        let cache = ChirpCache::new(&root);

        let config = DeviceConfig {
            n_seg: 3,
            target_wvl: Some((1553e-9, 1557e-9)),
            ..Default::default()
        };

        let fresh = optimize_chirp(&config, &provider, Some(&cache)).unwrap();
        assert!(cache.contains(3, 1553e-9, 1557e-9));

        let cached = optimize_chirp(&config, &provider, Some(&cache)).unwrap();
        assert_eq!(fresh, cached);
    }

    #[test]
    fn test_missing_target_is_configuration_error() {
        let provider = EffectiveIndexTable::silicon_strip();
        let config = base_config();
        assert!(matches!(
            optimize_chirp(&config, &provider, None),
            Err(CdcError::Configuration(_))
        ));
    }
}
