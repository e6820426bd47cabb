//! Spectral figures of merit and group delay.

use std::f64::consts::PI;

use crate::config::SPEED_OF_LIGHT;
use crate::error::{CdcError, Result};
use crate::transfer_matrix::SimulationResult;

/// Width of the passband window below the drop peak [dB].
const PASSBAND_DEPTH_DB: f64 = 3.0;

/// A scalar figure of merit with its unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub value: f64,
    pub unit: &'static str,
}

/// Figures of merit of one drop-port spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    /// Midpoint of the 3-dB passband extrema.
    pub center_wavelength: Metric,
    /// Span of the 3-dB passband.
    pub bandwidth: Metric,
    /// Peak drop-port power.
    pub peak_reflection: Metric,
    /// Mean drop-port power inside the passband.
    pub avg_ripple: Metric,
    /// Standard deviation of drop-port power inside the passband.
    pub ripple_std: Metric,
}

/// Post-process a simulated spectrum into bandwidth, center wavelength
/// and in-band ripple.
pub fn summarize(result: &SimulationResult) -> Result<PerformanceSummary> {
    if result.drop_db.is_empty() {
        return Err(CdcError::Configuration(
            "cannot summarize an empty simulation result".into(),
        ));
    }

    let peak = result
        .drop_db
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);

    // Passband: every sample within 3 dB of the peak.
    let in_band: Vec<usize> = (0..result.drop_db.len())
        .filter(|&i| result.drop_db[i] > peak - PASSBAND_DEPTH_DB)
        .collect();
    if in_band.is_empty() {
        return Err(CdcError::Configuration(
            "drop spectrum has no finite passband".into(),
        ));
    }

    let first = in_band[0];
    let last = in_band[in_band.len() - 1];
    let center = 0.5 * (result.wavelength[first] + result.wavelength[last]);
    let bandwidth = result.wavelength[last] - result.wavelength[first];

    let band_powers: Vec<f64> = in_band.iter().map(|&i| result.drop_db[i]).collect();
    let mean = band_powers.iter().sum::<f64>() / band_powers.len() as f64;
    let var = band_powers
        .iter()
        .map(|p| (p - mean) * (p - mean))
        .sum::<f64>()
        / band_powers.len() as f64;

    Ok(PerformanceSummary {
        center_wavelength: Metric {
            value: center * 1e9,
            unit: "nm",
        },
        bandwidth: Metric {
            value: bandwidth * 1e9,
            unit: "nm",
        },
        peak_reflection: Metric {
            value: peak,
            unit: "dB",
        },
        avg_ripple: Metric {
            value: mean,
            unit: "dB",
        },
        ripple_std: Metric {
            value: var.sqrt(),
            unit: "dB",
        },
    })
}

/// Unwrap a phase sequence by removing 2-pi jumps between samples.
fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phase.len());
    let mut offset = 0.0;
    for (i, &p) in phase.iter().enumerate() {
        if i > 0 {
            let jump = p - phase[i - 1];
            if jump > PI {
                offset -= 2.0 * PI;
            } else if jump < -PI {
                offset += 2.0 * PI;
            }
        }
        out.push(p + offset);
    }
    out
}

/// Drop-port group delay [s] per wavelength sample.
///
/// Computed as -dphi/domega by finite differences over the angular
/// frequency grid; the last value is repeated so the output matches the
/// wavelength grid length.
pub fn group_delay(result: &SimulationResult) -> Vec<f64> {
    let phase: Vec<f64> = result.e_drop.iter().map(|e| e.arg()).collect();
    let phase = unwrap_phase(&phase);
    let omega: Vec<f64> = result
        .wavelength
        .iter()
        .map(|&wvl| 2.0 * PI * SPEED_OF_LIGHT / wvl)
        .collect();

    let mut delay: Vec<f64> = phase
        .windows(2)
        .zip(omega.windows(2))
        .map(|(p, w)| -(p[1] - p[0]) / (w[1] - w[0]))
        .collect();
    if let Some(&last) = delay.last() {
        delay.push(last);
    }
    delay
}
