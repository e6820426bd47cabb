//! Segment-wise transfer-matrix propagation.
//!
//! For every wavelength sample the grating is walked segment by segment,
//! multiplying 4x4 complex transfer matrices in physical order, then the
//! cascaded matrix is reordered into a scattering matrix to read off the
//! through and drop responses. Wavelength samples are independent and
//! computed in parallel; the segment loop is strictly sequential.

use std::f64::consts::PI;

use log::debug;
use ndarray::{s, Array2};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::config::DeviceConfig;
use crate::error::{CdcError, Result};
use crate::mode_index::ModeIndexTable;
use crate::profile::SegmentProfile;

/// Relative determinant magnitude below which the back-back block of the
/// port-reordering transform is treated as singular.
const SINGULARITY_THRESHOLD: f64 = 1e-13;

/// Spectral response of one simulated device.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// Wavelength grid [m].
    pub wavelength: Vec<f64>,
    /// Complex through-port field amplitude per wavelength.
    pub e_thru: Vec<Complex64>,
    /// Complex drop-port field amplitude per wavelength.
    pub e_drop: Vec<Complex64>,
    /// Through power spectrum [dB].
    pub thru_db: Vec<f64>,
    /// Drop power spectrum [dB].
    pub drop_db: Vec<f64>,
    /// Full left-right cascade matrix per wavelength, kept for reuse.
    pub matrices: Vec<Array2<Complex64>>,
}

/// Matrix exponential by scaling-and-squaring with a Horner-evaluated
/// truncated Taylor series.
pub fn expm(a: &Array2<Complex64>) -> Array2<Complex64> {
    const TAYLOR_ORDER: usize = 14;

    let n = a.nrows();
    // Infinity norm decides the scaling power.
    let norm = a
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|x| x.norm()).sum::<f64>())
        .fold(0.0_f64, f64::max);

    let squarings = if norm > 0.5 {
        (norm / 0.5).log2().ceil() as u32
    } else {
        0
    };
    let scale = 0.5_f64.powi(squarings as i32);
    let scaled = a.mapv(|x| x * scale);

    let eye = Array2::<Complex64>::eye(n);
    let mut e = eye.clone();
    for k in (1..=TAYLOR_ORDER).rev() {
        let term = scaled.mapv(|x| x / k as f64).dot(&e);
        e = &eye + &term;
    }

    for _ in 0..squarings {
        e = e.dot(&e);
    }
    e
}

/// Invert a 2x2 complex block, failing on singular or severely
/// ill-conditioned input.
fn invert_block(m: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let a = m[[0, 0]];
    let b = m[[0, 1]];
    let c = m[[1, 0]];
    let d = m[[1, 1]];
    let det = a * d - b * c;

    let largest = [a, b, c, d]
        .iter()
        .map(|x| x.norm())
        .fold(0.0_f64, f64::max);
    if det.norm() <= SINGULARITY_THRESHOLD * largest * largest {
        return Err(CdcError::NumericalSingularity {
            det_mag: det.norm(),
        });
    }

    let inv_det = det.finv();
    let mut out = Array2::zeros((2, 2));
    out[[0, 0]] = d * inv_det;
    out[[0, 1]] = -b * inv_det;
    out[[1, 0]] = -c * inv_det;
    out[[1, 1]] = a * inv_det;
    Ok(out)
}

/// Convert a both-ends-known transfer matrix into an inputs-on-one-side
/// scattering matrix via the Schur complement of the back-back block.
pub fn switch_top(p: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let p_ff = p.slice(s![0..2, 0..2]).to_owned();
    let p_fg = p.slice(s![0..2, 2..4]).to_owned();
    let p_gf = p.slice(s![2..4, 0..2]).to_owned();
    let p_gg = p.slice(s![2..4, 2..4]).to_owned();

    let p_gg_inv = invert_block(&p_gg)?;

    let h1 = &p_ff - &p_fg.dot(&p_gg_inv).dot(&p_gf);
    let h2 = p_fg.dot(&p_gg_inv);
    let h3 = p_gg_inv.dot(&p_gf).mapv(|x| -x);
    let h4 = p_gg_inv;

    let mut h = Array2::zeros((4, 4));
    h.slice_mut(s![0..2, 0..2]).assign(&h1);
    h.slice_mut(s![0..2, 2..4]).assign(&h2);
    h.slice_mut(s![2..4, 0..2]).assign(&h3);
    h.slice_mut(s![2..4, 2..4]).assign(&h4);
    Ok(h)
}

fn reorder_rows(m: &Array2<Complex64>, order: [usize; 4]) -> Array2<Complex64> {
    let mut out = Array2::zeros((4, 4));
    for (dst, &src) in order.iter().enumerate() {
        out.row_mut(dst).assign(&m.row(src));
    }
    out
}

fn swap_cols(m: &mut Array2<Complex64>, a: usize, b: usize) {
    for row in 0..m.nrows() {
        m.swap([row, a], [row, b]);
    }
}

/// Top-down variant of the cascade matrix, for devices stacked physically
/// rather than end-to-end.
pub fn top_down_matrix(p: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let mut p2 = reorder_rows(p, [3, 1, 2, 0]);
    swap_cols(&mut p2, 1, 2);
    let h = switch_top(&p2)?;
    let mut p3 = reorder_rows(&h, [3, 0, 2, 1]);
    swap_cols(&mut p3, 2, 3);
    swap_cols(&mut p3, 1, 2);
    Ok(p3)
}

/// Field-amplitude loss coefficient [1/m] from a dB/cm power loss.
fn field_loss(alpha_db_per_cm: f64) -> f64 {
    100.0 * alpha_db_per_cm / 10.0 * 10.0_f64.ln()
}

/// Cascade all segments of the grating at one wavelength sample.
fn cascade_segments(
    config: &DeviceConfig,
    profile: &SegmentProfile,
    modes: &ModeIndexTable,
    sample: usize,
) -> Result<(Array2<Complex64>, Complex64, Complex64)> {
    let i = Complex64::i();
    let alpha_e = field_loss(config.alpha_db_per_cm);
    let periods_per_seg = config.n_periods as f64 / profile.len() as f64;

    let mut p = Array2::<Complex64>::eye(4);
    let mut l_0 = 0.0;

    for n in 0..profile.len() {
        let period = profile.period[n];
        let l_seg = periods_per_seg * period;

        let kappa_12 = Complex64::new(profile.kappa[n], 0.0);
        let kappa_11 = config.anti_reflection_ratio * kappa_12;
        let kappa_22 = kappa_11;

        let d1 = Complex64::new(modes.beta1[[sample, n]] - PI / period, -alpha_e / 2.0);
        let d2 = Complex64::new(modes.beta2[[sample, n]] - PI / period, -alpha_e / 2.0);

        let mut s1 = Array2::<Complex64>::zeros((4, 4));
        s1[[0, 0]] = i * d1;
        s1[[1, 1]] = i * d2;
        s1[[2, 2]] = -i * d1;
        s1[[3, 3]] = -i * d2;

        // Coupling generator, phase-referenced to the cumulative position
        // along the grating.
        let ph_11 = (i * 2.0 * d1 * l_0).exp();
        let ph_22 = (i * 2.0 * d2 * l_0).exp();
        let ph_12 = (i * (d1 + d2) * l_0).exp();

        let mut s2 = Array2::<Complex64>::zeros((4, 4));
        s2[[0, 0]] = -i * d1;
        s2[[0, 2]] = -i * kappa_11 * ph_11;
        s2[[0, 3]] = -i * kappa_12 * ph_12;
        s2[[1, 1]] = -i * d2;
        s2[[1, 2]] = -i * kappa_12 * ph_12;
        s2[[1, 3]] = -i * kappa_22 * ph_22;
        s2[[2, 0]] = i * kappa_11.conj() / ph_11;
        s2[[2, 1]] = i * kappa_12.conj() / ph_12;
        s2[[2, 2]] = i * d1;
        s2[[3, 0]] = i * kappa_12.conj() / ph_12;
        s2[[3, 1]] = i * kappa_22.conj() / ph_22;
        s2[[3, 3]] = i * d2;

        let seg = expm(&s1.mapv(|x| x * l_seg)).dot(&expm(&s2.mapv(|x| x * l_seg)));
        p = seg.dot(&p);
        l_0 += l_seg;
    }

    let h = switch_top(&p)?;

    // Single-mode forward excitation: a1 = 1, all other ports 0.
    let e_thru = h[[0, 0]];
    let e_drop = h[[3, 0]];
    Ok((p, e_thru, e_drop))
}

fn power_db(e: Complex64) -> f64 {
    10.0 * e.norm_sqr().log10()
}

/// Propagate the device over the full wavelength grid.
///
/// A failed sample (singular port reordering, inconsistent inputs) fails
/// the whole run; there is no partial-result mode.
pub fn propagate(
    config: &DeviceConfig,
    profile: &SegmentProfile,
    modes: &ModeIndexTable,
) -> Result<SimulationResult> {
    let n_seg = profile.len();
    if n_seg == 0 {
        return Err(CdcError::Configuration("empty segment profile".into()));
    }
    if modes.beta1.dim() != (config.resolution, n_seg) {
        return Err(CdcError::Configuration(format!(
            "mode index table shape {:?} does not match (resolution, n_seg) = ({}, {})",
            modes.beta1.dim(),
            config.resolution,
            n_seg
        )));
    }

    debug!(
        "propagating {} wavelength samples across {} segments",
        config.resolution, n_seg
    );

    let per_sample: Vec<(Array2<Complex64>, Complex64, Complex64)> = (0..config.resolution)
        .into_par_iter()
        .map(|sample| cascade_segments(config, profile, modes, sample))
        .collect::<Result<Vec<_>>>()?;

    let wavelength = config.wavelength_grid();
    let mut matrices = Vec::with_capacity(per_sample.len());
    let mut e_thru = Vec::with_capacity(per_sample.len());
    let mut e_drop = Vec::with_capacity(per_sample.len());
    for (m, t, d) in per_sample {
        matrices.push(m);
        e_thru.push(t);
        e_drop.push(d);
    }
    let thru_db = e_thru.iter().map(|&e| power_db(e)).collect();
    let drop_db = e_drop.iter().map(|&e| power_db(e)).collect();

    Ok(SimulationResult {
        wavelength,
        e_thru,
        e_drop,
        thru_db,
        drop_db,
        matrices,
    })
}
