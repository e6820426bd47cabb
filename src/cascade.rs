//! Multi-stage cascading and device concatenation.

use ndarray::{s, Array2};

use crate::cache::ChirpCache;
use crate::config::ChirpRange;
use crate::error::Result;
use crate::mode_index::{ModeIndexProvider, ModeIndexTable};
use crate::profile::SegmentProfile;
use crate::simulation::CdcDevice;
use crate::transfer_matrix::SimulationResult;

/// Physically flip the grating end for end: the pitch sequence and the
/// per-segment index/propagation-constant columns reverse their order.
///
/// Applying the flip twice restores the original profiles.
pub fn reverse_profiles(
    profile: &SegmentProfile,
    modes: &ModeIndexTable,
) -> (SegmentProfile, ModeIndexTable) {
    let mut reversed = profile.clone();
    reversed.period.reverse();

    let flip = |a: &Array2<f64>| a.slice(s![.., ..;-1]).to_owned();
    let flipped = ModeIndexTable {
        n1: flip(&modes.n1),
        n2: flip(&modes.n2),
        beta1: flip(&modes.beta1),
        beta2: flip(&modes.beta2),
    };

    (reversed, flipped)
}

/// Emulate `stages` incoherently cascaded devices by accumulating the
/// forward and flipped single-pass spectra.
///
/// Stages are treated as incoherent power accumulators: the dB spectra
/// are summed directly, alternating orientation per stage index. With
/// `stages == 1` the forward result is returned unchanged. The complex
/// amplitudes and matrix stack of the returned result are those of the
/// forward pass.
pub fn combine_stages(
    forward: &SimulationResult,
    reversed: &SimulationResult,
    stages: usize,
) -> SimulationResult {
    if stages <= 1 {
        return forward.clone();
    }

    let mut combined = forward.clone();
    for stage in 0..stages {
        let source = if stage % 2 == 0 { reversed } else { forward };
        for i in 0..combined.thru_db.len() {
            combined.thru_db[i] += source.thru_db[i];
            combined.drop_db[i] += source.drop_db[i];
        }
    }
    combined
}

/// Join two devices end to end into one longer chirped device.
///
/// Profiles of both operands are materialized on local copies when
/// absent; neither operand is mutated. The combined device owns the
/// appended profiles, the summed period count and the summed segment
/// count.
pub fn concatenate<P: ModeIndexProvider>(
    a: &CdcDevice,
    b: &CdcDevice,
    provider: &P,
    cache: Option<&ChirpCache>,
) -> Result<CdcDevice> {
    let profile_a = a.materialized_profile(provider, cache)?;
    let profile_b = b.materialized_profile(provider, cache)?;

    let join = |x: &[f64], y: &[f64]| {
        let mut out = Vec::with_capacity(x.len() + y.len());
        out.extend_from_slice(x);
        out.extend_from_slice(y);
        out
    };

    let profile = SegmentProfile {
        kappa: join(&profile_a.kappa, &profile_b.kappa),
        period: join(&profile_a.period, &profile_b.period),
        w1: join(&profile_a.w1, &profile_b.w1),
        w2: join(&profile_a.w2, &profile_b.w2),
        temperature: join(&profile_a.temperature, &profile_b.temperature),
    };

    let mut config = a.config.clone();
    config.n_periods = a.config.n_periods + b.config.n_periods;
    config.n_seg = a.config.n_seg + b.config.n_seg;
    config.period = ChirpRange::new(a.config.period.start, b.config.period.end);
    config.w1 = ChirpRange::new(a.config.w1.start, b.config.w1.end);
    config.w2 = ChirpRange::new(a.config.w2.start, b.config.w2.end);
    config.target_wvl = None;

    CdcDevice::from_parts(config, profile)
}
