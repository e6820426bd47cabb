//! Error taxonomy for the CDC simulator.

use thiserror::Error;

/// Errors surfaced by the simulation core.
#[derive(Debug, Error)]
pub enum CdcError {
    /// Invalid device configuration, raised before any simulation starts.
    #[error("invalid device configuration: {0}")]
    Configuration(String),

    /// Effective-index lookup outside the interpolation table domain.
    #[error("{axis} = {value:.4e} outside table domain [{min:.4e}, {max:.4e}]")]
    DomainLookup {
        axis: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The back-back block of the port-reordering transform is singular
    /// or too ill-conditioned to invert.
    #[error("singular back-back block in port reordering (|det| = {det_mag:.3e})")]
    NumericalSingularity { det_mag: f64 },

    /// Chirp optimization exhausted its iteration budget without the
    /// error metric stabilizing.
    #[error(
        "chirp optimization did not converge on target {target_m:.4e} m \
         after {iterations} iterations (residual {residual_m:.4e} m)"
    )]
    OptimizationNonConvergence {
        target_m: f64,
        iterations: usize,
        residual_m: f64,
    },

    /// Chirp-profile cache I/O failure.
    #[error("chirp cache I/O: {0}")]
    Cache(#[from] std::io::Error),

    /// Malformed chirp-profile cache record.
    #[error("chirp cache record: {0}")]
    CacheFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CdcError>;
