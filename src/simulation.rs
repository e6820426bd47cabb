//! Device-level orchestration: profiles, index tables, propagation and
//! stage cascading behind one entry point.

use log::info;

use crate::cache::ChirpCache;
use crate::cascade::{combine_stages, reverse_profiles};
use crate::config::DeviceConfig;
use crate::error::{CdcError, Result};
use crate::mode_index::{build_mode_index_table, ModeIndexProvider};
use crate::profile::{build_profile, SegmentProfile};
use crate::transfer_matrix::{propagate, SimulationResult};

/// One chirped contra-directional coupler: a validated configuration and,
/// once materialized, its per-segment profiles.
#[derive(Debug, Clone)]
pub struct CdcDevice {
    pub config: DeviceConfig,
    profile: Option<SegmentProfile>,
}

impl CdcDevice {
    /// Create a device, validating the configuration eagerly.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            profile: None,
        })
    }

    /// Create a device from an already-built profile (used when
    /// concatenating devices).
    pub fn from_parts(config: DeviceConfig, profile: SegmentProfile) -> Result<Self> {
        config.validate()?;
        if profile.len() != config.n_seg {
            return Err(CdcError::Configuration(format!(
                "profile length {} does not match n_seg {}",
                profile.len(),
                config.n_seg
            )));
        }
        let len = profile.len();
        if profile.period.len() != len
            || profile.w1.len() != len
            || profile.w2.len() != len
            || profile.temperature.len() != len
        {
            return Err(CdcError::Configuration(
                "segment profile sequences have mismatched lengths".into(),
            ));
        }
        Ok(Self {
            config,
            profile: Some(profile),
        })
    }

    /// The stored per-segment profile, if materialized.
    pub fn profile(&self) -> Option<&SegmentProfile> {
        self.profile.as_ref()
    }

    /// Build and store the apodization and chirp profiles. A no-op when
    /// they are already materialized.
    pub fn materialize<P: ModeIndexProvider>(
        &mut self,
        provider: &P,
        cache: Option<&ChirpCache>,
    ) -> Result<()> {
        if self.profile.is_none() {
            self.profile = Some(build_profile(&self.config, provider, cache)?);
        }
        Ok(())
    }

    /// The stored profile, or a freshly built one; `self` is not mutated.
    pub fn materialized_profile<P: ModeIndexProvider>(
        &self,
        provider: &P,
        cache: Option<&ChirpCache>,
    ) -> Result<SegmentProfile> {
        match &self.profile {
            Some(profile) => Ok(profile.clone()),
            None => build_profile(&self.config, provider, cache),
        }
    }

    /// Run the full simulation: profile, mode-index table, transfer-matrix
    /// propagation and, for multi-stage devices, cascade combination.
    pub fn simulate<P: ModeIndexProvider>(&self, provider: &P) -> Result<SimulationResult> {
        info!(
            "simulating CDC: N = {}, {} segments, {} wavelength samples, {} stage(s)",
            self.config.n_periods, self.config.n_seg, self.config.resolution, self.config.stages
        );

        let profile = self.materialized_profile(provider, None)?;
        let modes = build_mode_index_table(&self.config, &profile, provider)?;
        let forward = propagate(&self.config, &profile, &modes)?;

        if self.config.stages > 1 {
            let (flipped_profile, flipped_modes) = reverse_profiles(&profile, &modes);
            let reversed = propagate(&self.config, &flipped_profile, &flipped_modes)?;
            Ok(combine_stages(&forward, &reversed, self.config.stages))
        } else {
            Ok(forward)
        }
    }
}
