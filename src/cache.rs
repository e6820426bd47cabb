//! On-disk cache of solved chirp profiles.
//!
//! Chirp optimization is expensive; solved (period, w1, w2) sequences are
//! keyed by segment count and target wavelength range so identical chirp
//! intents are computed once. Writes are last-writer-wins: the content is
//! deterministic given the key.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Solved chirp sequences for one cache key, each of length `n_seg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChirpRecord {
    /// Pitch per segment [m].
    pub period: Vec<f64>,
    /// Waveguide 1 width per segment [m].
    pub w1: Vec<f64>,
    /// Waveguide 2 width per segment [m].
    pub w2: Vec<f64>,
}

/// Directory-backed chirp-profile store.
#[derive(Debug, Clone)]
pub struct ChirpCache {
    root: PathBuf,
}

impl ChirpCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, n_seg: usize, start_wvl: f64, end_wvl: f64) -> PathBuf {
        let start_nm = (start_wvl * 1e9).round() as i64;
        let end_nm = (end_wvl * 1e9).round() as i64;
        self.root
            .join(format!("{}_{}_{}.json", n_seg, start_nm, end_nm))
    }

    /// Whether a solved profile exists for this key.
    pub fn contains(&self, n_seg: usize, start_wvl: f64, end_wvl: f64) -> bool {
        self.path(n_seg, start_wvl, end_wvl).exists()
    }

    /// Read the solved profile for this key.
    pub fn load(&self, n_seg: usize, start_wvl: f64, end_wvl: f64) -> Result<ChirpRecord> {
        let json = fs::read_to_string(self.path(n_seg, start_wvl, end_wvl))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the solved profile for this key, replacing any previous one.
    pub fn store(
        &self,
        n_seg: usize,
        start_wvl: f64,
        end_wvl: f64,
        record: &ChirpRecord,
    ) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.path(n_seg, start_wvl, end_wvl), json)?;
        Ok(())
    }
}
