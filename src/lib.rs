//! Chirped Contra-Directional Coupler (CDC) Simulation
//!
//! Transfer-matrix model of segmented contra-directional couplers with
//! apodized coupling and chirped pitch/width profiles.

pub mod cache;
pub mod cascade;
pub mod config;
pub mod error;
pub mod export;
pub mod mode_index;
pub mod optimize;
pub mod performance;
pub mod profile;
pub mod simulation;
pub mod transfer_matrix;

pub use cache::{ChirpCache, ChirpRecord};
pub use cascade::{combine_stages, concatenate, reverse_profiles};
pub use config::{ApodShape, ChirpRange, DeviceConfig};
pub use error::{CdcError, Result};
pub use export::{export_records, write_design, ExportRow};
pub use mode_index::{build_mode_index_table, EffectiveIndexTable, ModeIndexProvider, ModeIndexTable};
pub use optimize::{optimize_chirp, solve};
pub use performance::{group_delay, summarize, Metric, PerformanceSummary};
pub use profile::{build_apodization, build_chirp, build_profile, SegmentProfile};
pub use simulation::CdcDevice;
pub use transfer_matrix::{propagate, SimulationResult};
