//! Mask-layout export records.
//!
//! Downstream GDS tooling consumes a flat table of corrugation rectangle
//! centers: position along the grating, lateral offset, effective
//! waveguide width and local half-period, two rows per grating period for
//! each of the two waveguides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;
use crate::error::Result;
use crate::profile::SegmentProfile;

/// Corrugation depths of waveguide 1 and 2 [m].
pub const DEFAULT_CORRUGATIONS: (f64, f64) = (38e-9, 32e-9);
/// Gap between the two waveguides [m].
pub const DEFAULT_GAP: f64 = 100e-9;

/// Decimal places kept in exported micrometer values.
const EXPORT_DECIMALS: i32 = 3;

/// One corrugation rectangle center, in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub position_um: f64,
    pub offset_um: f64,
    pub width_um: f64,
    pub half_period_um: f64,
}

fn round_um(value_m: f64) -> f64 {
    let scale = 10f64.powi(EXPORT_DECIMALS);
    (value_m * 1e6 * scale).round() / scale
}

/// Expand the per-segment profile into per-half-period export rows for
/// both waveguides, with alternating corrugation offsets.
pub fn export_records(config: &DeviceConfig, profile: &SegmentProfile) -> Vec<ExportRow> {
    let n_seg = profile.len();
    if n_seg == 0 {
        return Vec::new();
    }
    let per_seg = (config.n_periods as usize / n_seg) * 2;
    let total = per_seg * n_seg;

    let mut kappa_ratio = Vec::with_capacity(total);
    let mut w1 = Vec::with_capacity(total);
    let mut w2 = Vec::with_capacity(total);
    let mut half_p = Vec::with_capacity(total);
    for j in 0..n_seg {
        let ratio = if config.kappa > 0.0 {
            profile.kappa[j] / config.kappa
        } else {
            0.0
        };
        for _ in 0..per_seg {
            kappa_ratio.push(ratio);
            w1.push(profile.w1[j]);
            w2.push(profile.w2[j]);
            half_p.push(profile.period[j] / 2.0);
        }
    }

    // Rectangle centers accumulate along the half-period ladder, starting
    // at the device origin.
    let mut z = Vec::with_capacity(total);
    let mut acc = 0.0;
    for &h in &half_p {
        acc += h;
        z.push(acc);
    }
    let z0 = z.first().copied().unwrap_or(0.0);
    for pos in &mut z {
        *pos -= z0;
    }

    let (corru1, corru2) = (DEFAULT_CORRUGATIONS.0, DEFAULT_CORRUGATIONS.1);
    let mut rows = Vec::with_capacity(2 * total);

    for t in 0..total {
        let depth = kappa_ratio[t] * corru1;
        let sign = if t % 2 == 0 { 1.0 } else { -1.0 };
        rows.push(ExportRow {
            position_um: round_um(z[t]),
            offset_um: round_um(sign * depth / 2.0),
            width_um: round_um(w1[t]),
            half_period_um: round_um(half_p[t]),
        });
    }
    for t in 0..total {
        let depth = kappa_ratio[t] * corru2;
        let mut offset = -w1[t] / 2.0 - DEFAULT_GAP - w2[t] / 2.0 + depth / 2.0;
        if t % 2 == 1 {
            offset -= depth;
        }
        rows.push(ExportRow {
            position_um: round_um(z[t]),
            offset_um: round_um(-offset),
            width_um: round_um(w2[t]),
            half_period_um: round_um(half_p[t]),
        });
    }

    rows
}

/// Write export rows as a whitespace-separated flat table.
pub fn write_design(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut out = String::with_capacity(rows.len() * 32);
    for row in rows {
        out.push_str(&format!(
            "{:.3} {:.3} {:.3} {:.3}\n",
            row.position_um, row.offset_um, row.width_um, row.half_period_um
        ));
    }
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode_index::EffectiveIndexTable;
    use crate::profile::build_profile;

    fn device() -> (DeviceConfig, SegmentProfile) {
        let config = DeviceConfig {
            n_periods: 100,
            n_seg: 10,
            ..Default::default()
        };
        let provider = EffectiveIndexTable::silicon_strip();
        let profile = build_profile(&config, &provider, None).unwrap();
        (config, profile)
    }

    #[test]
    fn test_row_count_twice_per_period_per_waveguide() {
        let (config, profile) = device();
        let rows = export_records(&config, &profile);
        // 2 rows per period, 2 waveguides.
        assert_eq!(rows.len(), 4 * config.n_periods as usize);
    }

    #[test]
    fn test_positions_start_at_origin_and_increase() {
        let (config, profile) = device();
        let rows = export_records(&config, &profile);
        let per_wg = rows.len() / 2;
        assert_eq!(rows[0].position_um, 0.0);
        for pair in rows[..per_wg].windows(2) {
            assert!(pair[1].position_um >= pair[0].position_um);
        }
        // Both waveguides share the same position ladder.
        assert_eq!(rows[0].position_um, rows[per_wg].position_um);
    }

    #[test]
    fn test_values_rounded_to_nanometer_grid() {
        let (config, profile) = device();
        for row in export_records(&config, &profile) {
            for v in [
                row.position_um,
                row.offset_um,
                row.width_um,
                row.half_period_um,
            ] {
                let scaled = v * 1000.0;
                assert!(
                    (scaled - scaled.round()).abs() < 1e-9,
                    "{} not on 3-decimal grid",
                    v
                );
            }
        }
    }

    #[test]
    fn test_apodized_ends_have_no_corrugation() {
        let (config, profile) = device();
        let rows = export_records(&config, &profile);
        // Gaussian apodization zeroes the first segment's coupling, so its
        // waveguide-1 rectangles sit on the axis.
        assert_eq!(rows[0].offset_um, 0.0);
    }

    #[test]
    fn test_write_design_roundtrip_line_count() {
        let (config, profile) = device();
        let rows = export_records(&config, &profile);
        let path = std::env::temp_dir().join("contradc_design_test.txt");
        write_design(&path, &rows).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), rows.len());
    }
}
