//! Pointing geometry: poses, bounds, offsets, and the scan patterns built on
//! top of them.
//!
//! All angles are degrees unless a function name says otherwise. Trig
//! corrections convert to radians locally (`· PI / 180`), matching the
//! convention the rest of the daemon uses for logged and configured values.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A single azimuth/elevation pointing, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Azimuth, degrees. Cyclic at 360 but treated linearly within bounds.
    pub azimuth_deg: f64,
    /// Elevation, degrees.
    pub elevation_deg: f64,
}

impl Pose {
    /// Builds a pose from raw azimuth/elevation degrees.
    pub fn new(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
        }
    }

    /// Adds an offset to this pose, producing the mechanical target.
    pub fn plus(&self, offsets: Offsets) -> Pose {
        Pose::new(
            self.azimuth_deg + offsets.d_az,
            self.elevation_deg + offsets.d_el,
        )
    }

    /// Two poses are "within range" when both components differ by less
    /// than `tolerance_deg`.
    pub fn within_range(&self, other: &Pose, tolerance_deg: f64) -> bool {
        (self.azimuth_deg - other.azimuth_deg).abs() < tolerance_deg
            && (self.elevation_deg - other.elevation_deg).abs() < tolerance_deg
    }
}

/// An azimuth/elevation offset pair, added to a logical target to produce a
/// mechanical `commanded_pose`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offsets {
    /// Azimuth offset, degrees.
    pub d_az: f64,
    /// Elevation offset, degrees.
    pub d_el: f64,
}

impl Offsets {
    /// The zero offset — the default when no scan or operator override is
    /// in effect.
    pub const ZERO: Offsets = Offsets {
        d_az: 0.0,
        d_el: 0.0,
    };
}

/// Two inclusive az/el intervals a pose must lie within to be "in bounds".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Inclusive lower azimuth bound.
    pub az_lo: f64,
    /// Inclusive upper azimuth bound.
    pub az_hi: f64,
    /// Inclusive lower elevation bound.
    pub el_lo: f64,
    /// Inclusive upper elevation bound.
    pub el_hi: f64,
}

impl Limits {
    /// A pose is in bounds iff both components lie within their inclusive
    /// interval (B1: equality with a bound counts as in-bounds).
    pub fn contains(&self, pose: &Pose) -> bool {
        (self.az_lo..=self.az_hi).contains(&pose.azimuth_deg)
            && (self.el_lo..=self.el_hi).contains(&pose.elevation_deg)
    }
}

/// The 5x5 raster-scan offset for scan index `s` in `0..25`, given the
/// target's own elevation (not the measured elevation — see the numeric
/// semantics note this mirrors) and the configured beamwidth.
///
/// The cosine correction is evaluated at `target_el + el_dif`, consistent
/// with the original daemon's per-iteration recomputation against the live
/// ephemeris position.
pub fn raster_offset(scan_index: u32, target_el_deg: f64, beamwidth_deg: f64) -> Offsets {
    let el_dif = ((scan_index / 5) as f64 - 2.0) * beamwidth_deg * 0.5;
    let az_dif = ((scan_index % 5) as f64 - 2.0) * beamwidth_deg * 0.5
        / ((target_el_deg + el_dif) * PI / 180.0).cos();
    Offsets {
        d_az: az_dif,
        d_el: el_dif,
    }
}

/// The beam-switch offset for position `j` in `{-1, 0, 1}`, using the
/// target's current elevation with no elevation offset involved.
pub fn beam_switch_offset(j: i32, target_el_deg: f64, beamwidth_deg: f64) -> Offsets {
    let az_dif = (j as f64) * beamwidth_deg / (target_el_deg * PI / 180.0).cos();
    Offsets {
        d_az: az_dif,
        d_el: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_range_requires_both_components_close() {
        let a = Pose::new(10.0, 20.0);
        let b = Pose::new(10.05, 20.05);
        assert!(a.within_range(&b, 0.1));
        assert!(!a.within_range(&b, 0.01));
    }

    #[test]
    fn limits_contains_is_inclusive() {
        let limits = Limits {
            az_lo: 0.0,
            az_hi: 360.0,
            el_lo: 0.0,
            el_hi: 90.0,
        };
        assert!(limits.contains(&Pose::new(0.0, 90.0)));
        assert!(limits.contains(&Pose::new(360.0, 0.0)));
        assert!(!limits.contains(&Pose::new(-0.1, 45.0)));
    }

    #[test]
    fn raster_offset_center_scan_is_zero() {
        let o = raster_offset(12, 45.0, 2.0);
        assert!((o.d_az).abs() < 1e-9);
        assert!((o.d_el).abs() < 1e-9);
    }

    #[test]
    fn raster_offset_uses_target_elevation_not_zero() {
        let o = raster_offset(0, 45.0, 2.0);
        let expected_el_dif = (0.0 - 2.0) * 2.0 * 0.5;
        let expected_az_dif = (0.0 - 2.0) * 2.0 * 0.5 / ((45.0 + expected_el_dif) * PI / 180.0).cos();
        assert!((o.d_el - expected_el_dif).abs() < 1e-9);
        assert!((o.d_az - expected_az_dif).abs() < 1e-9);
    }

    #[test]
    fn beam_switch_offset_has_no_elevation_component() {
        for j in [-1, 0, 1] {
            let o = beam_switch_offset(j, 30.0, 2.0);
            assert_eq!(o.d_el, 0.0);
        }
        assert_eq!(beam_switch_offset(0, 30.0, 2.0).d_az, 0.0);
    }
}
