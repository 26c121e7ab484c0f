//! The ephemeris collaborator: a catalog of fixed sky coordinates refreshed
//! to apparent azimuth/elevation for the station's location and the
//! current time. The original computation library this stands in for is
//! out of scope; this is a self-contained implementation so the daemon can
//! run without it.

use crate::geometry::Pose;
use crate::state::ObjectCatalog;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::Path;

/// A fixed right-ascension/declination catalog entry, degrees for
/// declination and hours for right ascension (the `sky_coords.csv`
/// convention).
#[derive(Debug, Clone, Copy)]
struct CatalogEntry {
    ra_hours: f64,
    dec_deg: f64,
}

/// Computes apparent az/el for a fixed RA/Dec catalog at a given station
/// and time.
pub trait EphemerisModel: Send + Sync {
    /// Refreshes every catalog entry to its apparent position at `at`.
    fn positions_at(&self, at: DateTime<Utc>) -> ObjectCatalog;
}

/// An [`EphemerisModel`] backed by a `sky_coords.csv` file with columns
/// `name,ra_hours,dec_deg`.
pub struct CsvEphemeris {
    station_lat_deg: f64,
    station_lon_deg: f64,
    entries: HashMap<String, CatalogEntry>,
}

impl CsvEphemeris {
    /// Loads the catalog from `path` for a station at
    /// (`station_lat_deg`, `station_lon_deg`).
    pub fn load(
        path: &Path,
        station_lat_deg: f64,
        station_lon_deg: f64,
    ) -> Result<Self, crate::error::SrtError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut entries = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let name = record
                .get(0)
                .ok_or_else(|| crate::error::SrtError::Parse("missing name column".to_string()))?
                .to_string();
            let ra_hours: f64 = record
                .get(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| crate::error::SrtError::Parse(format!("bad ra_hours for {name}")))?;
            let dec_deg: f64 = record
                .get(2)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| crate::error::SrtError::Parse(format!("bad dec_deg for {name}")))?;
            entries.insert(name, CatalogEntry { ra_hours, dec_deg });
        }
        Ok(Self {
            station_lat_deg,
            station_lon_deg,
            entries,
        })
    }
}

impl EphemerisModel for CsvEphemeris {
    fn positions_at(&self, at: DateTime<Utc>) -> ObjectCatalog {
        let lst_hours = local_sidereal_time_hours(at, self.station_lon_deg);
        self.entries
            .iter()
            .map(|(name, entry)| {
                let pose = ra_dec_to_az_el(
                    entry.ra_hours,
                    entry.dec_deg,
                    lst_hours,
                    self.station_lat_deg,
                );
                (name.clone(), pose)
            })
            .collect()
    }
}

/// Julian day number for `at`, via the standard Gregorian-calendar formula.
fn julian_day(at: DateTime<Utc>) -> f64 {
    let (year, month, day) = (at.year(), at.month() as i32, at.day() as i32);
    let day_fraction =
        (at.hour() as f64 + at.minute() as f64 / 60.0 + at.second() as f64 / 3600.0) / 24.0;
    let (y, m) = if month <= 2 {
        (year - 1, month + 12)
    } else {
        (year, month)
    };
    let a = (y as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y as f64 + 4716.0)).floor() + (30.6001 * (m as f64 + 1.0)).floor() + day as f64
        + day_fraction
        + b
        - 1524.5
}

/// Local apparent sidereal time, in hours, for longitude `lon_deg` (east
/// positive) at instant `at`.
fn local_sidereal_time_hours(at: DateTime<Utc>, lon_deg: f64) -> f64 {
    let jd = julian_day(at);
    let t = (jd - 2451545.0) / 36525.0;
    let gmst_deg = 280.460_618_37 + 360.985_647_366_29 * (jd - 2451545.0) + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    let lst_deg = (gmst_deg + lon_deg).rem_euclid(360.0);
    lst_deg / 15.0
}

/// Standard horizontal-coordinate transform from equatorial (RA/Dec) to
/// azimuth/elevation for a given local sidereal time and station latitude.
fn ra_dec_to_az_el(ra_hours: f64, dec_deg: f64, lst_hours: f64, lat_deg: f64) -> Pose {
    let hour_angle_deg = (lst_hours - ra_hours) * 15.0;
    let h = hour_angle_deg * PI / 180.0;
    let dec = dec_deg * PI / 180.0;
    let lat = lat_deg * PI / 180.0;

    let sin_alt = dec.sin() * lat.sin() + dec.cos() * lat.cos() * h.cos();
    let alt = sin_alt.clamp(-1.0, 1.0).asin();

    let cos_az = (dec.sin() - alt.sin() * lat.sin()) / (alt.cos() * lat.cos());
    let az = cos_az.clamp(-1.0, 1.0).acos();
    let az_deg = if h.sin() > 0.0 {
        360.0 - az.to_degrees()
    } else {
        az.to_degrees()
    };

    Pose::new(az_deg, alt.to_degrees())
}
