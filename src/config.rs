//! Configuration loading and validation.
//!
//! The schema is a flat YAML document keyed by the station/motor/radio
//! settings the daemon needs at startup. Loaded via the `config` crate the
//! same way this codebase's legacy config path works — a single file
//! source, deserialized into a typed struct, then validated with explicit
//! range checks rather than relying on serde alone to catch semantic
//! mistakes (an azimuth limits pair that's present but inverted, say).

use crate::error::SrtError;
use crate::geometry::{Limits, Offsets, Pose};
use crate::state::CalibrationState;
use crate::validation::{is_in_range, is_not_empty, is_ordered_range, is_valid_path};
use serde::Deserialize;
use std::path::Path;

/// `STATION.{latitude,longitude}` — the observing site.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StationSettings {
    pub latitude: f64,
    pub longitude: f64,
}

/// A `{lower_bound, upper_bound}` inclusive interval, as used by
/// `AZLIMITS`/`ELLIMITS`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundPair {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// An `{azimuth, elevation}` pair, as used by `STOW_LOCATION`/`MOTOR_OFFSETS`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AzEl {
    pub azimuth: f64,
    pub elevation: f64,
}

/// The full configuration schema, deserialized directly from the
/// station's YAML document.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(rename = "STATION")]
    pub station: StationSettings,
    #[serde(rename = "EMERGENCY_CONTACT")]
    pub emergency_contact: String,
    #[serde(rename = "AZLIMITS")]
    pub az_limits: BoundPair,
    #[serde(rename = "ELLIMITS")]
    pub el_limits: BoundPair,
    #[serde(rename = "STOW_LOCATION")]
    pub stow_location: AzEl,
    #[serde(rename = "MOTOR_OFFSETS")]
    pub motor_offsets: AzEl,
    #[serde(rename = "MOTOR_TYPE")]
    pub motor_type: String,
    #[serde(rename = "MOTOR_PORT")]
    pub motor_port: String,
    #[serde(rename = "RADIO_CF")]
    pub radio_cf_hz: f64,
    #[serde(rename = "RADIO_SF")]
    pub radio_sf_hz: f64,
    #[serde(rename = "RADIO_NUM_BINS")]
    pub radio_num_bins: usize,
    #[serde(rename = "RADIO_INTEG_CYCLES")]
    pub radio_integ_cycles: u32,
    #[serde(rename = "BEAMWIDTH")]
    pub beamwidth_deg: f64,
    #[serde(rename = "TSYS")]
    pub tsys_k: f64,
    #[serde(rename = "TCAL")]
    pub tcal_k: f64,
    #[serde(rename = "SAVE_DIRECTORY")]
    pub save_directory: String,
}

impl Settings {
    /// Loads `config.yaml` from `config_dir` and validates it.
    pub fn load(config_dir: &Path) -> Result<Self, SrtError> {
        let source = config::File::from(config_dir.join("config.yaml"))
            .format(config::FileFormat::Yaml)
            .required(true);
        let settings: Settings = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Semantic checks beyond what serde's type-level deserialization can
    /// catch: ordered bound pairs, sane counts, non-empty paths.
    pub fn validate(&self) -> Result<(), SrtError> {
        is_ordered_range(self.az_limits.lower_bound, self.az_limits.upper_bound)
            .map_err(|e| SrtError::Configuration(format!("AZLIMITS: {e}")))?;
        is_ordered_range(self.el_limits.lower_bound, self.el_limits.upper_bound)
            .map_err(|e| SrtError::Configuration(format!("ELLIMITS: {e}")))?;
        is_in_range(
            self.stow_location.azimuth,
            self.az_limits.lower_bound,
            self.az_limits.upper_bound,
        )
        .map_err(|e| SrtError::Configuration(format!("STOW_LOCATION.azimuth: {e}")))?;
        is_in_range(
            self.stow_location.elevation,
            self.el_limits.lower_bound,
            self.el_limits.upper_bound,
        )
        .map_err(|e| SrtError::Configuration(format!("STOW_LOCATION.elevation: {e}")))?;
        is_not_empty(&self.motor_type)
            .map_err(|e| SrtError::Configuration(format!("MOTOR_TYPE: {e}")))?;
        is_valid_path(&self.motor_port)
            .map_err(|e| SrtError::Configuration(format!("MOTOR_PORT: {e}")))?;
        is_valid_path(&self.save_directory)
            .map_err(|e| SrtError::Configuration(format!("SAVE_DIRECTORY: {e}")))?;
        if self.radio_num_bins == 0 {
            return Err(SrtError::Configuration(
                "RADIO_NUM_BINS must be nonzero".to_string(),
            ));
        }
        if self.radio_integ_cycles == 0 {
            return Err(SrtError::Configuration(
                "RADIO_INTEG_CYCLES must be nonzero".to_string(),
            ));
        }
        if self.beamwidth_deg <= 0.0 {
            return Err(SrtError::Configuration(
                "BEAMWIDTH must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The motor bounds as the geometry module's `Limits` type.
    pub fn limits(&self) -> Limits {
        Limits {
            az_lo: self.az_limits.lower_bound,
            az_hi: self.az_limits.upper_bound,
            el_lo: self.el_limits.lower_bound,
            el_hi: self.el_limits.upper_bound,
        }
    }

    /// The configured stow pose.
    pub fn stow_pose(&self) -> Pose {
        Pose::new(self.stow_location.azimuth, self.stow_location.elevation)
    }

    /// The configured startup motor offsets.
    pub fn startup_offsets(&self) -> Offsets {
        Offsets {
            d_az: self.motor_offsets.azimuth,
            d_el: self.motor_offsets.elevation,
        }
    }
}

/// Loads `calibration.json` from `config_dir`, falling back to the default
/// (all-ones gain, unity power) when the file is absent.
pub fn load_calibration(config_dir: &Path, num_bins: usize) -> Result<CalibrationState, SrtError> {
    let path = config_dir.join("calibration.json");
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(CalibrationState::default_for(num_bins))
        }
        Err(e) => Err(SrtError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_yaml() -> &'static str {
        r#"
STATION:
  latitude: 41.3
  longitude: -72.9
EMERGENCY_CONTACT: "ops@example.org"
AZLIMITS:
  lower_bound: 0.0
  upper_bound: 360.0
ELLIMITS:
  lower_bound: 0.0
  upper_bound: 90.0
STOW_LOCATION:
  azimuth: 0.0
  elevation: 90.0
MOTOR_OFFSETS:
  azimuth: 0.0
  elevation: 0.0
MOTOR_TYPE: "alfaspid"
MOTOR_PORT: "/dev/ttyUSB0"
RADIO_CF: 400000000.0
RADIO_SF: 2400000.0
RADIO_NUM_BINS: 512
RADIO_INTEG_CYCLES: 1000
BEAMWIDTH: 2.0
TSYS: 100.0
TCAL: 300.0
SAVE_DIRECTORY: "/tmp/srt-data"
"#
    }

    fn write_config(dir: &Path, yaml: &str) {
        let mut f = std::fs::File::create(dir.join("config.yaml")).unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
    }

    #[test]
    fn loads_and_validates_a_well_formed_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), sample_yaml());
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.motor_type, "alfaspid");
        assert_eq!(settings.radio_num_bins, 512);
    }

    #[test]
    fn rejects_inverted_az_limits() {
        let dir = tempfile::tempdir().unwrap();
        let bad = sample_yaml().replace(
            "AZLIMITS:\n  lower_bound: 0.0\n  upper_bound: 360.0",
            "AZLIMITS:\n  lower_bound: 360.0\n  upper_bound: 0.0",
        );
        write_config(dir.path(), &bad);
        let err = Settings::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("AZLIMITS"));
    }

    #[test]
    fn rejects_stow_location_outside_limits() {
        let dir = tempfile::tempdir().unwrap();
        let bad = sample_yaml().replace(
            "STOW_LOCATION:\n  azimuth: 0.0\n  elevation: 90.0",
            "STOW_LOCATION:\n  azimuth: 0.0\n  elevation: 95.0",
        );
        write_config(dir.path(), &bad);
        let err = Settings::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("STOW_LOCATION"));
    }

    #[test]
    fn missing_calibration_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cal = load_calibration(dir.path(), 4).unwrap();
        assert_eq!(cal.values, vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(cal.power, 1.0);
    }

    #[test]
    fn present_calibration_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("calibration.json"),
            r#"{"cal_values": [0.5, 0.6], "cal_pwr": 2.0}"#,
        )
        .unwrap();
        let cal = load_calibration(dir.path(), 2).unwrap();
        assert_eq!(cal.values, vec![0.5, 0.6]);
        assert_eq!(cal.power, 2.0);
    }
}
