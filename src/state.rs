//! The shared coordinator state and its single-writer-per-field discipline.
//!
//! Rather than one coarse mutex around a `CoordinatorState` struct, each
//! field (or field-group) gets its own lock, matching the partitioned-state
//! approach used elsewhere in this codebase for multi-task coordinators.
//! Only one task is ever the writer for a given field; see the module docs
//! on `coordinator` for which task owns which lock.

use crate::geometry::{Limits, Offsets, Pose};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

/// Object key -> current apparent position, refreshed by the ephemeris
/// updater at a coarse cadence.
pub type ObjectCatalog = HashMap<String, Pose>;

/// `None` when no sky object is being tracked (manual/stow mode), otherwise
/// a key present in [`ObjectCatalog`].
pub type TrackTarget = Option<String>;

/// Per-bin gain and scalar reference power, as produced by a calibration
/// run and persisted to `calibration.json`.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct CalibrationState {
    /// Per-frequency-bin gain values.
    #[serde(rename = "cal_values")]
    pub values: Vec<f64>,
    /// Scalar reference power.
    #[serde(rename = "cal_pwr")]
    pub power: f64,
}

impl CalibrationState {
    /// The default calibration before any calibration run: all-ones gain,
    /// unity power.
    pub fn default_for(num_bins: usize) -> Self {
        Self {
            values: vec![1.0; num_bins],
            power: 1.0,
        }
    }
}

/// A live raw-sample recording session. `roff` and a `samp` rate change
/// both go through [`CoordinatorState::stop_recording`], which terminates
/// the wrapped task.
pub struct RecordingHandle {
    /// The running recording task.
    pub task: crate::radio_tasks::RadioSaveRawTask,
}

impl RecordingHandle {
    /// The sample rate the recording was started at, Hz.
    pub fn sample_rate_hz(&self) -> f64 {
        self.task.sample_rate_hz
    }
}

/// Fixed-name JSON snapshot published by the status task, field names
/// matching the wire contract observers parse against.
#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
    pub beam_width: f64,
    pub location: (f64, f64),
    pub motor_azel: (f64, f64),
    pub motor_cmd_azel: (f64, f64),
    pub object_locs: HashMap<String, (f64, f64)>,
    pub az_limits: (f64, f64),
    pub el_limits: (f64, f64),
    pub center_frequency: f64,
    pub bandwidth: f64,
    pub motor_offsets: (f64, f64),
    pub queued_item: String,
    pub queue_size: usize,
    pub emergency_contact: String,
    pub error_logs: Vec<(DateTime<Utc>, String)>,
    pub temp_cal: f64,
    pub temp_sys: f64,
    pub cal_power: f64,
}

/// Shared mutable state owned by the coordinator. See module docs for the
/// locking discipline.
pub struct CoordinatorState {
    pub measured_pose: RwLock<Pose>,
    pub commanded_pose: RwLock<Pose>,
    pub tracked_object: RwLock<TrackTarget>,
    pub motor_offsets: Mutex<Offsets>,
    pub object_positions: RwLock<ObjectCatalog>,
    pub calibration: Mutex<CalibrationState>,
    pub radio_center_freq_hz: RwLock<f64>,
    pub radio_sample_rate_hz: RwLock<f64>,
    pub recording_handle: Mutex<Option<RecordingHandle>>,
    pub queue_size: AtomicUsize,
    pub error_log: Mutex<VecDeque<(DateTime<Utc>, String)>>,
    pub current_queue_item: RwLock<String>,
    pub is_running: AtomicBool,

    /// Static configuration, read-only for the process lifetime.
    pub limits: Limits,
    pub stow_location: Pose,
    pub beamwidth_deg: f64,
    pub pose_tolerance_deg: f64,
    pub tsys_k: f64,
    pub tcal_k: f64,
    pub emergency_contact: String,
    pub station: (f64, f64),
}

/// Bound on the in-memory error log; the original kept an unbounded list,
/// but a long-running daemon needs a cap to avoid unbounded growth in a
/// process meant to run for days.
const ERROR_LOG_CAPACITY: usize = 2048;

impl CoordinatorState {
    /// Builds initial state from validated configuration. `initial_catalog`
    /// is the first ephemeris snapshot, used to seed `object_positions`
    /// before the ephemeris updater's first cycle.
    pub fn new(
        limits: Limits,
        stow_location: Pose,
        initial_offsets: Offsets,
        beamwidth_deg: f64,
        pose_tolerance_deg: f64,
        radio_center_freq_hz: f64,
        radio_sample_rate_hz: f64,
        num_bins: usize,
        tsys_k: f64,
        tcal_k: f64,
        emergency_contact: String,
        station: (f64, f64),
        initial_catalog: ObjectCatalog,
        calibration: CalibrationState,
    ) -> Self {
        let _ = num_bins; // width is carried by `calibration.values.len()`
        Self {
            measured_pose: RwLock::new(stow_location),
            commanded_pose: RwLock::new(stow_location.plus(initial_offsets)),
            tracked_object: RwLock::new(None),
            motor_offsets: Mutex::new(initial_offsets),
            object_positions: RwLock::new(initial_catalog),
            calibration: Mutex::new(calibration),
            radio_center_freq_hz: RwLock::new(radio_center_freq_hz),
            radio_sample_rate_hz: RwLock::new(radio_sample_rate_hz),
            recording_handle: Mutex::new(None),
            queue_size: AtomicUsize::new(0),
            error_log: Mutex::new(VecDeque::new()),
            current_queue_item: RwLock::new("None".to_string()),
            is_running: AtomicBool::new(false),
            limits,
            stow_location,
            beamwidth_deg,
            pose_tolerance_deg,
            tsys_k,
            tcal_k,
            emergency_contact,
            station,
        }
    }

    /// Appends a log entry and emits the matching tracing event. Every
    /// caller in this crate routes through here rather than `tracing::warn!`
    /// directly, so the message also lands in the published status log.
    pub async fn log_message(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        let mut log = self.error_log.lock().await;
        log.push_back((Utc::now(), message));
        while log.len() > ERROR_LOG_CAPACITY {
            log.pop_front();
        }
    }

    /// Stops any active recording, aborting its task. No-op if idle.
    pub async fn stop_recording(&self) {
        let mut guard = self.recording_handle.lock().await;
        if let Some(handle) = guard.take() {
            handle.task.terminate();
        }
    }

    /// Builds a best-effort snapshot for the status publisher. Each field is
    /// read under its own lock; no cross-field atomicity is attempted or
    /// required (spec: "best-effort view").
    pub async fn snapshot(&self) -> StatusSnapshot {
        let motor_azel = *self.measured_pose.read().await;
        let motor_cmd_azel = *self.commanded_pose.read().await;
        let object_locs = self
            .object_positions
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), (v.azimuth_deg, v.elevation_deg)))
            .collect();
        let motor_offsets = *self.motor_offsets.lock().await;
        let calibration = self.calibration.lock().await.clone();
        let error_logs = self.error_log.lock().await.iter().cloned().collect();

        StatusSnapshot {
            beam_width: self.beamwidth_deg,
            location: self.station,
            motor_azel: (motor_azel.azimuth_deg, motor_azel.elevation_deg),
            motor_cmd_azel: (motor_cmd_azel.azimuth_deg, motor_cmd_azel.elevation_deg),
            object_locs,
            az_limits: (self.limits.az_lo, self.limits.az_hi),
            el_limits: (self.limits.el_lo, self.limits.el_hi),
            center_frequency: *self.radio_center_freq_hz.read().await,
            bandwidth: *self.radio_sample_rate_hz.read().await,
            motor_offsets: (motor_offsets.d_az, motor_offsets.d_el),
            queued_item: self.current_queue_item.read().await.clone(),
            queue_size: self.queue_size.load(Ordering::SeqCst),
            emergency_contact: self.emergency_contact.clone(),
            error_logs,
            temp_cal: self.tcal_k,
            temp_sys: self.tsys_k,
            cal_power: calibration.power,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> CoordinatorState {
        CoordinatorState::new(
            Limits {
                az_lo: 0.0,
                az_hi: 360.0,
                el_lo: 0.0,
                el_hi: 90.0,
            },
            Pose::new(0.0, 90.0),
            Offsets::ZERO,
            2.0,
            0.5,
            400_000_000.0,
            2_400_000.0,
            512,
            100.0,
            300.0,
            "ops@example.org".to_string(),
            (41.3, -72.9),
            HashMap::new(),
            CalibrationState::default_for(512),
        )
    }

    #[tokio::test]
    async fn log_message_appends_and_is_read_back() {
        let state = test_state();
        state.log_message("hello").await;
        let snap = state.snapshot().await;
        assert_eq!(snap.error_logs.len(), 1);
        assert_eq!(snap.error_logs[0].1, "hello");
    }

    #[tokio::test]
    async fn snapshot_reflects_current_queue_item_default() {
        let state = test_state();
        let snap = state.snapshot().await;
        assert_eq!(snap.queued_item, "None");
        assert_eq!(snap.queue_size, 0);
    }

    #[tokio::test]
    async fn stop_recording_is_a_no_op_when_idle() {
        let state = test_state();
        state.stop_recording().await;
        assert!(state.recording_handle.lock().await.is_none());
    }
}
