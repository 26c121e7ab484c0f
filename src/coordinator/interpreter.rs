//! C — the command interpreter: a single-threaded consumer of the command
//! queue that mutates shared target/offset/recording/radio state and
//! blocks until pointing transitions settle.

use crate::command::{self, Command};
use crate::config::{load_calibration, Settings};
use crate::geometry::{Offsets, Pose};
use crate::hardware::{RadioRpc, RotorDriver};
use crate::radio_tasks::{RadioCalibrateTask, RadioSaveRawTask};
use crate::state::{CoordinatorState, RecordingHandle};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// Busy-polling granularity for "block until in range" waits, matching the
/// upstream behavior: bounded only by the servo's own convergence cycle,
/// never by the interpreter itself.
const WAIT_POLL_PERIOD: Duration = Duration::from_millis(100);

/// The inter-position dwell time during raster scans and beam-switches.
const DWELL: Duration = Duration::from_secs(5);

/// Runs the command interpreter until a `quit` command (or a closed
/// channel) ends the loop, then performs the shutdown sequence.
pub async fn run(
    state: Arc<CoordinatorState>,
    rotor: Arc<dyn RotorDriver>,
    radio: Arc<dyn RadioRpc>,
    settings: &Settings,
    config_dir: &Path,
    mut receiver: mpsc::UnboundedReceiver<String>,
) {
    loop {
        *state.current_queue_item.write().await = "None".to_string();

        let Some(raw) = receiver.recv().await else {
            break;
        };
        state.queue_size.fetch_sub(1, Ordering::SeqCst);
        state.log_message(format!("Running Command '{raw}'")).await;
        *state.current_queue_item.write().await = raw.clone();

        let catalog = state.object_positions.read().await.clone();
        let parsed = command::parse(&raw, &catalog);

        match parsed {
            Command::Comment => {}
            Command::Invalid(raw) => {
                state
                    .log_message(format!("Invalid Command Arguments '{raw}'"))
                    .await;
            }
            Command::Unknown(raw) => {
                state
                    .log_message(format!("Command Not Identified '{raw}'"))
                    .await;
            }
            Command::Track(key) => track(&state, &rotor, &catalog, &key).await,
            Command::TrackScanN(key) => raster_scan(&state, &key).await,
            Command::TrackBeamSwitch(key) => beam_switch(&state, &key).await,
            Command::Sleep(secs) => sleep(Duration::from_secs_f64(secs.max(0.0))).await,
            Command::Stow => stow(&state).await,
            Command::Calibrate => {
                calibrate(&state, &radio, config_dir, settings.radio_num_bins).await
            }
            Command::Quit => {
                let _ = radio.set_is_running(false).await;
                break;
            }
            Command::RecordStart => record_start(&state, settings).await,
            Command::RecordStop => state.stop_recording().await,
            Command::SetFreq(hz) => set_freq(&state, &radio, hz).await,
            Command::SetSampRate(hz) => set_samp_rate(&state, &radio, settings, hz).await,
            Command::ManualPoint(az, el) => manual_point(&state, &rotor, az, el).await,
            Command::SetOffset(d_az, d_el) => {
                *state.motor_offsets.lock().await = Offsets { d_az, d_el };
            }
        }
    }

    shutdown(&state).await;
}

/// Blocks until `measured_pose` is within tolerance of `target`. Bounded
/// only by the rotor servo's own convergence cycle — no timeout here.
async fn wait_until_in_range(state: &CoordinatorState, target: Pose) {
    loop {
        let measured = *state.measured_pose.read().await;
        if measured.within_range(&target, state.pose_tolerance_deg) {
            return;
        }
        sleep(WAIT_POLL_PERIOD).await;
    }
}

async fn track(
    state: &CoordinatorState,
    rotor: &Arc<dyn RotorDriver>,
    catalog: &crate::state::ObjectCatalog,
    key: &str,
) {
    let Some(&pose) = catalog.get(key) else {
        return;
    };
    if rotor.angles_within_bounds(pose) {
        *state.tracked_object.write().await = Some(key.to_string());
        let offsets = *state.motor_offsets.lock().await;
        let target = pose.plus(offsets);
        *state.commanded_pose.write().await = target;
        wait_until_in_range(state, target).await;
    } else {
        state
            .log_message(format!("Object {key} Not in Motor Bounds"))
            .await;
        *state.tracked_object.write().await = None;
    }
}

async fn raster_scan(state: &CoordinatorState, key: &str) {
    *state.tracked_object.write().await = None;
    for scan in 0..25u32 {
        let pose = match state.object_positions.read().await.get(key).copied() {
            Some(p) => p,
            None => break,
        };
        let offsets = crate::geometry::raster_offset(scan, pose.elevation_deg, state.beamwidth_deg);
        *state.motor_offsets.lock().await = offsets;
        let target = pose.plus(offsets);
        *state.commanded_pose.write().await = target;
        wait_until_in_range(state, target).await;
        sleep(DWELL).await;
    }
    *state.motor_offsets.lock().await = Offsets::ZERO;
    *state.tracked_object.write().await = Some(key.to_string());
}

async fn beam_switch(state: &CoordinatorState, key: &str) {
    *state.tracked_object.write().await = None;
    let Some(pose) = state.object_positions.read().await.get(key).copied() else {
        return;
    };
    for j in [-1i32, 0, 1] {
        let offsets = crate::geometry::beam_switch_offset(j, pose.elevation_deg, state.beamwidth_deg);
        *state.motor_offsets.lock().await = offsets;
        let target = pose.plus(offsets);
        *state.commanded_pose.write().await = target;
        wait_until_in_range(state, target).await;
        sleep(DWELL).await;
    }
    *state.motor_offsets.lock().await = Offsets::ZERO;
    *state.tracked_object.write().await = Some(key.to_string());
}

async fn stow(state: &CoordinatorState) {
    *state.tracked_object.write().await = None;
    let target = state.stow_location;
    *state.commanded_pose.write().await = target;
    wait_until_in_range(state, target).await;
}

async fn calibrate(
    state: &CoordinatorState,
    radio: &Arc<dyn RadioRpc>,
    config_dir: &Path,
    num_bins: usize,
) {
    RadioCalibrateTask::run(config_dir.to_path_buf(), num_bins).await;
    match load_calibration(config_dir, num_bins) {
        Ok(calibration) => {
            if let Err(e) = radio.set_cal_pwr(calibration.power).await {
                state.log_message(format!("calibration rpc failure: {e}")).await;
            }
            if let Err(e) = radio.set_cal_values(calibration.values.clone()).await {
                state.log_message(format!("calibration rpc failure: {e}")).await;
            }
            *state.calibration.lock().await = calibration;
            state.log_message("Calibration Done").await;
        }
        Err(e) => {
            state
                .log_message(format!("failed to reload calibration: {e}"))
                .await;
        }
    }
}

async fn record_start(state: &CoordinatorState, settings: &Settings) {
    let mut guard = state.recording_handle.lock().await;
    if guard.is_some() {
        drop(guard);
        state
            .log_message("Cannot Start Recording - Already Recording")
            .await;
        return;
    }
    let sample_rate_hz = *state.radio_sample_rate_hz.read().await;
    let directory = std::path::PathBuf::from(&settings.save_directory);
    let task = RadioSaveRawTask::start(sample_rate_hz, directory);
    *guard = Some(RecordingHandle { task });
}

async fn set_freq(state: &CoordinatorState, radio: &Arc<dyn RadioRpc>, hz: f64) {
    match radio.set_freq(hz).await {
        Ok(()) => *state.radio_center_freq_hz.write().await = hz,
        Err(e) => state.log_message(format!("radio rpc failure: {e}")).await,
    }
}

async fn set_samp_rate(
    state: &CoordinatorState,
    radio: &Arc<dyn RadioRpc>,
    settings: &Settings,
    hz: f64,
) {
    let was_recording = state.recording_handle.lock().await.is_some();
    if was_recording {
        state.stop_recording().await;
    }
    match radio.set_samp_rate(hz).await {
        Ok(()) => *state.radio_sample_rate_hz.write().await = hz,
        Err(e) => {
            state.log_message(format!("radio rpc failure: {e}")).await;
            return;
        }
    }
    if was_recording {
        let directory = std::path::PathBuf::from(&settings.save_directory);
        let task = RadioSaveRawTask::start(hz, directory);
        *state.recording_handle.lock().await = Some(RecordingHandle { task });
    }
}

async fn manual_point(state: &CoordinatorState, rotor: &Arc<dyn RotorDriver>, az: f64, el: f64) {
    *state.tracked_object.write().await = None;
    let candidate = Pose::new(az, el);
    if rotor.angles_within_bounds(candidate) {
        let offsets = *state.motor_offsets.lock().await;
        let target = candidate.plus(offsets);
        *state.commanded_pose.write().await = target;
        wait_until_in_range(state, target).await;
    } else {
        state
            .log_message(format!("Object at ({az}, {el}) Not in Motor Bounds"))
            .await;
    }
}

/// §4.6: exit the command loop, stow, block until in range, stop any
/// recording, and leave the radio processing task to the caller (it is
/// owned outside the interpreter, see `coordinator::run`).
async fn shutdown(state: &CoordinatorState) {
    let target = state.stow_location;
    *state.commanded_pose.write().await = target;
    wait_until_in_range(state, target).await;
    state.stop_recording().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Limits;
    use crate::hardware::radio::MockRadioRpc;
    use crate::hardware::rotor::{MockRotor, RotorDriverConfig};
    use crate::state::CalibrationState;
    use std::collections::HashMap;

    fn limits() -> Limits {
        Limits {
            az_lo: 0.0,
            az_hi: 360.0,
            el_lo: 0.0,
            el_hi: 90.0,
        }
    }

    fn state_with_catalog(catalog: HashMap<String, Pose>) -> Arc<CoordinatorState> {
        let state = CoordinatorState::new(
            limits(),
            Pose::new(0.0, 90.0),
            Offsets::ZERO,
            2.0,
            0.5,
            400e6,
            2.4e6,
            4,
            100.0,
            300.0,
            "ops@example.org".to_string(),
            (41.3, -72.9),
            catalog,
            CalibrationState::default_for(4),
        );
        Arc::new(state)
    }

    fn instant_rotor() -> Arc<dyn RotorDriver> {
        // A near-zero step size makes goto() converge on the very next read.
        Arc::new(MockRotor::new(
            RotorDriverConfig {
                motor_type: "sim".to_string(),
                port: "sim0".to_string(),
                limits: limits(),
            },
            Pose::new(0.0, 90.0),
            360.0,
        ))
    }

    #[tokio::test]
    async fn manual_point_out_of_bounds_is_logged_and_unchanged() {
        let state = state_with_catalog(HashMap::new());
        let rotor = instant_rotor();
        let before = *state.commanded_pose.read().await;

        manual_point(&state, &rotor, 10.0, 95.0).await;

        assert_eq!(*state.commanded_pose.read().await, before);
        let snap = state.snapshot().await;
        assert!(snap
            .error_logs
            .iter()
            .any(|(_, msg)| msg.contains("Not in Motor Bounds")));
    }

    #[tokio::test]
    async fn set_offset_overwrites_atomically() {
        let state = state_with_catalog(HashMap::new());
        *state.motor_offsets.lock().await = Offsets { d_az: 1.0, d_el: 1.0 };
        let offsets = Offsets { d_az: -2.0, d_el: 3.0 };
        *state.motor_offsets.lock().await = offsets;
        assert_eq!(*state.motor_offsets.lock().await, offsets);
    }

    #[tokio::test]
    async fn record_then_record_again_logs_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let settings_yaml_dir = dir.path().to_path_buf();
        let state = state_with_catalog(HashMap::new());
        let settings = test_settings(&settings_yaml_dir);

        record_start(&state, &settings).await;
        assert!(state.recording_handle.lock().await.is_some());

        record_start(&state, &settings).await;
        let snap = state.snapshot().await;
        assert!(snap
            .error_logs
            .iter()
            .any(|(_, msg)| msg.contains("Already Recording")));

        state.stop_recording().await;
        assert!(state.recording_handle.lock().await.is_none());
    }

    fn test_settings(save_dir: &std::path::Path) -> Settings {
        use crate::config::{AzEl, BoundPair, StationSettings};
        Settings {
            station: StationSettings {
                latitude: 41.3,
                longitude: -72.9,
            },
            emergency_contact: "ops@example.org".to_string(),
            az_limits: BoundPair {
                lower_bound: 0.0,
                upper_bound: 360.0,
            },
            el_limits: BoundPair {
                lower_bound: 0.0,
                upper_bound: 90.0,
            },
            stow_location: AzEl {
                azimuth: 0.0,
                elevation: 90.0,
            },
            motor_offsets: AzEl {
                azimuth: 0.0,
                elevation: 0.0,
            },
            motor_type: "sim".to_string(),
            motor_port: "sim0".to_string(),
            radio_cf_hz: 400e6,
            radio_sf_hz: 2.4e6,
            radio_num_bins: 4,
            radio_integ_cycles: 10,
            beamwidth_deg: 2.0,
            tsys_k: 100.0,
            tcal_k: 300.0,
            save_directory: save_dir.to_string_lossy().to_string(),
        }
    }
}
