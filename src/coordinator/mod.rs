//! The daemon's coordination engine: wires the five activities together
//! around a shared [`CoordinatorState`] and runs startup synchronization,
//! then the command interpreter, to completion.

pub mod ephemeris_updater;
pub mod ingress;
pub mod interpreter;
pub mod rotor_servo;
pub mod status;

use crate::config::{load_calibration, Settings};
use crate::error::SrtError;
use crate::hardware::ephemeris::CsvEphemeris;
use crate::hardware::rotor::{MockRotor, RotorDriverConfig};
use crate::hardware::{EphemerisModel, RadioRpc, RotorDriver};
use crate::radio_tasks::RadioProcessTask;
use crate::state::CoordinatorState;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

const COMMAND_ENDPOINT: &str = "tcp://*:5556";
const STATUS_ENDPOINT: &str = "tcp://*:5555";
const RADIO_RPC_URL: &str = "http://localhost:5557/";

/// Loads configuration from `config_dir`, builds the default (mock rotor,
/// XML-RPC radio, CSV ephemeris) collaborators, and runs the daemon to
/// completion.
pub async fn run_daemon(config_dir: &Path) -> Result<(), SrtError> {
    let settings = Settings::load(config_dir)?;

    let rotor: Arc<dyn RotorDriver> = Arc::new(MockRotor::new(
        RotorDriverConfig {
            motor_type: settings.motor_type.clone(),
            port: settings.motor_port.clone(),
            limits: settings.limits(),
        },
        settings.stow_pose(),
        0.5,
    ));
    let radio: Arc<dyn RadioRpc> = Arc::new(crate::hardware::radio::XmlRpcRadio::new(RADIO_RPC_URL));
    let ephemeris: Arc<dyn EphemerisModel> = Arc::new(CsvEphemeris::load(
        &config_dir.join("sky_coords.csv"),
        settings.station.latitude,
        settings.station.longitude,
    )?);

    run(settings, config_dir, rotor, radio, ephemeris).await
}

/// Runs the daemon with injected collaborators — the seam integration
/// tests and alternate hardware backends use.
pub async fn run(
    settings: Settings,
    config_dir: &Path,
    rotor: Arc<dyn RotorDriver>,
    radio: Arc<dyn RadioRpc>,
    ephemeris: Arc<dyn EphemerisModel>,
) -> Result<(), SrtError> {
    let initial_catalog = ephemeris.positions_at(chrono::Utc::now());
    let calibration = load_calibration(config_dir, settings.radio_num_bins)?;

    let state = Arc::new(CoordinatorState::new(
        settings.limits(),
        settings.stow_pose(),
        settings.startup_offsets(),
        settings.beamwidth_deg,
        0.5,
        settings.radio_cf_hz,
        settings.radio_sf_hz,
        settings.radio_num_bins,
        settings.tsys_k,
        settings.tcal_k,
        settings.emergency_contact.clone(),
        (settings.station.latitude, settings.station.longitude),
        initial_catalog,
        calibration,
    ));

    let radio_process_task = RadioProcessTask::start(settings.radio_num_bins, settings.radio_integ_cycles);
    sleep(Duration::from_secs(5)).await;
    startup_sync(&state, &radio).await;

    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let ephemeris_handle = tokio::spawn(ephemeris_updater::run(state.clone(), ephemeris));
    let servo_handle = tokio::spawn(rotor_servo::run(state.clone(), rotor.clone(), radio.clone()));
    let ingress_handle = {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = ingress::run(COMMAND_ENDPOINT, state, command_tx).await {
                error!("command ingress stopped: {e}");
            }
        })
    };
    let status_handle = {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = status::run(STATUS_ENDPOINT, state).await {
                error!("status publisher stopped: {e}");
            }
        })
    };

    interpreter::run(state, rotor, radio, &settings, config_dir, command_rx).await;

    // The four background activities are daemons: they exit with the
    // process. Abort them explicitly rather than leaving them to be
    // dropped implicitly, so shutdown order is visible in the logs.
    ephemeris_handle.abort();
    servo_handle.abort();
    ingress_handle.abort();
    status_handle.abort();
    radio_process_task.terminate();

    info!("daemon shutdown complete");
    Ok(())
}

/// Pushes the initial parameter set to the radio RPC in the documented
/// order, with ~0.1s spacing between calls.
async fn startup_sync(state: &CoordinatorState, radio: &Arc<dyn RadioRpc>) {
    let center_freq = *state.radio_center_freq_hz.read().await;
    let sample_rate = *state.radio_sample_rate_hz.read().await;
    let measured = *state.measured_pose.read().await;
    let calibration = state.calibration.lock().await.clone();

    push_param(state, "Frequency", radio.set_freq(center_freq)).await;
    push_param(state, "Sample Rate", radio.set_samp_rate(sample_rate)).await;
    push_param(state, "Motor Azimuth", radio.set_motor_az(measured.azimuth_deg)).await;
    push_param(state, "Motor Elevation", radio.set_motor_el(measured.elevation_deg)).await;
    push_param(state, "System Temp", radio.set_tsys(state.tsys_k)).await;
    push_param(state, "Calibration Temp", radio.set_tcal(state.tcal_k)).await;
    push_param(state, "Calibration Power", radio.set_cal_pwr(calibration.power)).await;
    push_param(
        state,
        "Calibration Values",
        radio.set_cal_values(calibration.values.clone()),
    )
    .await;
    push_param(state, "Is Running", radio.set_is_running(true)).await;
    state.is_running.store(true, std::sync::atomic::Ordering::SeqCst);
}

async fn push_param(state: &CoordinatorState, name: &str, call: impl std::future::Future<Output = Result<(), SrtError>>) {
    info!("Setting {name}");
    if let Err(e) = call.await {
        state.log_message(format!("failed to set {name}: {e}")).await;
    }
    sleep(Duration::from_millis(100)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Limits, Offsets, Pose};
    use crate::hardware::radio::MockRadioRpc;
    use crate::state::CalibrationState;
    use std::collections::HashMap;

    #[tokio::test]
    async fn startup_sync_pushes_params_and_marks_running() {
        let state = CoordinatorState::new(
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
            400e6,
            2.4e6,
            4,
            100.0,
            300.0,
            "ops@example.org".to_string(),
            (41.3, -72.9),
            HashMap::new(),
            CalibrationState::default_for(4),
        );
        let mock_radio = Arc::new(MockRadioRpc::default());
        let radio: Arc<dyn RadioRpc> = mock_radio.clone();

        startup_sync(&state, &radio).await;

        assert_eq!(*mock_radio.freq_hz.lock().await, Some(400e6));
        assert_eq!(*mock_radio.is_running.lock().await, Some(true));
        assert!(state.is_running.load(std::sync::atomic::Ordering::SeqCst));
    }
}
