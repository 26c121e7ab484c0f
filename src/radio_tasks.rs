//! Stand-ins for the three background radio tasks the daemon launches but
//! does not implement the internals of: the continuous FFT/integration
//! pipeline, raw-sample recording, and calibration. Each is a behavioral
//! interface per the external-collaborators note in this crate's scope —
//! these implementations are simulation-grade, enough to drive the
//! coordinator's state machine end-to-end without a real radio attached.

use crate::state::CalibrationState;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::info;

/// The continuous radio processing pipeline. Started once at daemon
/// startup and torn down at shutdown; in this simulation it's just a task
/// that stays alive until aborted.
pub struct RadioProcessTask {
    handle: JoinHandle<()>,
}

impl RadioProcessTask {
    /// Starts the processing pipeline. Mirrors the original's fallible
    /// start (a runtime error here is logged by the caller but does not
    /// stop the daemon from proceeding — error kind 5 in the error design).
    pub fn start(num_bins: usize, integ_cycles: u32) -> Self {
        info!(num_bins, integ_cycles, "starting radio processing task");
        let handle = tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(60)).await;
            }
        });
        Self { handle }
    }

    /// Stops the processing pipeline.
    pub fn terminate(self) {
        self.handle.abort();
    }
}

/// A live raw-sample recording session, writing at a configured sample
/// rate into `directory`.
pub struct RadioSaveRawTask {
    pub sample_rate_hz: f64,
    pub directory: PathBuf,
    handle: JoinHandle<()>,
}

impl RadioSaveRawTask {
    /// Starts recording raw samples at `sample_rate_hz` into `directory`.
    pub fn start(sample_rate_hz: f64, directory: PathBuf) -> Self {
        info!(sample_rate_hz, ?directory, "starting raw sample recording");
        let dir = directory.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                tracing::error!("failed to create recording directory {:?}: {e}", dir);
                return;
            }
            loop {
                sleep(Duration::from_secs(1)).await;
            }
        });
        Self {
            sample_rate_hz,
            directory,
            handle,
        }
    }

    /// Stops the recording.
    pub fn terminate(self) {
        self.handle.abort();
    }
}

/// A one-shot calibration run. Mirrors the original's "start, then join
/// with a 30s deadline regardless of completion" behavior.
pub struct RadioCalibrateTask;

impl RadioCalibrateTask {
    /// Runs a calibration pass, writing `calibration.json` into
    /// `config_dir` on completion, and returns once finished or once the
    /// 30s deadline elapses — whichever comes first. The caller proceeds to
    /// re-read the file regardless of which happened (error kind 7).
    pub async fn run(config_dir: PathBuf, num_bins: usize) {
        let task = tokio::spawn(async move {
            // Simulated integration time; a real task would run the
            // FFT/integration pipeline here.
            sleep(Duration::from_secs(2)).await;
            let calibration = CalibrationState::default_for(num_bins);
            if let Ok(json) = serde_json::to_string(&calibration) {
                let _ = tokio::fs::write(config_dir.join("calibration.json"), json).await;
            }
        });

        let _ = tokio::time::timeout(Duration::from_secs(30), task).await;
    }
}
