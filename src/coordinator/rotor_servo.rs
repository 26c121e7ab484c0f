//! L2 — drives the rotor toward `commanded_pose`, polling the measured
//! pose and mirroring it to the radio RPC. A 10-second convergence window
//! bounds each `goto` attempt; it re-issues on the next outer iteration
//! rather than blocking indefinitely, so a stuck motor can't wedge this
//! loop (only the interpreter's own wait is allowed to block unboundedly).

use crate::hardware::{RadioRpc, RotorDriver};
use crate::state::CoordinatorState;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};

const POLL_PERIOD: Duration = Duration::from_secs(1);
const CONVERGENCE_WINDOW: Duration = Duration::from_secs(10);

/// Runs the servo loop forever.
pub async fn run(
    state: Arc<CoordinatorState>,
    rotor: Arc<dyn RotorDriver>,
    radio: Arc<dyn RadioRpc>,
) {
    loop {
        let commanded = *state.commanded_pose.read().await;
        let measured = *state.measured_pose.read().await;

        if !measured.within_range(&commanded, state.pose_tolerance_deg) {
            if let Err(e) = rotor.goto(commanded).await {
                state.log_message(format!("rotor goto failed: {e}")).await;
            }
            let start = Instant::now();
            while start.elapsed() < CONVERGENCE_WINDOW {
                poll_and_mirror(&state, &rotor, &radio).await;
                let measured = *state.measured_pose.read().await;
                let commanded = *state.commanded_pose.read().await;
                if measured.within_range(&commanded, state.pose_tolerance_deg) {
                    break;
                }
                sleep(POLL_PERIOD).await;
            }
        } else {
            poll_and_mirror(&state, &rotor, &radio).await;
            sleep(POLL_PERIOD).await;
        }
    }
}

async fn poll_and_mirror(
    state: &CoordinatorState,
    rotor: &Arc<dyn RotorDriver>,
    radio: &Arc<dyn RadioRpc>,
) {
    match rotor.read().await {
        Ok(pose) => {
            *state.measured_pose.write().await = pose;
            if let Err(e) = radio.set_motor_az(pose.azimuth_deg).await {
                state.log_message(format!("radio rpc failure: {e}")).await;
            }
            if let Err(e) = radio.set_motor_el(pose.elevation_deg).await {
                state.log_message(format!("radio rpc failure: {e}")).await;
            }
        }
        Err(e) => {
            state.log_message(format!("rotor read failed: {e}")).await;
        }
    }
}
