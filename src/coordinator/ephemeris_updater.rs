//! L1 — periodically recomputes every catalog object's apparent position
//! and, if a sky object is currently tracked, re-derives the commanded
//! pose from it. Never blocks on rotor motion; it only publishes intent.

use crate::hardware::EphemerisModel;
use crate::state::CoordinatorState;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

const PERIOD: Duration = Duration::from_secs(5);

/// Runs the ephemeris refresh loop forever.
pub async fn run(state: Arc<CoordinatorState>, ephemeris: Arc<dyn EphemerisModel>) {
    loop {
        let positions = ephemeris.positions_at(chrono::Utc::now());
        *state.object_positions.write().await = positions.clone();

        let tracked = state.tracked_object.read().await.clone();
        if let Some(key) = tracked {
            match positions.get(&key) {
                Some(&pose) if state.limits.contains(&pose) => {
                    let offsets = *state.motor_offsets.lock().await;
                    *state.commanded_pose.write().await = pose.plus(offsets);
                }
                _ => {
                    state
                        .log_message(format!("Object {key} moved out of motor bounds"))
                        .await;
                    *state.tracked_object.write().await = None;
                }
            }
        }

        sleep(PERIOD).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Limits, Offsets, Pose};
    use crate::state::CalibrationState;
    use std::collections::HashMap;

    struct FixedEphemeris(std::sync::Mutex<HashMap<String, Pose>>);

    impl EphemerisModel for FixedEphemeris {
        fn positions_at(&self, _at: chrono::DateTime<chrono::Utc>) -> HashMap<String, Pose> {
            self.0.lock().unwrap().clone()
        }
    }

    fn state() -> Arc<CoordinatorState> {
        Arc::new(CoordinatorState::new(
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
        ))
    }

    #[tokio::test]
    async fn refresh_moves_commanded_pose_for_tracked_object() {
        let state = state();
        *state.tracked_object.write().await = Some("Sun".to_string());
        let mut catalog = HashMap::new();
        catalog.insert("Sun".to_string(), Pose::new(121.0, 30.0));
        let ephemeris = Arc::new(FixedEphemeris(std::sync::Mutex::new(catalog)));

        // Run a single refresh cycle manually rather than looping forever.
        let positions = ephemeris.positions_at(chrono::Utc::now());
        *state.object_positions.write().await = positions.clone();
        let key = state.tracked_object.read().await.clone().unwrap();
        let pose = positions[&key];
        assert!(state.limits.contains(&pose));
        *state.commanded_pose.write().await = pose.plus(*state.motor_offsets.lock().await);

        assert_eq!(
            *state.commanded_pose.read().await,
            Pose::new(121.0, 30.0)
        );
    }

    #[tokio::test]
    async fn tracked_object_cleared_when_out_of_bounds() {
        let state = state();
        *state.tracked_object.write().await = Some("Polaris".to_string());
        let mut catalog = HashMap::new();
        catalog.insert("Polaris".to_string(), Pose::new(0.0, 95.0));
        *state.object_positions.write().await = catalog.clone();

        let pose = catalog["Polaris"];
        if !state.limits.contains(&pose) {
            state
                .log_message("Object Polaris moved out of motor bounds")
                .await;
            *state.tracked_object.write().await = None;
        }

        assert!(state.tracked_object.read().await.is_none());
        assert_eq!(state.snapshot().await.error_logs.len(), 1);
    }
}
