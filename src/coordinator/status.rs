//! L4 — at a fixed cadence, snapshots coordinator state and publishes it
//! as a single JSON object on a bound PUB socket.

use crate::error::SrtError;
use crate::state::CoordinatorState;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::warn;

const PERIOD: Duration = Duration::from_millis(500);

/// Binds a PUB socket at `endpoint` and publishes a status snapshot every
/// `PERIOD`, forever.
pub async fn run(endpoint: &str, state: Arc<CoordinatorState>) -> Result<(), SrtError> {
    let mut socket = tmq::publish(&tmq::Context::new())
        .bind(endpoint)
        .map_err(|e| SrtError::Transport(e.to_string()))?;

    loop {
        let snapshot = state.snapshot().await;
        match serde_json::to_vec(&snapshot) {
            Ok(payload) => {
                if let Err(e) = socket.send(vec![payload]).await {
                    warn!("status publish failed: {e}");
                }
            }
            Err(e) => warn!("failed to serialize status snapshot: {e}"),
        }
        sleep(PERIOD).await;
    }
}
