//! L3 — receives raw command strings from a bound PULL socket and
//! enqueues them FIFO. No parsing or validation happens here; each frame
//! is handed to the interpreter verbatim.

use crate::error::SrtError;
use crate::state::CoordinatorState;
use futures::StreamExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Binds a PULL socket at `endpoint` and forwards every received frame to
/// `sender`, incrementing the shared queue-size counter on enqueue.
pub async fn run(
    endpoint: &str,
    state: Arc<CoordinatorState>,
    sender: mpsc::UnboundedSender<String>,
) -> Result<(), SrtError> {
    let mut socket = tmq::pull(&tmq::Context::new())
        .bind(endpoint)
        .map_err(|e| SrtError::Transport(e.to_string()))?;

    while let Some(message) = socket.next().await {
        let multipart = message.map_err(|e| SrtError::Transport(e.to_string()))?;
        for frame in multipart.iter() {
            let Some(command) = frame.as_str() else {
                continue;
            };
            state.queue_size.fetch_add(1, Ordering::SeqCst);
            if sender.send(command.to_string()).is_err() {
                // Interpreter has shut down; nothing left to feed.
                return Ok(());
            }
        }
    }

    Ok(())
}
