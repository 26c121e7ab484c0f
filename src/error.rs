//! Error types for the telescope daemon.
//!
//! Modeled on the layered `thiserror` enum used elsewhere in this codebase:
//! one variant per external failure mode, with `#[from]` conversions for the
//! library errors we wrap. Nothing here is meant to escape the daemon's main
//! loop — see `coordinator` for where each variant is caught and logged.

use thiserror::Error;

/// Errors raised while loading or validating configuration, or while a
/// running daemon interacts with its external collaborators.
#[derive(Debug, Error)]
pub enum SrtError {
    /// Failed to load the configuration source (missing file, bad YAML).
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but failed semantic validation.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Filesystem error reading/writing a config or calibration file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure parsing the persisted calibration file.
    #[error("malformed calibration file: {0}")]
    Calibration(#[from] serde_json::Error),

    /// The radio RPC endpoint refused the connection or returned a fault.
    #[error("radio rpc failure: {0}")]
    Rpc(String),

    /// The rotor driver rejected a command or returned a malformed reading.
    #[error("rotor driver failure: {0}")]
    Driver(String),

    /// A command token could not be parsed into the expected shape.
    #[error("command parse error: {0}")]
    Parse(String),

    /// The command/status transport could not bind its socket.
    #[error("transport error: {0}")]
    Transport(String),
}
