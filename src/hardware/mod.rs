//! External collaborators the coordinator drives but does not implement
//! itself: the rotor driver, the radio control-plane RPC client, and the
//! ephemeris model. Each is a small trait (matching this codebase's
//! "atomic capability" style of focused, `Send + Sync`, `async_trait`
//! interfaces) plus a usable default implementation so the daemon can run
//! end-to-end without real hardware attached.

pub mod ephemeris;
pub mod radio;
pub mod rotor;

pub use ephemeris::{CsvEphemeris, EphemerisModel};
pub use radio::{MockRadioRpc, RadioRpc, XmlRpcRadio};
pub use rotor::{MockRotor, RotorDriver};
