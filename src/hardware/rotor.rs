//! The rotor driver interface. Vendor-specific motor protocols are out of
//! scope; this module defines the collaborator shape (§6) plus a simulated
//! implementation used by default and by tests.

use crate::error::SrtError;
use crate::geometry::{Limits, Pose};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Construction parameters common to any rotor driver: motor type tag,
/// serial port path, and the angular bounds it enforces.
#[derive(Debug, Clone)]
pub struct RotorDriverConfig {
    pub motor_type: String,
    pub port: String,
    pub limits: Limits,
}

/// A collaborator that can start motion toward a pose, report its last
/// reading, and check whether a pose is within its mechanical bounds.
#[async_trait]
pub trait RotorDriver: Send + Sync {
    /// Starts motion toward `target`. Non-blocking: returns once the motor
    /// has accepted the command, not once it arrives. Errors if `target` is
    /// outside the driver's configured bounds.
    async fn goto(&self, target: Pose) -> Result<(), SrtError>;

    /// Reads the last known measured pose.
    async fn read(&self) -> Result<Pose, SrtError>;

    /// Whether `pose` lies within this driver's configured bounds.
    fn angles_within_bounds(&self, pose: Pose) -> bool;
}

/// A simulated rotor: steps its measured pose a fixed amount toward the
/// commanded pose on every `read`, so the servo loop converges in a bounded
/// number of polls without any physical hardware attached.
pub struct MockRotor {
    config: RotorDriverConfig,
    measured: RwLock<Pose>,
    target: RwLock<Pose>,
    step_deg: f64,
    reads: AtomicU64,
}

impl MockRotor {
    /// Builds a simulated rotor parked at `initial`, converging toward a
    /// commanded pose at `step_deg` per `read()` call.
    pub fn new(config: RotorDriverConfig, initial: Pose, step_deg: f64) -> Self {
        Self {
            config,
            measured: RwLock::new(initial),
            target: RwLock::new(initial),
            step_deg,
            reads: AtomicU64::new(0),
        }
    }

    /// Total number of `read()` calls served, exposed for tests that assert
    /// on convergence behavior.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RotorDriver for MockRotor {
    async fn goto(&self, target: Pose) -> Result<(), SrtError> {
        if !self.angles_within_bounds(target) {
            return Err(SrtError::Driver(format!(
                "target ({}, {}) outside bounds",
                target.azimuth_deg, target.elevation_deg
            )));
        }
        *self.target.write().await = target;
        Ok(())
    }

    async fn read(&self) -> Result<Pose, SrtError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let target = *self.target.read().await;
        let mut measured = self.measured.write().await;
        *measured = step_toward(*measured, target, self.step_deg);
        Ok(*measured)
    }

    fn angles_within_bounds(&self, pose: Pose) -> bool {
        self.config.limits.contains(&pose)
    }
}

fn step_toward(from: Pose, to: Pose, step_deg: f64) -> Pose {
    Pose::new(
        move_component(from.azimuth_deg, to.azimuth_deg, step_deg),
        move_component(from.elevation_deg, to.elevation_deg, step_deg),
    )
}

fn move_component(current: f64, target: f64, step: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= step {
        target
    } else {
        current + delta.signum() * step
    }
}
