//! Actuator driver seam.
//!
//! The control loop talks to hardware exclusively through [`ActuatorDriver`].
//! How a target translates into motor PWM lives behind this trait, outside
//! this crate.

use thiserror::Error;
use tracing::info;

use hand::sensor::Finger;

/// Driver-level failures, reported per command.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The drive rejected or failed the command.
    #[error("drive fault: {0}")]
    Fault(String),
}

/// Hardware-facing actuator operations, one per command variant.
pub trait ActuatorDriver: Send {
    fn go_to_angle(&mut self, servo: u8, angle_deg: u16) -> Result<(), DriverError>;
    fn set_lock(&mut self, servo: u8, locked: bool) -> Result<(), DriverError>;
    fn smooth_move(
        &mut self,
        servo: u8,
        angle_deg: u16,
        duration_ms: u32,
    ) -> Result<(), DriverError>;
    fn seek_pressure(&mut self, finger: Finger, pressure_kpa: f32) -> Result<(), DriverError>;
    fn hold_gesture(&mut self, gesture: u8, hold_ms: u32) -> Result<(), DriverError>;
}

/// Bring-up driver: logs every operation and reports success.
///
/// Stands in for hardware on the bench, the way a simulation driver stands
/// in for a real axis drive.
#[derive(Debug, Default)]
pub struct LoggingDriver;

impl ActuatorDriver for LoggingDriver {
    fn go_to_angle(&mut self, servo: u8, angle_deg: u16) -> Result<(), DriverError> {
        info!(servo, angle_deg, "go_to_angle");
        Ok(())
    }

    fn set_lock(&mut self, servo: u8, locked: bool) -> Result<(), DriverError> {
        info!(servo, locked, "set_lock");
        Ok(())
    }

    fn smooth_move(
        &mut self,
        servo: u8,
        angle_deg: u16,
        duration_ms: u32,
    ) -> Result<(), DriverError> {
        info!(servo, angle_deg, duration_ms, "smooth_move");
        Ok(())
    }

    fn seek_pressure(&mut self, finger: Finger, pressure_kpa: f32) -> Result<(), DriverError> {
        info!(?finger, pressure_kpa, "seek_pressure");
        Ok(())
    }

    fn hold_gesture(&mut self, gesture: u8, hold_ms: u32) -> Result<(), DriverError> {
        info!(gesture, hold_ms, "hold_gesture");
        Ok(())
    }
}
