//! Linear actuator trait
//!
//! The interface between the stroke engine and whatever moves the rail:
//! a servo, a stepper driver, or a simulated motor. Positions are absolute
//! millimetres from the outermost end of the usable travel.

use embassy_sync::blocking_mutex::raw::RawMutex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::motion::SharedProfile;

/// Errors that can occur when commanding an actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorError {
    /// Actuator is disabled
    Disabled,
    /// Actuator has not been homed
    NotHomed,
    /// Requested motion was rejected (non-finite or non-positive values)
    InvalidMotion,
    /// Driver reported a fault
    Fault,
}

/// Physical capabilities of an actuator
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActuatorLimits {
    /// Usable travel in mm
    pub max_position: f32,
    /// Maximum speed in mm/s
    pub max_speed: f32,
    /// Maximum acceleration in mm/s²
    pub max_acceleration: f32,
}

/// Snapshot of the actuator's ongoing motion
///
/// Used by the safety guard to avoid commanding a softer deceleration
/// than the one already in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorMotion {
    /// The last commanded move has finished
    pub completed: bool,
    /// Acceleration magnitude of the last commanded move in mm/s²
    pub acceleration: f32,
}

impl ActuatorMotion {
    /// An actuator standing still
    pub const fn at_rest() -> Self {
        Self {
            completed: true,
            acceleration: 0.0,
        }
    }
}

/// Trait for position-controlled linear actuators
pub trait Actuator {
    /// Energize the actuator
    fn enable(&mut self);

    /// De-energize the actuator; any motion stops
    fn disable(&mut self);

    /// Check if the actuator is enabled
    fn is_enabled(&self) -> bool;

    /// Establish the zero reference
    fn home(&mut self, now_ms: u64);

    /// Check if the zero reference is established
    fn is_homed(&self) -> bool;

    /// Check if the actuator accepts motion commands
    fn is_active(&self) -> bool {
        self.is_enabled() && self.is_homed() && !self.has_error()
    }

    /// Physical limits of the actuator
    fn limits(&self) -> ActuatorLimits;

    /// Move to an absolute position
    ///
    /// The position is clamped to the usable travel. Speed and acceleration
    /// are clamped to the actuator's limits.
    fn go_to_position(
        &mut self,
        position: f32,
        speed: f32,
        acceleration: f32,
        now_ms: u64,
    ) -> Result<(), ActuatorError>;

    /// Bring any motion to a controlled stop
    fn stop_motion(&mut self, now_ms: u64);

    /// Check if the last commanded move has finished
    fn motion_completed(&self, now_ms: u64) -> bool;

    /// Current position in mm
    fn get_position(&self, now_ms: u64) -> f32;

    /// Current signed speed in mm/s
    fn get_speed(&self, now_ms: u64) -> f32;

    /// Acceleration magnitude of the last commanded move in mm/s²
    fn get_acceleration(&self) -> f32;

    /// Check if the driver reports a fault
    fn has_error(&self) -> bool;

    /// Check if the actuator plans its moves on `profile`
    ///
    /// Actuators that follow a [`SharedProfile`] of their own must report it
    /// here; the engine refuses to plan on it.
    fn drives_profile<P: RawMutex>(&self, profile: &SharedProfile<P>) -> bool {
        let _ = profile;
        false
    }

    /// Motion snapshot for the safety guard
    fn motion(&self, now_ms: u64) -> ActuatorMotion {
        ActuatorMotion {
            completed: self.motion_completed(now_ms),
            acceleration: self.get_acceleration(),
        }
    }
}
