//! Engine command surface types

use crate::state::StrokeCommand;

/// Capacity of the notification queue
pub const NOTIFICATION_CAPACITY: usize = 8;

/// Errors when attaching an actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// The actuator plans its own moves on the profile given for the main
    /// motion, so every vibration step would overwrite the plan
    PlanProfileShared,
}

/// Setpoints a client can change while stroking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StrokeParameter {
    /// Strokes per minute
    Rate,
    /// Deepest position in mm
    Depth,
    /// Stroke length in mm
    Stroke,
    /// Pattern shape parameter, -100 to 100
    Sensation,
}

/// Machine limits a client can change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StrokeLimit {
    /// Highest rate in strokes per minute
    Rate,
    /// Highest speed in mm/s
    Velocity,
    /// Deepest allowed depth in mm
    Depth,
    /// Longest allowed stroke in mm
    Stroke,
}

/// Messages for clients, drained with
/// [`StrokeEngine::take_notification`](super::StrokeEngine::take_notification)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// Actuator stopped being active while stroking
    MotorError,
    /// A setter clamped or rejected its input
    ParameterRestricted,
    /// Watchdog tripped and motion was stopped
    HeartbeatLost,
    /// The actuator refused a move
    MoveRejected,
}

impl Notification {
    /// Human-readable message
    pub fn message(&self) -> &'static str {
        match self {
            Notification::MotorError => "Motor Error",
            Notification::ParameterRestricted => "Parameter restricted",
            Notification::HeartbeatLost => "Heartbeat lost",
            Notification::MoveRejected => "Move rejected",
        }
    }
}

/// Snapshot of the engine and actuator
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    /// Actuator position in mm
    pub position: f32,
    /// Actuator speed in mm/s
    pub speed: f32,
    pub homed: bool,
    pub error: bool,
    /// A pattern is running
    pub active: bool,
    pub command: StrokeCommand,
    pub pattern_index: usize,
}
