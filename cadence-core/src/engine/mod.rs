//! Stroke engine
//!
//! The control loop and command surface clients talk to.

pub mod stroke_engine;
pub mod types;

pub use stroke_engine::{StrokeEngine, INVALID_PATTERN_NAME};
pub use types::{
    EngineError, Notification, StrokeLimit, StrokeParameter, Telemetry, NOTIFICATION_CAPACITY,
};
