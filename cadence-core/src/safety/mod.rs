//! Safety
//!
//! Physical limit enforcement and client liveness.

pub mod guard;
pub mod watchdog;

pub use guard::{
    GuardSetup, SafeStrokeParameters, SafetyGuard, MAX_VIBRATION_FREQUENCY_HZ,
    MIN_TIME_OF_STROKE_S, RATE_LOWER_LIMIT, RATE_UPPER_LIMIT,
};
pub use watchdog::{
    ClientId, HeartbeatWatchdog, WatchdogError, WatchdogMode, WatchdogStatus,
    HEARTBEAT_INTERVAL_MS,
};
