//! Factory defaults
//!
//! Values the engine starts with before any client or stored settings
//! change them.

/// Travel of the reference machine in mm
pub const FACTORY_TRAVEL_MM: f32 = 150.0;

/// Stroke in mm
pub const FACTORY_STROKE_MM: f32 = 80.0;

/// Rate in strokes per minute
pub const FACTORY_RATE: f32 = 30.0;

/// Sensation
pub const FACTORY_SENSATION: f32 = 0.0;

/// Pattern selected at start
pub const FACTORY_PATTERN: &str = "PoundingTeasing";

/// Vibration amplitude in mm
pub const FACTORY_VIBRATION_AMPLITUDE_MM: f32 = 0.0;

/// Vibration frequency in Hz
pub const FACTORY_VIBRATION_FREQUENCY_HZ: f32 = 30.0;

/// Rate limit in strokes per minute
pub const FACTORY_MAX_RATE: f32 = 240.0;

/// Speed of fixed moves and setpoint easing in mm/s
pub const FACTORY_EASE_IN_VELOCITY: f32 = 20.0;

/// Control loop period
pub const LOOP_PERIOD_MS: u32 = 10;

/// Speed limit of the reference machine in mm/s
///
/// 3000 rpm on a 20 tooth pulley with a 2 mm belt pitch.
pub const FACTORY_MAX_VELOCITY: f32 = 2000.0;

/// Acceleration limit of the reference machine in mm/s²
pub const FACTORY_MAX_ACCELERATION: f32 = 100_000.0;

/// Travel kept clear at either end of the rail in mm
pub const FACTORY_KEEPOUT_MM: f32 = 5.0;
