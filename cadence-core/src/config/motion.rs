//! Motion settings
//!
//! The user-facing setpoints and limits as one record, so an embedder can
//! persist them (typically postcard-serialized) and restore them at boot.
//! Nothing here is trusted: stored values pass [`MotionConfig::sanitize`]
//! and then the engine's own setters.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::defaults::*;
use crate::engine::{StrokeEngine, StrokeLimit, StrokeParameter};
use crate::pattern::registry::PATTERN_NAMES;
use crate::pattern::{SENSATION_MAX, SENSATION_MIN};
use crate::safety::guard::{constrain, finite_or};
use crate::safety::{MAX_VIBRATION_FREQUENCY_HZ, RATE_LOWER_LIMIT, RATE_UPPER_LIMIT};
use crate::traits::{Actuator, ActuatorLimits};

/// Magic number to identify stored motion settings
pub const MOTION_CONFIG_MAGIC: u32 = 0x4341_4443; // "CADC"

/// Current motion settings version
pub const MOTION_CONFIG_VERSION: u8 = 1;

/// Maximum pattern name length
pub const MAX_PATTERN_NAME_LEN: usize = 32;

/// Persistable motion settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionConfig {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    /// Depth in mm
    pub depth: f32,
    /// Stroke in mm
    pub stroke: f32,
    /// Strokes per minute
    pub rate: f32,
    pub sensation: f32,
    /// Selected pattern by name
    pub pattern: String<MAX_PATTERN_NAME_LEN>,
    /// Vibration amplitude in mm
    pub vibration_amplitude: f32,
    /// Vibration frequency in Hz
    pub vibration_frequency: f32,
    /// Speed of fixed moves and easing in mm/s
    pub ease_in_speed: f32,
    /// Strokes per minute
    pub rate_limit: f32,
    /// mm/s
    pub velocity_limit: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            magic: MOTION_CONFIG_MAGIC,
            version: MOTION_CONFIG_VERSION,
            depth: FACTORY_TRAVEL_MM,
            stroke: FACTORY_STROKE_MM,
            rate: FACTORY_RATE,
            sensation: FACTORY_SENSATION,
            pattern: factory_pattern(),
            vibration_amplitude: FACTORY_VIBRATION_AMPLITUDE_MM,
            vibration_frequency: FACTORY_VIBRATION_FREQUENCY_HZ,
            ease_in_speed: FACTORY_EASE_IN_VELOCITY,
            rate_limit: FACTORY_MAX_RATE,
            velocity_limit: FACTORY_MAX_VELOCITY,
        }
    }
}

fn factory_pattern() -> String<MAX_PATTERN_NAME_LEN> {
    let mut name = String::new();
    // Fits: every registered name is shorter than the capacity
    let _ = name.push_str(FACTORY_PATTERN);
    name
}

impl MotionConfig {
    /// Check if the data is valid (magic and version match)
    pub fn is_valid(&self) -> bool {
        self.magic == MOTION_CONFIG_MAGIC && self.version == MOTION_CONFIG_VERSION
    }

    /// Read the settings currently in effect on an engine
    pub fn capture<M: RawMutex, A: Actuator>(engine: &StrokeEngine<'_, M, A>) -> Self {
        let mut pattern = String::new();
        let _ = pattern.push_str(engine.get_current_pattern_name());
        let guard = engine.guard();

        Self {
            magic: MOTION_CONFIG_MAGIC,
            version: MOTION_CONFIG_VERSION,
            depth: engine.get_parameter(StrokeParameter::Depth),
            stroke: engine.get_parameter(StrokeParameter::Stroke),
            rate: engine.get_parameter(StrokeParameter::Rate),
            sensation: engine.get_parameter(StrokeParameter::Sensation),
            pattern,
            vibration_amplitude: guard.get_vibration_amplitude(),
            vibration_frequency: guard.get_vibration_frequency(),
            ease_in_speed: engine.get_ease_in_velocity(),
            rate_limit: engine.get_limit(StrokeLimit::Rate),
            velocity_limit: engine.get_limit(StrokeLimit::Velocity),
        }
    }

    /// Return a copy clamped into what `limits` allows
    ///
    /// Invalid data (wrong magic or version) is replaced by the factory
    /// settings before clamping. Non-finite values fall back to their
    /// factory value and unknown pattern names to the factory pattern.
    pub fn sanitize(&self, limits: &ActuatorLimits) -> MotionConfig {
        let factory = MotionConfig::default();
        let source = if self.is_valid() { self } else { &factory };

        let max_position = finite_or(limits.max_position, 0.0).max(0.0);
        let max_speed = finite_or(limits.max_speed, 0.0).max(0.0);

        let depth = constrain(finite_or(source.depth, FACTORY_TRAVEL_MM), 0.0, max_position);
        let stroke = constrain(finite_or(source.stroke, FACTORY_STROKE_MM), 0.0, depth);
        let rate_limit = constrain(
            finite_or(source.rate_limit, FACTORY_MAX_RATE),
            RATE_LOWER_LIMIT,
            RATE_UPPER_LIMIT,
        );
        let rate = constrain(
            finite_or(source.rate, FACTORY_RATE),
            RATE_LOWER_LIMIT,
            rate_limit,
        );
        let velocity_limit = constrain(
            finite_or(source.velocity_limit, FACTORY_MAX_VELOCITY),
            0.0,
            max_speed,
        );
        let ease_in_speed = constrain(
            finite_or(source.ease_in_speed, FACTORY_EASE_IN_VELOCITY),
            0.0,
            velocity_limit,
        );

        let pattern = if PATTERN_NAMES.contains(&source.pattern.as_str()) {
            source.pattern.clone()
        } else {
            warn!("config: unknown pattern, using factory pattern");
            factory_pattern()
        };

        MotionConfig {
            magic: MOTION_CONFIG_MAGIC,
            version: MOTION_CONFIG_VERSION,
            depth,
            stroke,
            rate,
            sensation: constrain(
                finite_or(source.sensation, FACTORY_SENSATION),
                SENSATION_MIN,
                SENSATION_MAX,
            ),
            pattern,
            vibration_amplitude: constrain(
                finite_or(source.vibration_amplitude, FACTORY_VIBRATION_AMPLITUDE_MM),
                0.0,
                stroke,
            ),
            vibration_frequency: constrain(
                finite_or(source.vibration_frequency, FACTORY_VIBRATION_FREQUENCY_HZ),
                0.0,
                MAX_VIBRATION_FREQUENCY_HZ,
            ),
            ease_in_speed,
            rate_limit,
            velocity_limit,
        }
    }

    /// Push the settings through the engine's setters
    ///
    /// Limits go first so the setpoints are clamped against the stored
    /// limits rather than the previous ones.
    ///
    /// # Returns
    /// `false` if the pattern name is not registered; every other setting
    /// is still applied
    pub fn apply<M: RawMutex, A: Actuator>(
        &self,
        engine: &mut StrokeEngine<'_, M, A>,
        now_ms: u64,
    ) -> bool {
        engine.set_limit(StrokeLimit::Rate, self.rate_limit, now_ms);
        engine.set_limit(StrokeLimit::Velocity, self.velocity_limit, now_ms);
        engine.set_parameter(StrokeParameter::Depth, self.depth, now_ms);
        engine.set_parameter(StrokeParameter::Stroke, self.stroke, now_ms);
        engine.set_parameter(StrokeParameter::Rate, self.rate, now_ms);
        engine.set_parameter(StrokeParameter::Sensation, self.sensation, now_ms);
        engine.set_ease_in_velocity(self.ease_in_speed, now_ms);
        engine.set_vibration(self.vibration_amplitude, self.vibration_frequency);

        let selected = engine.set_pattern_by_name(&self.pattern, false);
        debug!(
            "config: applied, depth {=f32} stroke {=f32} rate {=f32}",
            self.depth,
            self.stroke,
            self.rate
        );
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ActuatorLimits {
        ActuatorLimits {
            max_position: 120.0,
            max_speed: 500.0,
            max_acceleration: 10_000.0,
        }
    }

    #[test]
    fn test_default_is_factory() {
        let config = MotionConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.depth, 150.0);
        assert_eq!(config.stroke, 80.0);
        assert_eq!(config.rate, 30.0);
        assert_eq!(config.pattern.as_str(), "PoundingTeasing");
        assert_eq!(config.vibration_frequency, 30.0);
        assert_eq!(config.rate_limit, 240.0);
    }

    #[test]
    fn test_sanitize_clamps_to_actuator() {
        let config = MotionConfig {
            depth: 500.0,
            stroke: 300.0,
            rate: 1000.0,
            sensation: -250.0,
            vibration_amplitude: 400.0,
            vibration_frequency: 80.0,
            ease_in_speed: 900.0,
            velocity_limit: 5000.0,
            ..MotionConfig::default()
        };
        let safe = config.sanitize(&limits());

        assert_eq!(safe.depth, 120.0);
        assert_eq!(safe.stroke, 120.0);
        assert_eq!(safe.rate, 240.0);
        assert_eq!(safe.sensation, -100.0);
        assert_eq!(safe.vibration_amplitude, 120.0);
        assert_eq!(safe.vibration_frequency, MAX_VIBRATION_FREQUENCY_HZ);
        assert_eq!(safe.velocity_limit, 500.0);
        assert_eq!(safe.ease_in_speed, 500.0);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = MotionConfig {
            depth: f32::NAN,
            rate: 0.0,
            ..MotionConfig::default()
        }
        .sanitize(&limits());
        assert_eq!(once.depth, 120.0);
        assert_eq!(once.rate, RATE_LOWER_LIMIT);
        assert_eq!(once.sanitize(&limits()), once);
    }

    #[test]
    fn test_sanitize_replaces_unknown_pattern() {
        let mut config = MotionConfig::default();
        config.pattern.clear();
        let _ = config.pattern.push_str("Bogus");
        assert_eq!(config.sanitize(&limits()).pattern.as_str(), FACTORY_PATTERN);

        config.pattern.clear();
        let _ = config.pattern.push_str("Insist");
        assert_eq!(config.sanitize(&limits()).pattern.as_str(), "Insist");
    }

    #[test]
    fn test_invalid_data_falls_back_to_factory() {
        let config = MotionConfig {
            magic: 0,
            depth: 10.0,
            ..MotionConfig::default()
        };
        assert!(!config.is_valid());
        let safe = config.sanitize(&limits());
        assert!(safe.is_valid());
        assert_eq!(safe.depth, 120.0);
        assert_eq!(safe.stroke, 80.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_stored_blob_is_sanitized() {
        let stored = MotionConfig {
            depth: 1.0e6,
            stroke: -3.0,
            rate: 0.01,
            ..MotionConfig::default()
        };
        let mut buffer = [0u8; 128];
        let bytes = postcard::to_slice(&stored, &mut buffer).unwrap();

        let loaded: MotionConfig = postcard::from_bytes(bytes).unwrap();
        assert_eq!(loaded, stored);

        let safe = loaded.sanitize(&limits());
        assert_eq!(safe.depth, 120.0);
        assert_eq!(safe.stroke, 0.0);
        assert_eq!(safe.rate, RATE_LOWER_LIMIT);
    }
}
