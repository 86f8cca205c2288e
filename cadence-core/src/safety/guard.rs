//! Safety guard for stroke parameters
//!
//! Owns the physical limits of the machine and the current depth, stroke
//! and rate setpoints, and turns raw pattern output into absolute targets
//! that can never leave the legal travel.
//!
//! Out-of-range input is never rejected. Every setter clamps and returns the
//! value that actually took effect, and callers must treat that return value
//! as ground truth. Non-finite input leaves the setpoint unchanged.

use crate::pattern::MotionRequest;
use crate::traits::{ActuatorLimits, ActuatorMotion};

/// Lowest accepted rate in strokes per minute
pub const RATE_LOWER_LIMIT: f32 = 0.5;

/// Highest accepted rate in strokes per minute
pub const RATE_UPPER_LIMIT: f32 = 600.0;

/// Shortest full stroke in seconds, reached at [`RATE_UPPER_LIMIT`]
pub const MIN_TIME_OF_STROKE_S: f32 = 60.0 / RATE_UPPER_LIMIT;

/// Highest accepted vibration frequency in Hz
pub const MAX_VIBRATION_FREQUENCY_HZ: f32 = 50.0;

/// Constrain `value` to `[low, high]`; `high` wins if the range is empty
pub(crate) fn constrain(value: f32, low: f32, high: f32) -> f32 {
    value.max(low).min(high)
}

/// Replace NaN and infinities with `fallback`
pub(crate) fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Move parameters after clamping into the machine's limits
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SafeStrokeParameters {
    /// Absolute target in mm, 0 being the outermost position
    pub absolute_target_position: f32,
    /// Stroke setpoint the target was clamped within, in mm
    pub stroke_length: f32,
    /// Speed in mm/s
    pub speed: f32,
    /// Acceleration in mm/s²
    pub acceleration: f32,
    /// Vibration frequency in Hz
    pub vibration_frequency: f32,
    /// Vibration amplitude in mm
    pub vibration_amplitude: f32,
}

/// Initial setpoints and limits handed to [`SafetyGuard::begin`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuardSetup {
    pub depth: f32,
    pub stroke: f32,
    pub rate: f32,
    pub depth_limit: f32,
    pub stroke_limit: f32,
    pub rate_limit: f32,
    pub velocity_limit: f32,
    pub ease_in_speed: f32,
}

/// Safety guard
#[derive(Debug, Clone)]
pub struct SafetyGuard {
    /// Actuator capabilities captured at begin
    actuator: ActuatorLimits,
    depth: f32,
    stroke: f32,
    rate: f32,
    time_of_stroke: f32,
    depth_limit: f32,
    stroke_limit: f32,
    rate_limit: f32,
    time_of_stroke_limit: f32,
    velocity_limit: f32,
    ease_in_speed: f32,
    vibration_amplitude: f32,
    vibration_frequency: f32,
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyGuard {
    /// Create a guard with no travel
    ///
    /// Every target clamps to 0 until [`begin`](Self::begin) is called.
    pub fn new() -> Self {
        Self {
            actuator: ActuatorLimits {
                max_position: 0.0,
                max_speed: 0.0,
                max_acceleration: 0.0,
            },
            depth: 0.0,
            stroke: 0.0,
            rate: RATE_LOWER_LIMIT,
            time_of_stroke: 60.0 / RATE_LOWER_LIMIT,
            depth_limit: 0.0,
            stroke_limit: 0.0,
            rate_limit: RATE_LOWER_LIMIT,
            time_of_stroke_limit: 60.0 / RATE_LOWER_LIMIT,
            velocity_limit: 0.0,
            ease_in_speed: 0.0,
            vibration_amplitude: 0.0,
            vibration_frequency: 0.0,
        }
    }

    /// Establish limits from the actuator's measured capabilities
    pub fn begin(&mut self, actuator: ActuatorLimits, setup: GuardSetup) {
        self.actuator = ActuatorLimits {
            max_position: finite_or(actuator.max_position, 0.0).max(0.0),
            max_speed: finite_or(actuator.max_speed, 0.0).max(0.0),
            max_acceleration: finite_or(actuator.max_acceleration, 0.0).max(0.0),
        };

        self.rate_limit = constrain(
            finite_or(setup.rate_limit, RATE_LOWER_LIMIT),
            RATE_LOWER_LIMIT,
            RATE_UPPER_LIMIT,
        );
        self.time_of_stroke_limit = 60.0 / self.rate_limit;
        self.depth_limit = constrain(
            finite_or(setup.depth_limit, 0.0),
            0.0,
            self.actuator.max_position,
        );
        self.stroke_limit = constrain(
            finite_or(setup.stroke_limit, 0.0),
            0.0,
            self.actuator.max_position,
        );
        self.velocity_limit = constrain(
            finite_or(setup.velocity_limit, 0.0),
            0.0,
            self.actuator.max_speed,
        );
        self.depth = constrain(finite_or(setup.depth, 0.0), 0.0, self.depth_limit);
        self.stroke = constrain(finite_or(setup.stroke, 0.0), 0.0, self.max_stroke());
        self.rate = constrain(
            finite_or(setup.rate, RATE_LOWER_LIMIT),
            RATE_LOWER_LIMIT,
            self.rate_limit,
        );
        self.time_of_stroke = 60.0 / self.rate;
        self.ease_in_speed = constrain(
            finite_or(setup.ease_in_speed, 0.0),
            0.0,
            self.velocity_limit,
        );
        self.vibration_amplitude = constrain(self.vibration_amplitude, 0.0, self.stroke);

        debug!(
            "guard: depth {=f32}/{=f32} stroke {=f32}/{=f32} tos {=f32} s",
            self.depth,
            self.depth_limit,
            self.stroke,
            self.stroke_limit,
            self.time_of_stroke
        );
    }

    /// Stroke may extend neither past its limit nor past the depth
    fn max_stroke(&self) -> f32 {
        self.stroke_limit.min(self.depth)
    }

    /// Pull the stroke, and the vibration amplitude with it, back inside the
    /// current limits
    fn reclamp_stroke(&mut self) {
        self.stroke = constrain(self.stroke, 0.0, self.max_stroke());
        self.vibration_amplitude = constrain(self.vibration_amplitude, 0.0, self.stroke);
    }

    /// Set the depth setpoint; the stroke follows if it no longer fits
    pub fn set_depth(&mut self, depth: f32) -> f32 {
        if depth.is_finite() {
            self.depth = constrain(depth, 0.0, self.depth_limit);
            self.reclamp_stroke();
            debug!("guard: depth = {=f32}", self.depth);
        }
        self.depth
    }

    pub fn get_depth(&self) -> f32 {
        self.depth
    }

    /// Set the stroke setpoint, never longer than the depth
    pub fn set_stroke(&mut self, stroke: f32) -> f32 {
        if stroke.is_finite() {
            self.stroke = constrain(stroke, 0.0, self.max_stroke());
            self.vibration_amplitude = constrain(self.vibration_amplitude, 0.0, self.stroke);
            debug!("guard: stroke = {=f32}", self.stroke);
        }
        self.stroke
    }

    pub fn get_stroke(&self) -> f32 {
        self.stroke
    }

    /// Set the rate in strokes per minute
    ///
    /// The lower bound keeps the time of stroke finite.
    pub fn set_rate(&mut self, rate: f32) -> f32 {
        if rate.is_finite() {
            self.rate = constrain(rate, RATE_LOWER_LIMIT, self.rate_limit);
            self.time_of_stroke = 60.0 / self.rate;
            debug!(
                "guard: rate = {=f32} -> tos {=f32} s",
                self.rate,
                self.time_of_stroke
            );
        }
        self.rate
    }

    pub fn get_rate(&self) -> f32 {
        self.rate
    }

    /// Duration of one full in-and-out stroke in seconds
    pub fn get_time_of_stroke(&self) -> f32 {
        self.time_of_stroke
    }

    pub fn set_depth_limit(&mut self, depth_limit: f32) -> f32 {
        if depth_limit.is_finite() {
            self.depth_limit = constrain(depth_limit, 0.0, self.actuator.max_position);
            self.depth = constrain(self.depth, 0.0, self.depth_limit);
            self.reclamp_stroke();
            debug!("guard: depth limit = {=f32}", self.depth_limit);
        }
        self.depth_limit
    }

    pub fn get_depth_limit(&self) -> f32 {
        self.depth_limit
    }

    pub fn set_stroke_limit(&mut self, stroke_limit: f32) -> f32 {
        if stroke_limit.is_finite() {
            self.stroke_limit = constrain(stroke_limit, 0.0, self.actuator.max_position);
            self.reclamp_stroke();
            debug!("guard: stroke limit = {=f32}", self.stroke_limit);
        }
        self.stroke_limit
    }

    pub fn get_stroke_limit(&self) -> f32 {
        self.stroke_limit
    }

    pub fn set_rate_limit(&mut self, rate_limit: f32) -> f32 {
        if rate_limit.is_finite() {
            self.rate_limit = constrain(rate_limit, RATE_LOWER_LIMIT, RATE_UPPER_LIMIT);
            self.time_of_stroke_limit = 60.0 / self.rate_limit;
            self.rate = constrain(self.rate, RATE_LOWER_LIMIT, self.rate_limit);
            self.time_of_stroke = 60.0 / self.rate;
            debug!("guard: rate limit = {=f32}", self.rate_limit);
        }
        self.rate_limit
    }

    pub fn get_rate_limit(&self) -> f32 {
        self.rate_limit
    }

    /// Shortest allowed full stroke in seconds
    pub fn get_time_of_stroke_limit(&self) -> f32 {
        self.time_of_stroke_limit
    }

    pub fn set_velocity_limit(&mut self, velocity_limit: f32) -> f32 {
        if velocity_limit.is_finite() {
            self.velocity_limit = constrain(velocity_limit, 0.0, self.actuator.max_speed);
            self.ease_in_speed = constrain(self.ease_in_speed, 0.0, self.velocity_limit);
            debug!("guard: velocity limit = {=f32}", self.velocity_limit);
        }
        self.velocity_limit
    }

    pub fn get_velocity_limit(&self) -> f32 {
        self.velocity_limit
    }

    pub fn set_ease_in_speed(&mut self, ease_in_speed: f32) -> f32 {
        if ease_in_speed.is_finite() {
            self.ease_in_speed = constrain(ease_in_speed, 0.0, self.velocity_limit);
            debug!("guard: ease-in speed = {=f32}", self.ease_in_speed);
        }
        self.ease_in_speed
    }

    pub fn get_ease_in_speed(&self) -> f32 {
        self.ease_in_speed
    }

    /// Set the vibration amplitude; it may not exceed the stroke
    pub fn set_vibration_amplitude(&mut self, amplitude: f32) -> f32 {
        if amplitude.is_finite() {
            self.vibration_amplitude = constrain(amplitude, 0.0, self.stroke);
        }
        self.vibration_amplitude
    }

    pub fn get_vibration_amplitude(&self) -> f32 {
        self.vibration_amplitude
    }

    pub fn set_vibration_frequency(&mut self, frequency: f32) -> f32 {
        if frequency.is_finite() {
            self.vibration_frequency = constrain(frequency, 0.0, MAX_VIBRATION_FREQUENCY_HZ);
        }
        self.vibration_frequency
    }

    pub fn get_vibration_frequency(&self) -> f32 {
        self.vibration_frequency
    }

    /// Get the actuator capabilities the guard clamps against
    pub fn get_actuator_limits(&self) -> ActuatorLimits {
        self.actuator
    }

    /// Convert a raw pattern move into absolute, limit-respecting parameters
    ///
    /// # Arguments
    /// - `stroke`: distance from the outer end of the current stroke towards
    ///   the depth, in mm
    /// - `speed`: requested speed in mm/s
    /// - `acceleration`: requested acceleration in mm/s²
    /// - `motion`: the actuator's ongoing motion
    pub fn make_safe(
        &self,
        stroke: f32,
        speed: f32,
        acceleration: f32,
        motion: ActuatorMotion,
    ) -> SafeStrokeParameters {
        let relative = constrain(finite_or(stroke, 0.0), 0.0, self.stroke);
        let absolute_target_position =
            constrain((self.depth - self.stroke) + relative, 0.0, self.depth);
        let speed = constrain(finite_or(speed, 0.0), 0.0, self.velocity_limit);
        let acceleration = finite_or(acceleration, 0.0);

        // Never decelerate softer than the move already in progress
        let acceleration = if !motion.completed && motion.acceleration > acceleration {
            warn!(
                "crash avoidance: acceleration {=f32} -> {=f32}",
                acceleration,
                motion.acceleration
            );
            motion.acceleration
        } else {
            constrain(acceleration, 0.0, self.actuator.max_acceleration)
        };

        SafeStrokeParameters {
            absolute_target_position,
            stroke_length: self.stroke,
            speed,
            acceleration,
            vibration_frequency: self.vibration_frequency,
            vibration_amplitude: self.vibration_amplitude,
        }
    }

    /// [`make_safe`](Self::make_safe) for a full pattern request
    pub fn make_safe_request(
        &self,
        request: &MotionRequest,
        motion: ActuatorMotion,
    ) -> SafeStrokeParameters {
        self.make_safe(request.stroke, request.speed, request.acceleration, motion)
    }

    /// [`make_safe`](Self::make_safe) with the target given as a fraction
    /// of the current stroke (0.0 = outer end, 1.0 = depth)
    pub fn make_safe_relative(
        &self,
        fraction: f32,
        speed: f32,
        acceleration: f32,
        motion: ActuatorMotion,
    ) -> SafeStrokeParameters {
        let stroke = constrain(finite_or(fraction, 0.0), 0.0, 1.0) * self.stroke;
        self.make_safe(stroke, speed, acceleration, motion)
    }
}
