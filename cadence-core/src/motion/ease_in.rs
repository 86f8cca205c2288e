//! Ease-in modifier
//!
//! When the depth or stroke setpoint changes while a pattern runs, the safety
//! guard adopts the new value at once. This modifier bounds how fast the
//! *effective* depth and stroke may drift towards the new values, and rewrites
//! each move so that it ends inside the window that will be legal at the
//! moment the move completes.

use embassy_sync::blocking_mutex::raw::RawMutex;
use libm::{ceilf, fabsf};

use super::profile::{ProfileError, SharedProfile};
use crate::safety::guard::{constrain, SafeStrokeParameters, SafetyGuard};

/// Lower bound of the speed and acceleration correction factor
pub const MIN_CORRECTION: f32 = 0.05;

/// Stroke lengths below this are treated as zero
const MIN_STROKE_LENGTH: f32 = 1.0e-3;

/// Linear ramp of one setpoint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EaseInRamp {
    /// Value the ramp started from
    pub previous: f32,
    /// Value the ramp is heading to
    pub target: f32,
    /// Absolute ramp start in ms
    pub change_ms: u64,
    /// Absolute ramp end in ms
    pub eta_ms: u64,
    /// Ramp speed in mm/s
    pub speed: f32,
}

impl EaseInRamp {
    /// A ramp that has already arrived at `value`
    pub const fn settled(value: f32) -> Self {
        Self {
            previous: value,
            target: value,
            change_ms: 0,
            eta_ms: 0,
            speed: 0.0,
        }
    }

    /// Value of the ramp at an absolute time
    pub fn value_at(&self, t_ms: u64) -> f32 {
        if t_ms < self.change_ms {
            self.previous
        } else if t_ms < self.eta_ms {
            let elapsed = (t_ms - self.change_ms) as f32 * 1.0e-3;
            let step = self.speed * elapsed;
            if self.target >= self.previous {
                (self.previous + step).min(self.target)
            } else {
                (self.previous - step).max(self.target)
            }
        } else {
            self.target
        }
    }

    /// Restart the ramp towards `target` from wherever it is at `now_ms`
    pub fn retarget(&mut self, target: f32, speed: f32, now_ms: u64) {
        let previous = self.value_at(now_ms);
        let duration_ms = if speed > 0.0 {
            ceilf(fabsf(target - previous) / speed * 1000.0) as u64
        } else {
            0
        };
        *self = Self {
            previous,
            target,
            change_ms: now_ms,
            eta_ms: now_ms + duration_ms,
            speed,
        };
    }

    /// Check if the ramp is still moving at `now_ms`
    pub fn is_ramping(&self, now_ms: u64) -> bool {
        now_ms < self.eta_ms
    }
}

/// Ease-in modifier
#[derive(Debug, Clone)]
pub struct EaseInModifier {
    depth: EaseInRamp,
    stroke: EaseInRamp,
    ease_in_speed: f32,
    velocity_limit: f32,
}

impl Default for EaseInModifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EaseInModifier {
    pub fn new() -> Self {
        Self {
            depth: EaseInRamp::settled(0.0),
            stroke: EaseInRamp::settled(0.0),
            ease_in_speed: 0.0,
            velocity_limit: 0.0,
        }
    }

    /// Seed both ramps from the guard's current setpoints
    pub fn begin(&mut self, guard: &SafetyGuard) {
        self.ease_in_speed = guard.get_ease_in_speed();
        self.velocity_limit = guard.get_velocity_limit();
        self.depth = EaseInRamp::settled(guard.get_depth());
        self.stroke = EaseInRamp::settled(guard.get_stroke());
    }

    /// Start easing the depth towards a new (already clamped) setpoint
    pub fn set_depth(&mut self, depth: f32, now_ms: u64) {
        if depth.is_finite() {
            self.depth.retarget(depth, self.ease_in_speed, now_ms);
            debug!("ease-in: depth -> {=f32} until {=u64}", depth, self.depth.eta_ms);
        }
    }

    /// Start easing the stroke towards a new (already clamped) setpoint
    pub fn set_stroke(&mut self, stroke: f32, now_ms: u64) {
        if stroke.is_finite() {
            self.stroke.retarget(stroke, self.ease_in_speed, now_ms);
            debug!("ease-in: stroke -> {=f32} until {=u64}", stroke, self.stroke.eta_ms);
        }
    }

    /// Change the ramp speed; ramps in flight continue from their current value
    pub fn set_ease_in_speed(&mut self, speed: f32, now_ms: u64) {
        if speed.is_finite() {
            self.ease_in_speed = speed.max(0.0);
            let depth = self.depth.target;
            let stroke = self.stroke.target;
            self.depth.retarget(depth, self.ease_in_speed, now_ms);
            self.stroke.retarget(stroke, self.ease_in_speed, now_ms);
        }
    }

    pub fn get_ease_in_speed(&self) -> f32 {
        self.ease_in_speed
    }

    /// Cap for speeds scaled up by a correction
    pub fn set_velocity_limit(&mut self, velocity_limit: f32) {
        if velocity_limit.is_finite() {
            self.velocity_limit = velocity_limit.max(0.0);
        }
    }

    /// Effective depth at an absolute time
    pub fn future_depth(&self, t_ms: u64) -> f32 {
        self.depth.value_at(t_ms)
    }

    /// Effective stroke at an absolute time
    pub fn future_stroke(&self, t_ms: u64) -> f32 {
        self.stroke.value_at(t_ms)
    }

    pub fn depth_ramp(&self) -> EaseInRamp {
        self.depth
    }

    pub fn stroke_ramp(&self) -> EaseInRamp {
        self.stroke
    }

    /// Generate the profile for `parameters`, rewriting it if a ramp is
    /// still running when the move would complete
    ///
    /// The target is clamped into the window that is legal at the move's
    /// completion time, and speed and acceleration are scaled by the change
    /// in stroke length so the profile keeps its shape. This is a single
    /// pass: the corrected move has a different completion time, which is
    /// not fed back into the window.
    ///
    /// # Returns
    /// `Ok(true)` if the parameters were rewritten and the profile regenerated
    pub fn apply_modification<M: RawMutex>(
        &self,
        parameters: &mut SafeStrokeParameters,
        profile: &SharedProfile<M>,
        now_ms: u64,
    ) -> Result<bool, ProfileError> {
        profile.generate(
            parameters.absolute_target_position,
            parameters.speed,
            parameters.acceleration,
            now_ms,
        )?;

        let eta_ms = profile.absolute_eta_ms();
        if !self.depth.is_ramping(eta_ms) && !self.stroke.is_ramping(eta_ms) {
            return Ok(false);
        }

        let depth = self.future_depth(eta_ms);
        let stroke = self.future_stroke(eta_ms);
        let original_target = parameters.absolute_target_position;
        let original_length = parameters.stroke_length;

        let target = constrain(original_target, (depth - stroke).max(0.0), depth.max(0.0));
        let length = (original_length + (target - original_target)).max(0.0);
        let correction = if original_length > MIN_STROKE_LENGTH {
            (length / original_length).max(MIN_CORRECTION)
        } else {
            1.0
        };

        parameters.absolute_target_position = target;
        parameters.stroke_length = length;
        parameters.speed = (parameters.speed * correction).min(self.velocity_limit);
        parameters.acceleration *= correction;

        trace!(
            "ease-in: target {=f32} -> {=f32}, correction {=f32}",
            original_target,
            target,
            correction
        );

        profile.generate(
            parameters.absolute_target_position,
            parameters.speed,
            parameters.acceleration,
            now_ms,
        )?;
        Ok(true)
    }
}
