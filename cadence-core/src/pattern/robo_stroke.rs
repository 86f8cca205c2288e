//! RoboStroke pattern
//!
//! Sensation shapes the trapezoid instead of the timing. At zero every ramp
//! takes a third of the half stroke. Positive values stretch the ramps into
//! a triangle, negative values shorten them until the motion feels robotic.

use super::math::fscale;
use super::{MotionRequest, Pattern, PatternParams};

/// RoboStroke pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoboStroke {
    params: PatternParams,
    /// Fraction of the half stroke spent accelerating
    ramp_fraction: f32,
}

impl Default for RoboStroke {
    fn default() -> Self {
        Self::new()
    }
}

impl RoboStroke {
    pub const NAME: &'static str = "RoboStroke";

    pub const fn new() -> Self {
        Self {
            params: PatternParams::new(),
            ramp_fraction: 1.0 / 3.0,
        }
    }

    /// Fraction of the half stroke spent in each ramp
    pub fn get_ramp_fraction(&self) -> f32 {
        self.ramp_fraction
    }
}

impl Pattern for RoboStroke {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn params(&self) -> PatternParams {
        self.params
    }

    fn set_stroke(&mut self, stroke: f32) {
        self.params.set_stroke(stroke);
    }

    fn set_time_of_stroke(&mut self, time_of_stroke: f32) {
        self.params.set_time_of_stroke(time_of_stroke);
    }

    fn set_sensation(&mut self, sensation: f32) {
        if self.params.set_sensation(sensation) {
            let s = self.params.sensation;
            self.ramp_fraction = if s >= 0.0 {
                fscale(0.0, 100.0, 1.0 / 3.0, 0.5, s, 0.0)
            } else {
                fscale(0.0, 100.0, 1.0 / 3.0, 0.05, -s, 0.0)
            };
        }
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionRequest {
        let stroke = self.params.stroke;
        let half = 0.5 * self.params.time_of_stroke;
        let x = self.ramp_fraction;

        let speed = stroke / ((1.0 - x) * half);
        let acceleration = speed / (x * half);
        let target = if index % 2 == 1 { 0.0 } else { stroke };

        MotionRequest::new(target, speed, acceleration)
    }
}
