//! Half'n'Half pattern
//!
//! Like PoundingTeasing, but every other stroke only goes half as deep. The
//! pattern starts with a half stroke. Half strokes keep the full stroke's
//! timing, so they move at half the speed.

use super::math::{trapezoid_acceleration, trapezoid_speed, InOutTiming};
use super::{MotionRequest, Pattern, PatternParams};

/// Half'n'Half pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfNHalf {
    params: PatternParams,
    timing: InOutTiming,
    half: bool,
}

impl Default for HalfNHalf {
    fn default() -> Self {
        Self::new()
    }
}

impl HalfNHalf {
    pub const NAME: &'static str = "Half'n'Half";

    pub fn new() -> Self {
        let params = PatternParams::new();
        Self {
            params,
            timing: InOutTiming::new(params.time_of_stroke, params.sensation),
            half: true,
        }
    }

    fn update_timing(&mut self) {
        self.timing = InOutTiming::new(self.params.time_of_stroke, self.params.sensation);
    }
}

impl Pattern for HalfNHalf {
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
        if self.params.set_time_of_stroke(time_of_stroke) {
            self.update_timing();
        }
    }

    fn set_sensation(&mut self, sensation: f32) {
        if self.params.set_sensation(sensation) {
            self.update_timing();
        }
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionRequest {
        if index == 0 {
            self.half = true;
        }

        let stroke = if self.half {
            0.5 * self.params.stroke
        } else {
            self.params.stroke
        };

        if index % 2 == 1 {
            let speed = trapezoid_speed(stroke, self.timing.time_out);
            self.half = !self.half;
            MotionRequest::new(
                0.0,
                speed,
                trapezoid_acceleration(speed, self.timing.time_out),
            )
        } else {
            let speed = trapezoid_speed(stroke, self.timing.time_in);
            MotionRequest::new(
                stroke,
                speed,
                trapezoid_acceleration(speed, self.timing.time_in),
            )
        }
    }
}
