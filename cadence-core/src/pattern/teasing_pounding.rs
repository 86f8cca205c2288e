//! PoundingTeasing pattern
//!
//! Full strokes where the sensation biases the speed of the in and out
//! moves. Positive sensation makes the in move up to three times faster than
//! the neutral half period, negative sensation does the same for the out move.

use super::math::{trapezoid_acceleration, trapezoid_speed, InOutTiming};
use super::{MotionRequest, Pattern, PatternParams};

/// PoundingTeasing pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeasingPounding {
    params: PatternParams,
    timing: InOutTiming,
}

impl Default for TeasingPounding {
    fn default() -> Self {
        Self::new()
    }
}

impl TeasingPounding {
    pub const NAME: &'static str = "PoundingTeasing";

    pub fn new() -> Self {
        let params = PatternParams::new();
        Self {
            params,
            timing: InOutTiming::new(params.time_of_stroke, params.sensation),
        }
    }

    fn update_timing(&mut self) {
        self.timing = InOutTiming::new(self.params.time_of_stroke, self.params.sensation);
    }
}

impl Pattern for TeasingPounding {
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
        let stroke = self.params.stroke;
        let request = if index % 2 == 1 {
            let speed = trapezoid_speed(stroke, self.timing.time_out);
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
        };
        trace!(
            "{}: #{} {=f32} mm @ {=f32} mm/s",
            Self::NAME,
            index,
            request.stroke,
            request.speed
        );
        request
    }
}
