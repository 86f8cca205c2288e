//! Deeper pattern
//!
//! Each in stroke goes a little deeper than the one before until the full
//! stroke is reached, then the ramp starts over. Sensation sets the number
//! of strokes in a ramp: 2 at -100, 11 at 0, 32 at 100. Every move keeps the
//! half period, so deeper strokes are faster.

use super::math::{map_range, trapezoid_acceleration, trapezoid_speed};
use super::{MotionRequest, Pattern, PatternParams};

/// Strokes per ramp before any sensation is set
const DEFAULT_RAMP_STROKES: u32 = 2;

/// Deeper pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deeper {
    params: PatternParams,
    ramp_strokes: u32,
}

impl Default for Deeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Deeper {
    pub const NAME: &'static str = "Deeper";

    pub const fn new() -> Self {
        Self {
            params: PatternParams::new(),
            ramp_strokes: DEFAULT_RAMP_STROKES,
        }
    }

    /// Number of in strokes in one ramp
    pub fn get_ramp_strokes(&self) -> u32 {
        self.ramp_strokes
    }
}

impl Pattern for Deeper {
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
            let count = if s < 0.0 {
                map_range(s, -100, 0, 2, 11)
            } else {
                map_range(s, 0, 100, 11, 32)
            };
            self.ramp_strokes = count.max(1) as u32;
        }
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionRequest {
        let half = 0.5 * self.params.time_of_stroke;
        let slope = self.params.stroke / self.ramp_strokes as f32;
        let cycle = (index / 2) % self.ramp_strokes + 1;
        let amplitude = slope * cycle as f32;

        let speed = trapezoid_speed(amplitude, half);
        let acceleration = trapezoid_acceleration(speed, half);
        let target = if index % 2 == 1 { 0.0 } else { amplitude };

        MotionRequest::new(target, speed, acceleration)
    }
}
