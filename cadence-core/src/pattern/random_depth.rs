//! RandomDepth pattern
//!
//! Like PoundingTeasing, but every in stroke goes to a random depth between
//! 10 % and 100 % of the stroke. The speed stays that of a full stroke and
//! the ramps get steeper for shorter strokes so the move still takes its
//! share of the period.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::math::{trapezoid_acceleration, trapezoid_speed, InOutTiming};
use super::{MotionRequest, Pattern, PatternParams};

/// Seed used when the embedder does not provide one
pub const DEFAULT_SEED: u64 = 0x5EED_CADE;

/// Random depth range in percent of the stroke, inclusive
pub const MIN_DEPTH_PERCENT: u32 = 10;
pub const MAX_DEPTH_PERCENT: u32 = 100;

/// RandomDepth pattern
#[derive(Debug, Clone)]
pub struct RandomDepth {
    params: PatternParams,
    timing: InOutTiming,
    factor: f32,
    rng: SmallRng,
}

impl Default for RandomDepth {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomDepth {
    pub const NAME: &'static str = "RandomDepth";

    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        let params = PatternParams::new();
        Self {
            params,
            timing: InOutTiming::new(params.time_of_stroke, params.sensation),
            factor: 1.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn update_timing(&mut self) {
        self.timing = InOutTiming::new(self.params.time_of_stroke, self.params.sensation);
    }

    /// Depth factor of the current stroke
    pub fn get_factor(&self) -> f32 {
        self.factor
    }
}

impl Pattern for RandomDepth {
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

        if index % 2 == 1 {
            let time = self.timing.time_out;
            let speed = trapezoid_speed(stroke, time);
            MotionRequest::new(0.0, speed, trapezoid_acceleration(speed, time * self.factor))
        } else {
            let percent = self.rng.gen_range(MIN_DEPTH_PERCENT..=MAX_DEPTH_PERCENT);
            self.factor = percent as f32 / 100.0;

            let time = self.timing.time_in;
            let speed = trapezoid_speed(stroke, time);
            MotionRequest::new(
                stroke * self.factor,
                speed,
                trapezoid_acceleration(speed, time * self.factor),
            )
        }
    }
}
