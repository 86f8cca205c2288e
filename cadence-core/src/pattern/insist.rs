//! Insist pattern
//!
//! Short strokes that keep the speed of a full one. The further the
//! sensation is from zero, the shorter the strokes. Positive sensation
//! places them at the deep end of the stroke, negative sensation at the
//! outer end.

use libm::fabsf;

use super::math::{trapezoid_acceleration, trapezoid_speed};
use super::{MotionRequest, Pattern, PatternParams};

/// Shortest stroke fraction
const MIN_STROKE_FRACTION: f32 = 0.01;

/// Insist pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insist {
    params: PatternParams,
    speed: f32,
    acceleration: f32,
    /// Length of the shortened stroke in mm
    real_stroke: f32,
    stroke_fraction: f32,
    in_front: bool,
}

impl Default for Insist {
    fn default() -> Self {
        Self::new()
    }
}

impl Insist {
    pub const NAME: &'static str = "Insist";

    pub fn new() -> Self {
        let mut pattern = Self {
            params: PatternParams::new(),
            speed: 0.0,
            acceleration: 0.0,
            real_stroke: 0.0,
            stroke_fraction: 1.0,
            in_front: false,
        };
        pattern.update_timing();
        pattern
    }

    fn update_timing(&mut self) {
        let half = 0.5 * self.params.time_of_stroke;
        self.speed = trapezoid_speed(self.params.stroke, half);
        self.acceleration = trapezoid_acceleration(self.speed, half * self.stroke_fraction);
        self.real_stroke = self.params.stroke * self.stroke_fraction;
    }

    /// Fraction of the stroke actually travelled
    pub fn get_stroke_fraction(&self) -> f32 {
        self.stroke_fraction
    }
}

impl Pattern for Insist {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn params(&self) -> PatternParams {
        self.params
    }

    fn set_stroke(&mut self, stroke: f32) {
        if self.params.set_stroke(stroke) {
            self.update_timing();
        }
    }

    fn set_time_of_stroke(&mut self, time_of_stroke: f32) {
        if self.params.set_time_of_stroke(time_of_stroke) {
            self.update_timing();
        }
    }

    fn set_sensation(&mut self, sensation: f32) {
        if self.params.set_sensation(sensation) {
            let s = self.params.sensation;
            self.stroke_fraction = ((100.0 - fabsf(s)) / 100.0).max(MIN_STROKE_FRACTION);
            self.in_front = s > 0.0;
            self.update_timing();
        }
    }

    fn next_target(&mut self, index: u32, _now_ms: u64) -> MotionRequest {
        let stroke = self.params.stroke;
        let target = match (self.in_front, index % 2 == 1) {
            (true, true) => stroke - self.real_stroke,
            (true, false) => stroke,
            (false, true) => 0.0,
            (false, false) => self.real_stroke,
        };
        MotionRequest::new(target, self.speed, self.acceleration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::testing::{assert_parity, configure};

    #[test]
    fn test_neutral_is_full_stroke() {
        let mut pattern = Insist::new();
        configure(&mut pattern, 100.0, 2.0, 0.0);

        let inward = pattern.next_target(0, 0);
        assert_eq!(inward.stroke, 100.0);
        assert_eq!(inward.speed, 150.0);
        assert_eq!(inward.acceleration, 450.0);
        assert_eq!(pattern.next_target(1, 0).stroke, 0.0);
    }

    #[test]
    fn test_front_strokes() {
        let mut pattern = Insist::new();
        configure(&mut pattern, 100.0, 2.0, 75.0);

        assert_eq!(pattern.next_target(0, 0).stroke, 100.0);
        let outward = pattern.next_target(1, 0);
        assert_eq!(outward.stroke, 75.0);
        // Same speed as a full stroke, four times the acceleration
        assert_eq!(outward.speed, 150.0);
        assert_eq!(outward.acceleration, 1800.0);
    }

    #[test]
    fn test_back_strokes() {
        let mut pattern = Insist::new();
        configure(&mut pattern, 100.0, 2.0, -75.0);

        assert_eq!(pattern.next_target(0, 0).stroke, 25.0);
        assert_eq!(pattern.next_target(1, 0).stroke, 0.0);
    }

    #[test]
    fn test_extreme_sensation_stays_finite() {
        let mut pattern = Insist::new();
        configure(&mut pattern, 100.0, 2.0, 100.0);
        assert_eq!(pattern.get_stroke_fraction(), MIN_STROKE_FRACTION);
        let request = pattern.next_target(0, 0);
        assert!(request.acceleration.is_finite());
    }

    #[test]
    fn test_stroke_change_recomputes() {
        let mut pattern = Insist::new();
        configure(&mut pattern, 100.0, 2.0, -50.0);
        pattern.set_stroke(40.0);
        assert_eq!(pattern.next_target(0, 0).stroke, 20.0);
        assert_eq!(pattern.next_target(0, 0).speed, 60.0);
    }

    #[test]
    fn test_parity() {
        // Back strokes return to 0; front strokes rest at the short stroke's start
        for sensation in [-100.0, -40.0, 0.0] {
            let mut pattern = Insist::new();
            configure(&mut pattern, 100.0, 1.0, sensation);
            assert_parity(&mut pattern, 20);
        }
    }
}
