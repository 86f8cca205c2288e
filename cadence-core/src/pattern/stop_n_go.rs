//! Stop'n'Go pattern
//!
//! Series of full strokes separated by pauses. The series length counts up
//! from one stroke to five and back down again. Sensation sets the pause
//! between 100 ms at -100 and 10 s at 100.
//!
//! While a pause runs, every request is a skip carrying the resume time.

use super::math::{map_range, trapezoid_acceleration, trapezoid_speed};
use super::{Deadline, MotionRequest, Pattern, PatternParams};

/// Longest series of strokes
pub const MAX_SERIES_STROKES: u32 = 5;

/// Stop'n'Go pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopNGo {
    params: PatternParams,
    pause_ms: u32,
    /// Strokes in the current series
    series_strokes: u32,
    /// In strokes completed in the current series
    stroke_count: u32,
    counting_up: bool,
    /// Start of the running pause
    pause_started_ms: Option<u64>,
}

impl Default for StopNGo {
    fn default() -> Self {
        Self::new()
    }
}

impl StopNGo {
    pub const NAME: &'static str = "Stop'n'Go";

    pub fn new() -> Self {
        let params = PatternParams::new();
        Self {
            params,
            pause_ms: Self::pause_for(params.sensation),
            series_strokes: 1,
            stroke_count: 0,
            counting_up: true,
            pause_started_ms: None,
        }
    }

    fn pause_for(sensation: f32) -> u32 {
        map_range(sensation, -100, 100, 100, 10_000).max(0) as u32
    }

    /// Pause between two series in ms
    pub fn get_pause_ms(&self) -> u32 {
        self.pause_ms
    }

    /// Strokes in the current series
    pub fn get_series_strokes(&self) -> u32 {
        self.series_strokes
    }

    /// End of the running pause, if any
    ///
    /// The pause length is read at every call, so a sensation change also
    /// stretches or shortens a pause already running.
    pub fn deadline(&self) -> Option<Deadline> {
        self.pause_started_ms
            .map(|start| Deadline::new(start + u64::from(self.pause_ms)))
    }
}

impl Pattern for StopNGo {
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
            self.pause_ms = Self::pause_for(self.params.sensation);
        }
    }

    fn next_target(&mut self, index: u32, now_ms: u64) -> MotionRequest {
        if let Some(deadline) = self.deadline() {
            if deadline.is_pending(now_ms) {
                return MotionRequest::pause(deadline.resume_at_ms);
            }
        }

        let half = 0.5 * self.params.time_of_stroke;
        let speed = trapezoid_speed(self.params.stroke, half);
        let acceleration = trapezoid_acceleration(speed, half);

        if index % 2 == 1 {
            if self.stroke_count >= self.series_strokes {
                self.stroke_count = 0;

                if self.series_strokes >= MAX_SERIES_STROKES {
                    self.counting_up = false;
                }
                if self.series_strokes <= 1 {
                    self.counting_up = true;
                }
                if self.counting_up {
                    self.series_strokes += 1;
                } else {
                    self.series_strokes -= 1;
                }

                self.pause_started_ms = Some(now_ms);
                debug!(
                    "{}: pause {} ms, next series {}",
                    Self::NAME,
                    self.pause_ms,
                    self.series_strokes
                );
            }
            MotionRequest::new(0.0, speed, acceleration)
        } else {
            self.stroke_count += 1;
            MotionRequest::new(self.params.stroke, speed, acceleration)
        }
    }
}
