//! Stroke patterns
//!
//! A pattern turns the stroke, the time of stroke and the sensation into a
//! sequence of raw moves. Even stroke indices move in towards the depth, odd
//! indices move back out. Patterns know nothing about the machine: the
//! safety guard maps their output into absolute coordinates.
//!
//! # Pattern Types
//! - **PoundingTeasing**: sensation biases the in/out speed ratio
//! - **RoboStroke**: sensation shapes the acceleration ramps
//! - **Half'n'Half**: alternates half and full depth
//! - **Deeper**: ramps the depth up over a number of strokes
//! - **Stop'n'Go**: series of strokes separated by pauses
//! - **Insist**: short strokes at the front or the back
//! - **RandomDepth**: random depth on every stroke

pub mod deeper;
pub mod half_n_half;
pub mod insist;
pub mod math;
pub mod random_depth;
pub mod registry;
pub mod robo_stroke;
pub mod stop_n_go;
pub mod teasing_pounding;

pub use deeper::Deeper;
pub use half_n_half::HalfNHalf;
pub use insist::Insist;
pub use random_depth::RandomDepth;
pub use registry::PatternRegistry;
pub use robo_stroke::RoboStroke;
pub use stop_n_go::StopNGo;
pub use teasing_pounding::TeasingPounding;

use crate::safety::guard::MIN_TIME_OF_STROKE_S;

/// Sensation bounds
pub const SENSATION_MIN: f32 = -100.0;
pub const SENSATION_MAX: f32 = 100.0;

/// One raw move produced by a pattern
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionRequest {
    /// Distance from the outer end of the stroke in mm
    pub stroke: f32,
    /// Speed in mm/s
    pub speed: f32,
    /// Acceleration in mm/s²
    pub acceleration: f32,
    /// No move this cycle; ask again next cycle
    pub skip: bool,
    /// End of the pause the pattern is waiting out
    pub resume_at_ms: Option<u64>,
}

impl MotionRequest {
    pub const fn new(stroke: f32, speed: f32, acceleration: f32) -> Self {
        Self {
            stroke,
            speed,
            acceleration,
            skip: false,
            resume_at_ms: None,
        }
    }

    /// A request to wait until `resume_at_ms`
    pub const fn pause(resume_at_ms: u64) -> Self {
        Self {
            stroke: 0.0,
            speed: 0.0,
            acceleration: 0.0,
            skip: true,
            resume_at_ms: Some(resume_at_ms),
        }
    }
}

/// A point in time a pattern waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    pub resume_at_ms: u64,
}

impl Deadline {
    pub const fn new(resume_at_ms: u64) -> Self {
        Self { resume_at_ms }
    }

    /// Check if the deadline has not passed yet
    ///
    /// The deadline instant itself still counts as pending.
    pub fn is_pending(&self, now_ms: u64) -> bool {
        now_ms <= self.resume_at_ms
    }
}

/// Parameters common to every pattern
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternParams {
    /// Stroke in mm
    pub stroke: f32,
    /// Duration of a full in and out stroke in s
    pub time_of_stroke: f32,
    /// Shape parameter in `[-100, 100]`
    pub sensation: f32,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternParams {
    pub const fn new() -> Self {
        Self {
            stroke: 0.0,
            time_of_stroke: 1.0,
            sensation: 0.0,
        }
    }

    /// Returns false if the value was rejected
    pub fn set_stroke(&mut self, stroke: f32) -> bool {
        if !stroke.is_finite() {
            return false;
        }
        self.stroke = stroke.max(0.0);
        true
    }

    /// Returns false if the value was rejected
    pub fn set_time_of_stroke(&mut self, time_of_stroke: f32) -> bool {
        if !time_of_stroke.is_finite() {
            return false;
        }
        self.time_of_stroke = time_of_stroke.max(MIN_TIME_OF_STROKE_S);
        true
    }

    /// Returns false if the value was rejected
    pub fn set_sensation(&mut self, sensation: f32) -> bool {
        if !sensation.is_finite() {
            return false;
        }
        self.sensation = sensation.max(SENSATION_MIN).min(SENSATION_MAX);
        true
    }
}

/// Trait for stroke patterns
pub trait Pattern {
    /// Display name, unique within a registry
    fn name(&self) -> &'static str;

    /// Current parameters
    fn params(&self) -> PatternParams;

    /// Set the stroke in mm
    fn set_stroke(&mut self, stroke: f32);

    /// Set the duration of a full stroke in s
    fn set_time_of_stroke(&mut self, time_of_stroke: f32);

    /// Set the sensation; clamped to `[-100, 100]`
    fn set_sensation(&mut self, sensation: f32);

    /// Compute the move for stroke `index`
    ///
    /// Even indices move in, odd indices move out.
    fn next_target(&mut self, index: u32, now_ms: u64) -> MotionRequest;
}

/// Any of the built-in patterns
#[derive(Debug, Clone)]
pub enum AnyPattern {
    TeasingPounding(TeasingPounding),
    RoboStroke(RoboStroke),
    HalfNHalf(HalfNHalf),
    Deeper(Deeper),
    StopNGo(StopNGo),
    Insist(Insist),
    RandomDepth(RandomDepth),
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $body:expr) => {
        match $self {
            AnyPattern::TeasingPounding($p) => $body,
            AnyPattern::RoboStroke($p) => $body,
            AnyPattern::HalfNHalf($p) => $body,
            AnyPattern::Deeper($p) => $body,
            AnyPattern::StopNGo($p) => $body,
            AnyPattern::Insist($p) => $body,
            AnyPattern::RandomDepth($p) => $body,
        }
    };
}

impl Pattern for AnyPattern {
    fn name(&self) -> &'static str {
        dispatch!(self, p => p.name())
    }

    fn params(&self) -> PatternParams {
        dispatch!(self, p => p.params())
    }

    fn set_stroke(&mut self, stroke: f32) {
        dispatch!(self, p => p.set_stroke(stroke))
    }

    fn set_time_of_stroke(&mut self, time_of_stroke: f32) {
        dispatch!(self, p => p.set_time_of_stroke(time_of_stroke))
    }

    fn set_sensation(&mut self, sensation: f32) {
        dispatch!(self, p => p.set_sensation(sensation))
    }

    fn next_target(&mut self, index: u32, now_ms: u64) -> MotionRequest {
        dispatch!(self, p => p.next_target(index, now_ms))
    }
}
