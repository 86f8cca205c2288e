//! Motion generation
//!
//! The trapezoidal profile every move is planned with, and the two
//! modifiers that reshape moves before and after planning.

pub mod ease_in;
pub mod profile;
pub mod vibration;

pub use ease_in::{EaseInModifier, EaseInRamp, MIN_CORRECTION};
pub use profile::{
    MotionSample, ProfileError, ProfilePoint, SharedProfile, TrapezoidalProfile, PROFILE_POINTS,
};
pub use vibration::VibrationModifier;
