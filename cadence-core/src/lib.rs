//! Board-agnostic motion generation for stroke engines
//!
//! This crate contains the whole motion pipeline that does not depend on
//! a specific motor or board:
//!
//! - Trapezoidal motion profiles shared between control and sampling contexts
//! - Safety guard clamping raw strokes into the machine's physical limits
//! - Ease-in and vibration modifiers
//! - Stroke pattern strategies and their registry
//! - The stroke engine control loop and command state machine
//! - Actuator abstraction trait
//! - Configuration defaults and sanitizing

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to every module
mod fmt;

pub mod config;
pub mod engine;
pub mod motion;
pub mod pattern;
pub mod safety;
pub mod state;
pub mod traits;
