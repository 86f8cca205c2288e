//! Hardware abstraction traits
//!
//! These traits define the interface between the motion pipeline
//! and actuator-specific implementations.

pub mod actuator;

pub use actuator::{Actuator, ActuatorError, ActuatorLimits, ActuatorMotion};
