//! Actuator implementations
//!
//! - Virtual motor: a simulated rail driven by a shared motion profile

pub mod virtual_motor;

pub use virtual_motor::{VirtualMotor, VirtualMotorConfig};
