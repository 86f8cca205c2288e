//! Actuator implementations
//!
//! This crate provides concrete implementations of the actuator trait
//! defined in cadence-core:
//!
//! - Virtual motor (simulated rail for testing patterns and safety)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod motor;
