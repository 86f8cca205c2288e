//! Stroke command state machine
//!
//! The command is explicit, finite, and deterministic. Client requests and
//! engine faults are the only ways it changes.

pub mod events;
pub mod machine;

pub use events::{CommandEvent, StopReason};
pub use machine::StrokeCommand;
