//! Configuration
//!
//! Factory defaults and the persistable motion settings record. Storage
//! itself is left to the embedder.

pub mod defaults;
pub mod motion;

pub use defaults::*;
pub use motion::{MotionConfig, MAX_PATTERN_NAME_LEN, MOTION_CONFIG_MAGIC, MOTION_CONFIG_VERSION};
