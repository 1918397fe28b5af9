//! Vidlane Common Utilities
//!
//! Shared infrastructure for all vidlane crates:
//! - Error taxonomy (configuration, range, resource) and result alias
//! - Reader configuration surface, interleave modes, element types
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
