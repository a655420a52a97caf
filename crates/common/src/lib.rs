//! Power Hour Common Utilities
//!
//! Shared infrastructure for all Power Hour crates:
//! - Error taxonomy and result alias
//! - Tracing/logging initialization
//! - Configuration loading and defaults

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
