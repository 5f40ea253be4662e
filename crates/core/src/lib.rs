//! Core types for the settlewatch file readiness watcher
//!
//! This crate provides the foundations shared by the other settlewatch crates:
//!
//! - **Configuration**: layered loading with per-key fallback to defaults
//! - **Error handling**: unified error types

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, NotifierConfig, WatchConfig};
pub use error::{Error, Result, ResultExt};
