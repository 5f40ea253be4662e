//! Library interface for the settlewatch CLI
//!
//! This module exposes the watch session for integration testing while
//! keeping argument parsing and process setup in main.rs.

pub mod session;

// Re-export commonly needed types for tests
pub use anyhow::Result;
pub use session::WatchSession;
pub use settlewatch_core::config::Config;
