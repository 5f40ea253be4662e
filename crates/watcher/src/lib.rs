#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! File readiness detection
//!
//! This crate watches a directory tree and reports when a file has stopped
//! changing long enough to be treated as complete:
//! - Name filtering by extension allow-list or regex pattern
//! - One debounce state machine per file name, keyed across directories
//! - Adaptive quiet periods for files that are rewritten later
//! - Non-blocking fan-out of ready events and diagnostic messages
//!
//! # Example
//!
//! ```no_run
//! use settlewatch_watcher::{FileWatcher, WatcherConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WatcherConfig::builder().add_file_extension(".csv").build();
//! let mut watcher = FileWatcher::new(config)?;
//! let mut ready = watcher.subscribe_ready();
//!
//! watcher.watch("/data/inbox").await?;
//!
//! while let Ok(event) = ready.recv().await {
//!     println!("{} is ready", event.full_path.display());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod debouncer;
mod events;
mod fanout;
mod filter;
mod registry;
mod watcher;

pub use config::{DebounceTimings, WatcherConfig, WatcherConfigBuilder};
pub use debouncer::{EventOutcome, FileSnapshot, FileState, TrackedFile};
pub use events::{ChangeKind, DiagnosticMessage, FileReady, RawEvent};
pub use fanout::{spawn_listener, Notifications};
pub use filter::{extension_of, EventFilter};
pub use registry::{Dispatch, FileTracker, ReadinessRegistry};
pub use watcher::FileWatcher;
