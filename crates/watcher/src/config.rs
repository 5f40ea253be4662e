//! Configuration types for the file watcher
//!
//! This module provides immutable configuration structures for controlling
//! event filtering and readiness timing. Values are fixed once a watcher is
//! built; nothing here is mutated while a session runs.

use settlewatch_core::config::WatchConfig;
use std::time::Duration;

/// Timing parameters of the per-file readiness state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimings {
    /// Quiet period applied to a newly tracked file
    pub initial_interval: Duration,
    /// Growth of the quiet period when a file starts a new write episode
    pub interval_addition: Duration,
    /// Window after a ready event in which activity continues the same episode
    pub permitted_gap: Duration,
}

impl Default for DebounceTimings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            interval_addition: Duration::from_secs(1),
            permitted_gap: Duration::from_secs(60),
        }
    }
}

/// Immutable configuration for the file watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Extension allow-list, dot included, compared case-sensitively
    pub file_extensions: Vec<String>,
    /// File name pattern; when set it replaces the extension check
    pub regex_pattern: Option<String>,
    /// Readiness timing
    pub timings: DebounceTimings,
    /// Log each accepted raw event
    pub log_raw_events: bool,
    /// Log each ready declaration
    pub log_ready_events: bool,
    /// Raw events buffered between the OS callback and the dispatch loop
    pub event_buffer_capacity: usize,
    /// Per-listener backlog of the notification channels
    pub notification_capacity: usize,
}

impl WatcherConfig {
    /// Create configuration from builder
    pub fn builder() -> WatcherConfigBuilder {
        WatcherConfigBuilder::default()
    }

    /// Build the runtime configuration from loaded settings
    ///
    /// The regex pattern only carries over when regex filtering is enabled.
    pub fn from_settings(settings: &WatchConfig) -> Self {
        let regex_pattern = if settings.use_regex_filter {
            settings.regex_pattern.clone()
        } else {
            None
        };

        Self {
            file_extensions: settings.file_extensions.clone(),
            regex_pattern,
            timings: DebounceTimings {
                initial_interval: Duration::from_secs(settings.initial_timer_interval_secs),
                interval_addition: Duration::from_secs(
                    settings.delayed_timer_interval_addition_secs,
                ),
                permitted_gap: Duration::from_secs(settings.permitted_secs_between_ready_events),
            },
            log_raw_events: settings.log_raw_events,
            log_ready_events: settings.log_ready_events,
            event_buffer_capacity: settings.event_buffer_capacity,
            ..Self::default()
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            file_extensions: Vec::new(),
            regex_pattern: None,
            timings: DebounceTimings::default(),
            log_raw_events: false,
            log_ready_events: false,
            event_buffer_capacity: 32_768,
            notification_capacity: 1024,
        }
    }
}

/// Builder for WatcherConfig
#[derive(Debug, Default)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl WatcherConfigBuilder {
    /// Set the extension allow-list
    pub fn file_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.file_extensions = extensions;
        self
    }

    /// Add one allowed extension
    pub fn add_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.file_extensions.push(extension.into());
        self
    }

    /// Filter by file name pattern instead of extension
    pub fn regex_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.regex_pattern = Some(pattern.into());
        self
    }

    /// Set the quiet period for newly tracked files
    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.config.timings.initial_interval = interval;
        self
    }

    /// Set the growth applied on each new write episode
    pub fn interval_addition(mut self, addition: Duration) -> Self {
        self.config.timings.interval_addition = addition;
        self
    }

    /// Set the correlation window after a ready event
    pub fn permitted_gap(mut self, gap: Duration) -> Self {
        self.config.timings.permitted_gap = gap;
        self
    }

    /// Enable raw event logging
    pub fn log_raw_events(mut self, enable: bool) -> Self {
        self.config.log_raw_events = enable;
        self
    }

    /// Enable ready event logging
    pub fn log_ready_events(mut self, enable: bool) -> Self {
        self.config.log_ready_events = enable;
        self
    }

    /// Set raw event buffer capacity
    pub fn event_buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.event_buffer_capacity = capacity;
        self
    }

    /// Set notification channel capacity
    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.config.notification_capacity = capacity;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WatcherConfig {
        self.config
    }
}
