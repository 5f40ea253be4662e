//! Configuration module for settlewatch
//!
//! Configuration is read once at startup from a TOML file and/or environment
//! variables. Every key is optional: missing keys take their built-in default
//! and malformed keys fall back to the default with a warning, so a bad
//! setting never stops a watch session from starting.

mod defaults;
mod loading;


use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.settlewatch/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".settlewatch").join("config.toml"))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Watch session configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// Webhook notifier configuration
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// Configuration for the watch session and its readiness timers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root directory watched recursively
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Extension allow-list, dot included (".csv"); compared case-sensitively
    #[serde(default)]
    pub file_extensions: Vec<String>,

    /// Match file names against `regex_pattern` instead of the extension list
    #[serde(default)]
    pub use_regex_filter: bool,

    /// Pattern used when `use_regex_filter` is on
    #[serde(default)]
    pub regex_pattern: Option<String>,

    /// Quiet period before a new file is declared ready
    #[serde(default = "default_initial_timer_interval_secs")]
    pub initial_timer_interval_secs: u64,

    /// Added to a file's quiet period each time it starts a new write episode
    #[serde(default = "default_delayed_timer_interval_addition_secs")]
    pub delayed_timer_interval_addition_secs: u64,

    /// Grace window after a ready event in which new activity continues the episode
    #[serde(default = "default_permitted_secs_between_ready_events")]
    pub permitted_secs_between_ready_events: u64,

    /// Log every accepted raw filesystem event
    #[serde(default)]
    pub log_raw_events: bool,

    /// Log every ready declaration
    #[serde(default)]
    pub log_ready_events: bool,

    /// Raw events buffered between the OS callback and the dispatch loop
    #[serde(default = "default_event_buffer_capacity")]
    pub event_buffer_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: None,
            file_extensions: Vec::new(),
            use_regex_filter: false,
            regex_pattern: None,
            initial_timer_interval_secs: default_initial_timer_interval_secs(),
            delayed_timer_interval_addition_secs: default_delayed_timer_interval_addition_secs(),
            permitted_secs_between_ready_events: default_permitted_secs_between_ready_events(),
            log_raw_events: false,
            log_ready_events: false,
            event_buffer_capacity: default_event_buffer_capacity(),
        }
    }
}

/// Configuration for the webhook notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Target URL; the notifier is disabled when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_notifier_timeout_secs")]
    pub timeout_secs: u64,

    /// Text placed before the file path in the posted message
    #[serde(default = "default_message_prefix")]
    pub message_prefix: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notifier_timeout_secs(),
            message_prefix: default_message_prefix(),
        }
    }
}

impl Config {
    /// Validate the conditions a watch session cannot start without
    ///
    /// Everything else has already been defaulted during loading.
    pub fn validate(&self) -> Result<()> {
        let root = self
            .watch
            .root
            .as_ref()
            .ok_or_else(|| Error::config("watch.root is not set"))?;

        if !root.is_dir() {
            return Err(Error::config(format!(
                "watch.root {} does not exist or is not a directory",
                root.display()
            )));
        }

        if !self.watch.use_regex_filter && self.watch.file_extensions.is_empty() {
            return Err(Error::config(
                "watch.file_extensions is empty and regex filtering is off; no file could ever match"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize the effective configuration back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))
    }

    /// Log the settings that shape readiness timing
    pub fn log_summary(&self) {
        let watch = &self.watch;
        info!(
            "initial_timer_interval: [{}s], delayed_timer_interval_addition: [{}s], permitted_interval_between_ready_events: [{}s]",
            watch.initial_timer_interval_secs,
            watch.delayed_timer_interval_addition_secs,
            watch.permitted_secs_between_ready_events
        );
        info!(
            "log_ready_events: [{}], log_raw_events: [{}], use_regex_filter: [{}]",
            watch.log_ready_events, watch.log_raw_events, watch.use_regex_filter
        );
        match &self.notifier.webhook_url {
            Some(url) => info!("Webhook notifier target: {url}"),
            None => info!("Webhook notifier disabled (notifier.webhook_url not set)"),
        }
    }
}
