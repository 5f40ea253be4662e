//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigError, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::defaults::*;
use super::{global_config_path, Config, NotifierConfig, WatchConfig};

/// Environment variable prefix, e.g. `SETTLEWATCH_WATCH__ROOT=/data/inbox`
const ENV_PREFIX: &str = "SETTLEWATCH";

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("watch.file_extensions")
        .try_parsing(true)
}

/// Build the layered source, dropping the file layer if it cannot be read
fn build_source(path: Option<&Path>) -> ConfigLib {
    let mut builder = ConfigLib::builder();
    if let Some(path) = path.filter(|p| p.exists()) {
        debug!("Reading configuration from {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Toml));
    }

    match builder.add_source(environment()).build() {
        Ok(source) => source,
        Err(e) => {
            warn!("Failed to read configuration ({e}); using environment and defaults");
            ConfigLib::builder()
                .add_source(environment())
                .build()
                .unwrap_or_else(|e| {
                    warn!("Failed to read environment configuration ({e}); using defaults");
                    ConfigLib::default()
                })
        }
    }
}

/// Reads individual keys, substituting defaults for anything unusable
struct LenientReader {
    source: ConfigLib,
}

impl LenientReader {
    fn value<T>(&self, key: &str, default: T) -> T
    where
        T: DeserializeOwned + Debug,
    {
        match self.source.get::<T>(key) {
            Ok(value) => value,
            Err(ConfigError::NotFound(_)) => default,
            Err(e) => {
                warn!("Invalid value for '{key}' ({e}); using default {default:?}");
                default
            }
        }
    }

    /// A value that must be greater than zero to be meaningful
    fn positive(&self, key: &str, default: u64) -> u64 {
        match self.value(key, default) {
            0 => {
                warn!("'{key}' must be greater than 0; using default {default}");
                default
            }
            value => value,
        }
    }

    /// A value that must not exceed `max`
    fn at_most(&self, key: &str, default: u64, max: u64) -> u64 {
        match self.value(key, default) {
            value if value > max => {
                warn!("'{key}' must be at most {max}; using default {default}");
                default
            }
            value => value,
        }
    }

    /// A value in `1..=max`
    fn positive_at_most(&self, key: &str, default: u64, max: u64) -> u64 {
        match self.positive(key, default) {
            value if value > max => {
                warn!("'{key}' must be at most {max}; using default {default}");
                default
            }
            value => value,
        }
    }

    /// An optional string, where an empty value counts as unset
    fn optional_string(&self, key: &str) -> Option<String> {
        self.value::<Option<String>>(key, None)
            .filter(|value| !value.trim().is_empty())
    }
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `SETTLEWATCH_` and use double
    /// underscores for nested values. For example:
    /// - `SETTLEWATCH_WATCH__INITIAL_TIMER_INTERVAL_SECS=10`
    /// - `SETTLEWATCH_WATCH__FILE_EXTENSIONS=.csv,.xml`
    pub fn from_file(path: &Path) -> Self {
        Self::from_source(build_source(Some(path)))
    }

    /// Loads configuration from environment variables only
    pub fn from_env() -> Self {
        Self::from_source(build_source(None))
    }

    fn from_source(source: ConfigLib) -> Self {
        let reader = LenientReader { source };

        let watch = WatchConfig {
            root: reader.optional_string("watch.root").map(PathBuf::from),
            file_extensions: reader
                .value::<Vec<String>>("watch.file_extensions", Vec::new())
                .into_iter()
                .filter(|ext| !ext.is_empty())
                .collect(),
            use_regex_filter: reader.value("watch.use_regex_filter", false),
            regex_pattern: reader.optional_string("watch.regex_pattern"),
            initial_timer_interval_secs: reader.positive_at_most(
                "watch.initial_timer_interval_secs",
                default_initial_timer_interval_secs(),
                MAX_TIMER_INTERVAL_SECS,
            ),
            delayed_timer_interval_addition_secs: reader.at_most(
                "watch.delayed_timer_interval_addition_secs",
                default_delayed_timer_interval_addition_secs(),
                MAX_TIMER_INTERVAL_SECS,
            ),
            permitted_secs_between_ready_events: reader.value(
                "watch.permitted_secs_between_ready_events",
                default_permitted_secs_between_ready_events(),
            ),
            log_raw_events: reader.value("watch.log_raw_events", false),
            log_ready_events: reader.value("watch.log_ready_events", false),
            event_buffer_capacity: reader.positive(
                "watch.event_buffer_capacity",
                default_event_buffer_capacity() as u64,
            ) as usize,
        };

        let notifier = NotifierConfig {
            webhook_url: reader.optional_string("notifier.webhook_url"),
            timeout_secs: reader.positive("notifier.timeout_secs", default_notifier_timeout_secs()),
            message_prefix: reader.value("notifier.message_prefix", default_message_prefix()),
        };

        Self { watch, notifier }
    }

    /// Creates a config from a TOML string (useful for testing)
    ///
    /// Unlike [`Config::load`] this is strict: malformed values are errors.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.settlewatch/config.toml or custom --config path)
    /// 3. Environment variables (SETTLEWATCH_*)
    pub fn load(config_path: Option<&Path>) -> Self {
        let path = match config_path {
            Some(p) => Some(p.to_path_buf()),
            None => match global_config_path() {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("{e}; skipping global config file");
                    None
                }
            },
        };

        match path {
            Some(path) => {
                if config_path.is_some() && !path.exists() {
                    warn!("Config file {} not found; using defaults", path.display());
                }
                Self::from_file(&path)
            }
            None => Self::from_env(),
        }
    }
}
