//! File name filtering
//!
//! Decides which raw events reach the readiness tracker. A filter either
//! checks the file extension against an allow-list or, in regex mode, matches
//! the whole file name against a pattern. Comparison is case-sensitive.

use crate::config::WatcherConfig;
use regex::Regex;
use settlewatch_core::error::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
enum FilterMode {
    Extensions(Arc<HashSet<String>>),
    Pattern(Regex),
}

/// Stateless accept/reject decision for file names
#[derive(Debug, Clone)]
pub struct EventFilter {
    mode: FilterMode,
}

impl EventFilter {
    /// Accept names whose extension is in the allow-list
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = extensions.into_iter().map(Into::into).collect();
        Self {
            mode: FilterMode::Extensions(Arc::new(allowed)),
        }
    }

    /// Accept names matching `pattern`
    pub fn pattern(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            mode: FilterMode::Pattern(Regex::new(pattern)?),
        })
    }

    /// Build the filter a watcher configuration describes
    ///
    /// A pattern that does not compile is reported and the extension list is
    /// used instead. Fails only when that leaves nothing to match against.
    pub fn from_config(config: &WatcherConfig) -> Result<Self> {
        if let Some(pattern) = &config.regex_pattern {
            match Self::pattern(pattern) {
                Ok(filter) => return Ok(filter),
                Err(e) => warn!(
                    "Invalid regex_pattern '{pattern}' ({e}); falling back to extension filter"
                ),
            }
        }

        if config.file_extensions.is_empty() {
            return Err(Error::config(
                "No file extensions configured and no usable regex pattern",
            ));
        }

        Ok(Self::extensions(config.file_extensions.iter().cloned()))
    }

    /// Check whether events for this file name should be tracked
    pub fn accepts(&self, name: &str) -> bool {
        let accepted = match &self.mode {
            FilterMode::Extensions(allowed) => allowed.contains(extension_of(name)),
            FilterMode::Pattern(regex) => regex.is_match(name),
        };

        if !accepted {
            trace!("Filtered out: {name}");
        }
        accepted
    }

    /// Whether this filter runs in regex mode
    pub fn is_pattern(&self) -> bool {
        matches!(self.mode, FilterMode::Pattern(_))
    }
}

/// Extension of a file name, starting at the last dot
///
/// `"report.tar.gz"` gives `".gz"` and `".env"` gives `".env"`. A name
/// without a dot, or ending in one, gives `""`.
pub fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx..],
        _ => "",
    }
}
