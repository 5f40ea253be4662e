use thiserror::Error;

/// Result type for settlewatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for settlewatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File watching errors
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Downstream notification delivery errors
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a watcher error
    pub fn watcher(msg: impl Into<String>) -> Self {
        Self::Watcher(msg.into())
    }

    /// Creates a notifier error
    pub fn notifier(msg: impl Into<String>) -> Self {
        Self::Notifier(msg.into())
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_source() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = io.context("reading watch root").unwrap_err();
        assert_eq!(err.to_string(), "reading watch root: gone");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_constructor_helpers() {
        assert!(matches!(Error::config("x"), Error::Config(m) if m == "x"));
        assert!(matches!(Error::watcher("x"), Error::Watcher(_)));
        assert_eq!(
            Error::notifier("status 500").to_string(),
            "Notifier error: status 500"
        );
    }
}
