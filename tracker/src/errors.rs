//! Tracker error types
//!
//! Every failure inside a run maps onto one of these kinds. A run catches
//! the error once at the top, records it in the `logs` table and stops.
//! Nothing is retried.

use std::time::Duration;

use thiserror::Error;

/// Error category for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No previous rank record exists for an app
    LookupError,
    /// The ranking table never rendered within the bounded wait
    ScrapeTimeout,
    /// Browser launch, navigation or evaluation failed
    ScrapeError,
    /// Extracted ranks were absent or non-numeric
    ValidationError,
    /// The posting API rejected or never received the post
    NotifyError,
    /// The history store rejected a read or write
    PersistenceError,
    /// Configuration file or environment misconfigured
    ConfigError,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LookupError => "LOOKUP_ERROR",
            Self::ScrapeTimeout => "SCRAPE_TIMEOUT",
            Self::ScrapeError => "SCRAPE_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotifyError => "NOTIFY_ERROR",
            Self::PersistenceError => "PERSISTENCE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("could not fetch most recent ranking for {app}")]
    Lookup { app: String },

    #[error("ranking table for {app} did not appear within {}s", .waited.as_secs())]
    ScrapeTimeout { app: String, waited: Duration },

    #[error("scrape error: {message}")]
    Scrape {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("retrieved invalid app rankings for {app}: {detail}")]
    Validation { app: String, detail: String },

    #[error("notify error: {message}")]
    Notify {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl TrackerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Lookup { .. } => ErrorCategory::LookupError,
            Self::ScrapeTimeout { .. } => ErrorCategory::ScrapeTimeout,
            Self::Scrape { .. } => ErrorCategory::ScrapeError,
            Self::Validation { .. } => ErrorCategory::ValidationError,
            Self::Notify { .. } => ErrorCategory::NotifyError,
            Self::Persistence { .. } => ErrorCategory::PersistenceError,
            Self::Config { .. } => ErrorCategory::ConfigError,
        }
    }

    pub fn lookup(app: impl Into<String>) -> Self {
        Self::Lookup { app: app.into() }
    }

    pub fn scrape_timeout(app: impl Into<String>, waited: Duration) -> Self {
        Self::ScrapeTimeout {
            app: app.into(),
            waited,
        }
    }

    pub fn scrape_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Scrape {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn scrape(message: impl Into<String>) -> Self {
        Self::Scrape {
            message: message.into(),
            source: None,
        }
    }

    pub fn validation(app: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation {
            app: app.into(),
            detail: detail.into(),
        }
    }

    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify {
            message: message.into(),
            source: None,
        }
    }

    pub fn notify_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Notify {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn persistence_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn categories_have_stable_codes() {
        assert_eq!(
            TrackerError::lookup("Phantom").category().as_str(),
            "LOOKUP_ERROR"
        );
        assert_eq!(
            TrackerError::validation("Phantom", "x").category(),
            ErrorCategory::ValidationError
        );
        assert_eq!(
            TrackerError::notify("boom").category().as_str(),
            "NOTIFY_ERROR"
        );
    }

    #[test]
    fn timeout_message_names_app_and_wait() {
        let err = TrackerError::scrape_timeout("Coinbase Wallet", Duration::from_secs(30));
        assert_eq!(
            err.to_string(),
            "ranking table for Coinbase Wallet did not appear within 30s"
        );
    }
}
