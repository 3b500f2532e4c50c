//! Result and error types for Portal Probe.

use thiserror::Error;

/// Result type for Portal Probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving a portal page
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A query resolved to zero elements where one was required
    #[error("Element not found: {query}")]
    ElementNotFound {
        /// Description of the query that failed to resolve
        query: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waited_for: String,
    },

    /// Observed value violates an expected invariant
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Driver-level page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Selector outside the supported grammar
    #[error("Unsupported selector '{selector}': {reason}")]
    UnsupportedSelector {
        /// The selector text
        selector: String,
        /// Why it was rejected
        reason: String,
    },

    /// Accessible-name or text pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern source
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// The session's page or context has already been released
    #[error("Session already closed")]
    SessionClosed,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Scenario dataset error
    #[error("Dataset error: {message}")]
    DatasetError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Build an `ElementNotFound` error from a query description
    pub fn not_found(query: impl Into<String>) -> Self {
        Self::ElementNotFound {
            query: query.into(),
        }
    }

    /// Build an `AssertionFailed` error
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Whether this error means "the element was not there in time".
    ///
    /// Helpers with a fallback path recover from these locally.
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_query() {
        let err = ProbeError::not_found("role=searchbox name=/search/i");
        assert_eq!(
            err.to_string(),
            "Element not found: role=searchbox name=/search/i"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = ProbeError::Timeout {
            ms: 5000,
            waited_for: "css=button".to_string(),
        };
        assert_eq!(err.to_string(), "Timed out after 5000ms waiting for css=button");
    }

    #[test]
    fn test_is_absence() {
        assert!(ProbeError::not_found("x").is_absence());
        assert!(ProbeError::Timeout {
            ms: 1,
            waited_for: "x".into()
        }
        .is_absence());
        assert!(!ProbeError::assertion("x").is_absence());
        assert!(!ProbeError::SessionClosed.is_absence());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ProbeError = io.into();
        assert!(matches!(err, ProbeError::Io(_)));
    }
}
