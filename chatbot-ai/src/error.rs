//! Error types for chatbot AI operations.

use std::fmt;

/// Universal error type that abstracts provider-specific errors into common variants.
///
/// All provider implementations map their native errors to these variants,
/// preserving context while keeping a provider-agnostic interface.
#[derive(Debug)]
pub enum Error {
    /// API key rejected or lacking permissions.
    Authentication(String),

    /// Network connectivity issues, DNS failures, or connection resets.
    /// These errors are typically transient.
    Network(String),

    /// Missing or placeholder credentials, invalid model name, bad base URL.
    /// Raised when the provider is constructed, before any traffic is served.
    Configuration(String),

    /// Provider-side failures: 5xx responses, empty or unparseable completions.
    Provider(String),

    /// The call did not finish within the configured wall-clock bound.
    Timeout(String),

    /// Provider rate limit exceeded.
    RateLimited { retry_after_seconds: u64 },

    /// The caller passed input the provider cannot accept (e.g. empty text).
    InvalidInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication(msg) => write!(f, "Authentication failed: {}", msg),
            Error::Network(msg) => write!(f, "Network error: {}", msg),
            Error::Configuration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Provider(msg) => write!(f, "Provider error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::RateLimited {
                retry_after_seconds,
            } => {
                write!(f, "Rate limited: retry after {}s", retry_after_seconds)
            }
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
