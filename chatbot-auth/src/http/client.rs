//! Authenticated HTTP client builder with middleware.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::BackoffPolicy;
use crate::api_key::ProviderAuth;
use crate::error::Error;

/// HTTP client configuration.
#[derive(Debug, Clone)]
struct HttpClientConfig {
    /// Request timeout.
    timeout: Duration,
    /// Maximum number of retries.
    max_retries: u32,
    /// Delay before the first retry, doubled on each following attempt.
    base_delay: Duration,
    /// User agent string.
    user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            user_agent: format!("chatbot-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Authenticated HTTP client with middleware.
pub type AuthenticatedClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for creating authenticated HTTP clients with middleware.
///
/// Provides a fluent API for constructing HTTP clients with:
/// - Authentication headers attached to every request
/// - Retry of transient failures with exponential backoff
/// - Timeout configuration
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
    auth: Option<Box<dyn ProviderAuth>>,
}

impl AuthenticatedClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
            auth: None,
        }
    }

    /// Set the authentication provider.
    pub fn with_auth(mut self, auth: Box<dyn ProviderAuth>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.config.base_delay = base_delay;
        self
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<AuthenticatedClient, Error> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent);

        if let Some(auth) = &self.auth {
            builder = builder.default_headers(auth.default_headers()?);
        }

        let client = builder.build()?;

        let retry_policy =
            BackoffPolicy::new(self.config.max_retries).with_base_delay(self.config.base_delay);
        let client_with_middleware = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(client_with_middleware)
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
