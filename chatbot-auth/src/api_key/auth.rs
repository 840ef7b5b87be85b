//! API key authentication trait and implementation.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{api_key_error, ApiKeyErrorKind, Error};

/// Known API key providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyProvider {
    Gemini,
}

impl ApiKeyProvider {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyProvider::Gemini => "gemini",
        }
    }

    /// Header the provider expects the key in.
    pub fn header_name(&self) -> &'static str {
        match self {
            ApiKeyProvider::Gemini => "x-goog-api-key",
        }
    }
}

/// Trait for authenticating outbound HTTP requests with API keys.
///
/// Implementations produce the headers a client attaches to every request:
/// - Gemini: `x-goog-api-key: xxx`
pub trait ProviderAuth: Send + Sync {
    /// Headers carrying the credentials, with values marked sensitive.
    fn default_headers(&self) -> Result<HeaderMap, Error>;
}

/// API key authentication implementation.
///
/// # Examples
///
/// ```rust,ignore
/// // Gemini: x-goog-api-key: xxx
/// let auth = ApiKeyAuth::new(ApiKeyProvider::Gemini, SecretString::new(key))?;
/// ```
pub struct ApiKeyAuth {
    api_key: SecretString,
    header_name: String,
}

impl ApiKeyAuth {
    /// Create a new API key authenticator.
    ///
    /// Fails with `ApiKeyErrorKind::NotFound` when the key is empty.
    pub fn new(provider: ApiKeyProvider, api_key: SecretString) -> Result<Self, Error> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(api_key_error(
                ApiKeyErrorKind::NotFound,
                &format!("No API key configured for {}", provider.as_str()),
            ));
        }

        Ok(Self {
            api_key,
            header_name: provider.header_name().to_string(),
        })
    }
}

impl ProviderAuth for ApiKeyAuth {
    fn default_headers(&self) -> Result<HeaderMap, Error> {
        let name = HeaderName::from_bytes(self.header_name.as_bytes()).map_err(|_| {
            api_key_error(ApiKeyErrorKind::InvalidFormat, "Invalid API key header name")
        })?;

        let mut value = HeaderValue::from_str(self.api_key.expose_secret())
            .map_err(|_| api_key_error(ApiKeyErrorKind::InvalidFormat, "Invalid API key format"))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(name, value);
        Ok(headers)
    }
}
