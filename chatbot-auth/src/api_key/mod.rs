//! API key authentication for service providers.
//!
//! Provides traits and implementations for authenticating requests to services
//! that use API keys (Google Gemini).

mod auth;

pub use auth::{ApiKeyAuth, ApiKeyProvider, ProviderAuth};
