//! Chat reply provider trait.

use crate::types::conversation::Turn;
use crate::Error;
use async_trait::async_trait;

/// Abstraction for generative-AI chat reply providers.
///
/// Implementations turn a user's message into a single assistant reply.
/// Callers own timeout policy; implementations should still set transport
/// timeouts so abandoned calls release their connections.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a reply to one user message.
    ///
    /// Returns the trimmed reply text, never an empty string.
    async fn generate_response(&self, user_message: &str) -> Result<String, Error>;

    /// Generate a reply with previous turns of the conversation as context.
    ///
    /// Implementations fall back to `generate_response` when the contextual call fails.
    async fn generate_response_with_context(
        &self,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String, Error>;

    /// Return unique identifier for this provider (e.g., "gemini").
    fn provider_id(&self) -> &str;

    /// Validate API credentials by making a lightweight request.
    async fn verify_credentials(&self) -> Result<bool, Error>;
}
