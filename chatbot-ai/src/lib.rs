//! Chatbot AI abstraction layer for reply generation providers.
//!
//! This crate provides trait-based abstractions for generating chatbot replies:
//! - A responder trait implemented by generative-AI gateways
//! - Conversation types for context-aware replies
//!
//! The design is provider-agnostic, enabling the webhook service to swap
//! providers (Gemini, or a mock in tests) without changing application code.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::Error;
pub use types::conversation::{Role, Turn};
