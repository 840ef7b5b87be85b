//! Shared types passed between the webhook service and AI providers.

pub mod conversation;
