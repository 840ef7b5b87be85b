//! Clients for the external services the webhook relies on.

pub mod gemini;
