//! # chatbot-auth
//!
//! Single source of truth for authentication in the chatbot simulator:
//! - The ZEvent webhook signature scheme, shared by the signing client and the
//!   verifying server so the two sides can never drift apart
//! - Webhook request validation on top of that scheme
//! - API key authentication for the AI provider
//! - HTTP client building with retry middleware
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatbot_auth::webhook::{signature, WebhookValidator, ZEventSignatureValidator};
//!
//! let header_value = signature::sign(app_id, &body, timestamp, secret);
//! assert!(signature::verify(&header_value, app_id, &body, timestamp, secret));
//! ```

pub mod api_key;
pub mod error;
pub mod http;
pub mod webhook;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
