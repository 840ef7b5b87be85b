//! HTTP client building with middleware.

mod client;
mod retry;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder};
pub use retry::BackoffPolicy;
