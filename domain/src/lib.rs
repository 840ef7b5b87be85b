//! Webhook business rules for the chatbot simulator.
//!
//! `web` depends on this crate for everything between a verified request body and the
//! reply envelope; it never talks to `chatbot_auth` or the Gemini API directly.

pub mod error;
pub mod gateway;
pub mod message_id;
pub mod webhook;
