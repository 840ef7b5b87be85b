//! Provider traits.

pub mod responder;
