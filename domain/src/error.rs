//! Error types for the `domain` layer.
use crate::webhook::FieldErrors;
use chatbot_ai::Error as AiError;
use chatbot_auth::error::{Error as ChatbotAuthError, ErrorKind as ChatbotAuthErrorKind, WebhookErrorKind};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `chatbot_auth`, and `web` is dependent on `domain`,
/// but `web` should not be dependent, directly, on `chatbot_auth`. Ultimately the various `error_kind`s
/// are used by `web` to return appropriate HTTP status codes and messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
    Request(RequestErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
}

/// Enum representing failures of the AI provider the webhook forwards to.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Timeout,
    Other(String),
}

/// Enum representing the ways an inbound webhook request can be rejected.
///
/// A wrong signature and a malformed one are both `InvalidSignature`.
#[derive(Debug, PartialEq)]
pub enum RequestErrorKind {
    MissingSignature,
    InvalidSignature,
    StaleTimestamp,
    /// The body could not be read far enough to check the signature.
    Malformed(String),
    /// The signed payload failed field validation.
    Invalid(FieldErrors),
    PayloadTooLarge,
}

impl Error {
    pub fn request(kind: RequestErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Request(kind),
        }
    }

    pub fn config(message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `chatbot_auth` layer to the `domain` layer.
impl From<ChatbotAuthError> for Error {
    fn from(err: ChatbotAuthError) -> Self {
        let error_kind = match &err.error_kind {
            ChatbotAuthErrorKind::Webhook(WebhookErrorKind::MissingSignature) => {
                DomainErrorKind::Request(RequestErrorKind::MissingSignature)
            }
            ChatbotAuthErrorKind::Webhook(WebhookErrorKind::TimestampExpired) => {
                DomainErrorKind::Request(RequestErrorKind::StaleTimestamp)
            }
            ChatbotAuthErrorKind::Webhook(WebhookErrorKind::InvalidPayload) => {
                DomainErrorKind::Request(RequestErrorKind::Malformed(
                    err.message()
                        .unwrap_or_else(|| "Invalid webhook payload".to_string()),
                ))
            }
            // Only webhook validation reaches the domain layer through this conversion.
            ChatbotAuthErrorKind::Http(_) | ChatbotAuthErrorKind::ApiKey(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

// Every AI failure is reported as external so callers can tell it apart from
// a rejected request.
impl From<AiError> for Error {
    fn from(err: AiError) -> Self {
        let error_kind = match &err {
            AiError::Timeout(_) => DomainErrorKind::External(ExternalErrorKind::Timeout),
            AiError::Network(_) => DomainErrorKind::External(ExternalErrorKind::Network),
            AiError::Configuration(_) => DomainErrorKind::Internal(InternalErrorKind::Config),
            other => DomainErrorKind::External(ExternalErrorKind::Other(other.to_string())),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
