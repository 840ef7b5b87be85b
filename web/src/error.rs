use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use domain::error::{
    DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind, RequestErrorKind,
};
use domain::webhook::FieldErrors;

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    /// Machine-readable error code, e.g. `INVALID_SIGNATURE`.
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

pub(crate) fn error_response(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    details: Option<FieldErrors>,
) -> Response {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: code.to_string(),
            message: message.into(),
            details,
        }),
    )
        .into_response()
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let source = self.0.source.as_ref().map(|e| e.to_string());
        match self.0.error_kind {
            DomainErrorKind::Request(request_error_kind) => match request_error_kind {
                RequestErrorKind::MissingSignature => error_response(
                    StatusCode::UNAUTHORIZED,
                    "MISSING_SIGNATURE",
                    "X-ZEvent-Signature header is required",
                    None,
                ),
                RequestErrorKind::InvalidSignature => error_response(
                    StatusCode::FORBIDDEN,
                    "INVALID_SIGNATURE",
                    "Signature verification failed",
                    None,
                ),
                RequestErrorKind::StaleTimestamp => error_response(
                    StatusCode::FORBIDDEN,
                    "STALE_TIMESTAMP",
                    "Webhook timestamp is outside the accepted window",
                    None,
                ),
                RequestErrorKind::Malformed(message) => {
                    error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, None)
                }
                RequestErrorKind::Invalid(details) => error_response(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "Invalid webhook payload",
                    Some(details),
                ),
                RequestErrorKind::PayloadTooLarge => error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "PAYLOAD_TOO_LARGE",
                    "Request body exceeds the 1MB limit",
                    None,
                ),
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Timeout => error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "AI_TIMEOUT",
                    "Failed to generate response: AI service timed out",
                    None,
                ),
                ExternalErrorKind::Network => error_response(
                    StatusCode::BAD_GATEWAY,
                    "AI_SERVICE_ERROR",
                    "Failed to generate response: AI service unreachable",
                    None,
                ),
                ExternalErrorKind::Other(message) => error_response(
                    StatusCode::BAD_GATEWAY,
                    "AI_SERVICE_ERROR",
                    format!("Failed to generate response: {}", message),
                    None,
                ),
            },
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Config => {
                    error!("Configuration error: {:?}", source);
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CONFIGURATION_ERROR",
                        "Server configuration error",
                        None,
                    )
                }
            },
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
