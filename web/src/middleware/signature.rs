use crate::{AppState, Error};
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use domain::error::{DomainErrorKind, Error as DomainError, RequestErrorKind};
use domain::webhook;
use log::*;
use std::collections::HashMap;

/// Largest webhook body accepted, in bytes.
pub(crate) const MAX_BODY_BYTES: usize = 1024 * 1024;

const SIGNATURE_LOG_PREFIX: usize = 20;

/// Verifies the `X-ZEvent-Signature` of an inbound webhook before the controller runs.
///
/// The signature covers the body exactly as received, so the bytes are buffered here,
/// checked, and handed on unchanged.
pub(crate) async fn verify_signature(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
        warn!("Rejected webhook body: {}", e);
        DomainError::request(RequestErrorKind::PayloadTooLarge)
    })?;

    let headers = header_map(&parts.headers);
    if let Err(e) = webhook::authenticate(app_state.webhook_validator_ref(), &headers, &bytes) {
        if e.error_kind == DomainErrorKind::Request(RequestErrorKind::InvalidSignature) {
            warn!(
                "Invalid signature received: {}...",
                signature_prefix(&parts.headers)
            );
        } else {
            debug!("Webhook rejected before signature check: {:?}", e.error_kind);
        }
        return Err(e.into());
    }

    debug!("Webhook signature verified ({} bytes)", bytes.len());
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

// Headers that are not valid UTF-8 cannot carry a signature and are skipped.
fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn signature_prefix(headers: &HeaderMap) -> String {
    headers
        .get(domain::webhook::SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.chars().take(SIGNATURE_LOG_PREFIX).collect())
        .unwrap_or_default()
}
