//! Controller for Zalo OA webhook deliveries.
//!
//! Runs behind the signature middleware, so every body reaching it has already been
//! authenticated.

use crate::{AppState, Error};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::webhook::{self as WebhookApi, ReplyEnvelope, WebhookPayload};
use log::*;

/// POST /webhook
///
/// Answers a signed `user_send_text` event with an AI-generated reply.
#[utoipa::path(
    post,
    path = "/webhook",
    request_body = WebhookPayload,
    responses(
        (status = 200, description = "Reply generated", body = ReplyEnvelope),
        (status = 400, description = "Invalid webhook payload", body = crate::error::ErrorBody),
        (status = 401, description = "Signature header missing", body = crate::error::ErrorBody),
        (status = 403, description = "Signature verification failed", body = crate::error::ErrorBody),
        (status = 413, description = "Body larger than 1MB", body = crate::error::ErrorBody),
        (status = 502, description = "AI service failed", body = crate::error::ErrorBody),
        (status = 504, description = "AI service timed out", body = crate::error::ErrorBody),
    ),
    security(
        ("zevent_signature" = [])
    )
)]
pub async fn receive(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    let payload = WebhookApi::parse_payload(&body)?;

    info!(
        "Received {} {} from {} to {}",
        payload.event_name.as_str(),
        payload.message.msg_id,
        payload.sender.id,
        payload.recipient.id
    );

    let envelope = WebhookApi::reply(
        app_state.ai_provider_ref(),
        &payload,
        app_state.config.ai_request_timeout(),
    )
    .await?;

    Ok((StatusCode::OK, Json(envelope)))
}
