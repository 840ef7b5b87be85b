use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;

const SERVER_SERVICE_NAME: &str = "chatbot-zalo-simulator";
const WEBHOOK_SERVICE_NAME: &str = "zalo-webhook";
const HEALTHY: &str = "healthy";

#[derive(Debug, Serialize, ToSchema)]
pub struct ServerHealth {
    pub success: bool,
    pub service: String,
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub environment: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookHealth {
    pub success: bool,
    pub service: String,
    pub status: String,
    pub timestamp: String,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// GET whether the server is up
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API router is up and responding to requests", body = ServerHealth),
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ServerHealth {
            success: true,
            service: SERVER_SERVICE_NAME.to_string(),
            status: HEALTHY.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: now(),
            environment: app_state.config.runtime_env().to_string(),
        }),
    )
}

/// GET whether the webhook endpoint is up
#[utoipa::path(
    get,
    path = "/webhook/health",
    responses(
        (status = 200, description = "Webhook endpoint is accepting requests", body = WebhookHealth),
    )
)]
pub async fn webhook_health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(WebhookHealth {
            success: true,
            service: WEBHOOK_SERVICE_NAME.to_string(),
            status: HEALTHY.to_string(),
            timestamp: now(),
        }),
    )
}
