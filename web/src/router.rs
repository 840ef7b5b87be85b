use crate::controller::{health_check_controller, webhook_controller};
use crate::error::{error_response, ErrorBody};
use crate::middleware::{security_headers::security_headers, signature};
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    routing::{get, post},
    Router,
};
use log::*;
use tower_http::cors::{AllowOrigin, CorsLayer};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Zalo OA Chatbot Simulator API"
        ),
        paths(
            health_check_controller::health_check,
            health_check_controller::webhook_health,
            webhook_controller::receive,
        ),
        components(
            schemas(
                domain::webhook::WebhookPayload,
                domain::webhook::ReplyEnvelope,
                ErrorBody,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "chatbot_zalo_simulator", description = "Zalo OA webhook simulator answered by Gemini")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Webhook deliveries authenticate with the ZEvent signature header.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "zevent_signature",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    domain::webhook::SIGNATURE_HEADER,
                    "sha256(<hex>) over app_id, the raw body, timestamp and the OA secret key",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.allowed_origins);

    Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(webhook_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(signature::MAX_BODY_BYTES))
        .layer(from_fn(security_headers))
        .layer(cors)
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

/// Routes for Zalo OA webhooks (no session - validated by the ZEvent signature).
/// Only the POST handler is signed; other methods fall through to the JSON 404.
fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/webhook",
            post(webhook_controller::receive).route_layer(from_fn_with_state(
                app_state.clone(),
                signature::verify_signature,
            )),
        )
        .route(
            "/webhook/health",
            get(health_check_controller::webhook_health),
        )
        .with_state(app_state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-zevent-signature"),
        ]);

    // tower-http refuses `*` in an origin list and with credentials.
    if allowed_origins.iter().any(|origin| origin.trim() == "*") {
        warn!("ALLOWED_ORIGINS contains `*`; allowing any origin without credentials");
        return cors.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

async fn not_found(method: Method, uri: Uri) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("Route {} {} not found", method, uri.path()),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chatbot_ai::traits::responder::MockProvider;
    use chatbot_auth::webhook::{signature as zevent, ZEventSignatureValidator};
    use clap::Parser;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    const APP_ID: &str = "demo_app_id";
    const SECRET: &str = "demo_secret";
    const TIMESTAMP: &str = "1690000000000";

    fn config() -> Config {
        config_with_origins("http://localhost:5173")
    }

    fn config_with_origins(allowed_origins: &str) -> Config {
        Config::parse_from([
            "chatbot_zalo_simulator",
            "--allowed-origins",
            allowed_origins,
            "--oa-app-id",
            APP_ID,
            "--oa-secret-key",
            SECRET,
            "--gemini-api-key",
            "AIza-test",
            "--ai-request-timeout-secs",
            "1",
        ])
    }

    fn app(provider: MockProvider) -> Router {
        app_with_config(provider, config())
    }

    fn app_with_config(provider: MockProvider, config: Config) -> Router {
        let validator = ZEventSignatureValidator::new(
            "zalo_oa".to_string(),
            SecretString::new(SECRET.to_string()),
            domain::webhook::SIGNATURE_HEADER.to_string(),
        );
        define_routes(AppState::new(
            config,
            Arc::new(provider),
            Arc::new(validator),
        ))
    }

    fn webhook_body(text: &str) -> String {
        json!({
            "app_id": APP_ID,
            "sender": { "id": "demo_user_123" },
            "recipient": { "id": "demo_oa_987" },
            "event_name": "user_send_text",
            "message": { "text": text, "msg_id": "msg_1690000000000_k3j9x0a1b" },
            "timestamp": TIMESTAMP
        })
        .to_string()
    }

    fn signed_request(body: String) -> Request<Body> {
        let signature = zevent::sign(APP_ID, &body, TIMESTAMP, SECRET);
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("X-ZEvent-Signature", signature)
            .body(Body::from(body))
            .unwrap()
    }

    fn replying(text: &'static str) -> MockProvider {
        let mut provider = MockProvider::new();
        provider
            .expect_generate_response()
            .times(1)
            .returning(move |_| Ok(text.to_string()));
        provider.expect_provider_id().return_const("mock".to_string());
        provider
    }

    fn never_called() -> MockProvider {
        let mut provider = MockProvider::new();
        provider.expect_generate_response().times(0);
        provider.expect_provider_id().return_const("mock".to_string());
        provider
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_signed_webhook_is_answered() {
        let response = app(replying("Xin chao! Toi co the giup gi?"))
            .oneshot(signed_request(webhook_body("Xin chao")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["recipient_id"], "demo_user_123");
        assert_eq!(body["data"]["message"]["text"], "Xin chao! Toi co the giup gi?");
        let msg_id = body["data"]["msg_id"].as_str().unwrap();
        assert!(msg_id.starts_with("bot_msg_"));
        assert_ne!(msg_id, "msg_1690000000000_k3j9x0a1b");
    }

    #[tokio::test]
    async fn test_missing_signature_is_rejected_with_401() {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(webhook_body("Xin chao")))
            .unwrap();

        let response = app(never_called()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "MISSING_SIGNATURE");
    }

    #[tokio::test]
    async fn test_tampered_body_is_rejected_without_calling_ai() {
        let body = webhook_body("Xin chao");
        let signature = zevent::sign(APP_ID, &body, TIMESTAMP, SECRET);
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("X-ZEvent-Signature", signature)
            .body(Body::from(body.replace("Xin chao", "Xin chau")))
            .unwrap();

        let response = app(never_called()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"], "INVALID_SIGNATURE");
    }

    #[tokio::test]
    async fn test_malformed_signature_is_rejected_with_403() {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("X-ZEvent-Signature", "not-a-signature")
            .body(Body::from(webhook_body("Xin chao")))
            .unwrap();

        let response = app(never_called()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_app_id_is_a_validation_error() {
        let body = json!({ "timestamp": TIMESTAMP }).to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("X-ZEvent-Signature", "sha256(00)")
            .body(Body::from(body))
            .unwrap();

        let response = app(never_called()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "Missing required field: app_id");
    }

    #[tokio::test]
    async fn test_signed_but_invalid_payload_reports_details() {
        let response = app(never_called())
            .oneshot(signed_request(webhook_body("   ")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(
            body["details"]["message.text"],
            "Message text cannot be empty"
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_with_413() {
        let body = webhook_body(&"a".repeat(signature::MAX_BODY_BYTES + 1));
        let response = app(never_called())
            .oneshot(signed_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_ai_failure_is_reported_as_bad_gateway() {
        let mut provider = MockProvider::new();
        provider.expect_generate_response().returning(|_| {
            Err(chatbot_ai::Error::Provider(
                "Gemini API service error".to_string(),
            ))
        });
        provider.expect_provider_id().return_const("mock".to_string());

        let response = app(provider)
            .oneshot(signed_request(webhook_body("Xin chao")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"], "AI_SERVICE_ERROR");
    }

    #[tokio::test]
    async fn test_ai_timeout_is_reported_as_gateway_timeout() {
        let mut provider = MockProvider::new();
        provider
            .expect_generate_response()
            .returning(|_| Err(chatbot_ai::Error::Timeout("slow".to_string())));
        provider.expect_provider_id().return_const("mock".to_string());

        let response = app(provider)
            .oneshot(signed_request(webhook_body("Xin chao")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json_body(response).await["error"], "AI_TIMEOUT");
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let router = app(never_called());

        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["service"], "chatbot-zalo-simulator");
        assert_eq!(body["environment"], "development");

        let response = router
            .oneshot(Request::get("/webhook/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["service"], "zalo-webhook");
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = app(never_called())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "NOT_FOUND");
        assert_eq!(body["message"], "Route GET /nope not found");
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/webhook")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app(never_called()).oneshot(request).await.unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_wrong_method_on_webhook_is_json_404() {
        let response = app(never_called())
            .oneshot(Request::get("/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "NOT_FOUND");
        assert_eq!(body["message"], "Route GET /webhook not found");
    }

    #[tokio::test]
    async fn test_wildcard_origin_allows_any_origin() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/webhook")
            .header("origin", "https://anywhere.example.com")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app_with_config(never_called(), config_with_origins("*"))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .is_none());
    }
}
