use chatbot_auth::webhook::signature;
use domain::webhook::{ReplyEnvelope, WebhookPayload, MAX_MESSAGE_LENGTH, SIGNATURE_HEADER};
use log::*;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Who the client speaks as, and the key it signs with.
#[derive(Debug, Clone)]
pub struct Identity {
    pub app_id: String,
    pub user_id: String,
    pub oa_id: String,
    pub secret_key: String,
}

#[derive(Debug)]
pub enum SendError {
    EmptyMessage,
    MessageTooLong,
    /// The payload could not be serialized before signing.
    Encode(String),
    /// The server answered 400; carries its message when it sent one.
    Rejected(String),
    MissingSignature,
    InvalidSignature,
    Server(Option<String>),
    InvalidResponse,
    Timeout,
    Network(String),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::EmptyMessage => write!(f, "Please enter a message"),
            SendError::MessageTooLong => write!(
                f,
                "Message is too long (at most {} characters)",
                MAX_MESSAGE_LENGTH
            ),
            SendError::Encode(message) => write!(f, "Could not encode the message: {}", message),
            SendError::Rejected(message) => write!(f, "{}", message),
            SendError::MissingSignature => write!(f, "Signature header is missing"),
            SendError::InvalidSignature => write!(f, "Signature is not valid"),
            SendError::Server(Some(message)) => write!(f, "Server error: {}", message),
            SendError::Server(None) => write!(f, "Server error, please try again later"),
            SendError::InvalidResponse => write!(f, "Server sent an invalid response"),
            SendError::Timeout => write!(f, "Request timed out, please try again"),
            SendError::Network(message) => write!(f, "Could not reach the server: {}", message),
        }
    }
}

impl std::error::Error for SendError {}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
}

/// Sends signed `user_send_text` webhooks the way the Zalo platform would.
pub struct WebhookClient {
    client: Client,
    webhook_url: String,
    identity: Identity,
}

impl WebhookClient {
    pub fn new(
        webhook_url: String,
        identity: Identity,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            webhook_url,
            identity,
        })
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// Sign and send one message, returning the bot's reply.
    pub async fn send(&self, text: &str) -> Result<ReplyEnvelope, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::EmptyMessage);
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(SendError::MessageTooLong);
        }

        let payload = WebhookPayload::user_text(
            &self.identity.app_id,
            &self.identity.user_id,
            &self.identity.oa_id,
            text,
        );
        // The signature covers these exact bytes, so the body is serialized once.
        let body = payload.to_body().map_err(encode_error)?;
        let signature = signature::sign(
            &payload.app_id,
            &body,
            &payload.timestamp,
            &self.identity.secret_key,
        );

        debug!("POST {} msg_id={}", self.webhook_url, payload.message.msg_id);

        let response = self
            .client
            .post(&self.webhook_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .ok()
                .and_then(|envelope| envelope.message);
            debug!("Server answered {}: {:?}", status, message);
            return Err(status_error(status, message));
        }

        let envelope: ReplyEnvelope =
            serde_json::from_slice(&bytes).map_err(|_| SendError::InvalidResponse)?;
        if !envelope.success || envelope.data.message.text.is_empty() {
            return Err(SendError::InvalidResponse);
        }
        Ok(envelope)
    }

    /// Whether the server's `/health` endpoint answers successfully within five seconds.
    pub async fn health(&self) -> bool {
        let url = health_url(&self.webhook_url);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Health check of {} failed: {}", url, e);
                false
            }
        }
    }
}

fn status_error(status: StatusCode, message: Option<String>) -> SendError {
    match status {
        StatusCode::BAD_REQUEST => {
            SendError::Rejected(message.unwrap_or_else(|| SendError::InvalidResponse.to_string()))
        }
        StatusCode::UNAUTHORIZED => SendError::MissingSignature,
        StatusCode::FORBIDDEN => SendError::InvalidSignature,
        StatusCode::INTERNAL_SERVER_ERROR => SendError::Server(None),
        _ => SendError::Server(message),
    }
}

fn encode_error(err: serde_json::Error) -> SendError {
    SendError::Encode(err.to_string())
}

fn transport_error(err: reqwest::Error) -> SendError {
    if err.is_timeout() {
        SendError::Timeout
    } else {
        SendError::Network(err.to_string())
    }
}

fn health_url(webhook_url: &str) -> String {
    let base = webhook_url.trim_end_matches('/');
    match base.strip_suffix("/webhook") {
        Some(root) => format!("{}/health", root),
        None => format!("{}/health", base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn identity() -> Identity {
        Identity {
            app_id: "demo_app_id".to_string(),
            user_id: "demo_user_123".to_string(),
            oa_id: "demo_oa_987".to_string(),
            secret_key: "demo_secret".to_string(),
        }
    }

    async fn client_with_server() -> (ServerGuard, WebhookClient) {
        let server = Server::new_async().await;
        let client = WebhookClient::new(
            format!("{}/webhook", server.url()),
            identity(),
            Duration::from_secs(5),
        )
        .unwrap();
        (server, client)
    }

    fn reply() -> String {
        json!({
            "success": true,
            "data": {
                "msg_id": "bot_msg_1690000000001_abcdefghi",
                "recipient_id": "demo_user_123",
                "message": { "text": "Chao ban!" }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_send_signs_the_exact_body() {
        let (mut server, client) = client_with_server().await;
        let mock = server
            .mock("POST", "/webhook")
            .match_header("content-type", "application/json")
            .match_header(SIGNATURE_HEADER, Matcher::Regex(r"^sha256\([0-9a-f]{64}\)$".to_string()))
            .match_body(Matcher::PartialJson(json!({
                "app_id": "demo_app_id",
                "sender": { "id": "demo_user_123" },
                "recipient": { "id": "demo_oa_987" },
                "event_name": "user_send_text",
                "message": { "text": "Xin chao" }
            })))
            .with_status(200)
            .with_body(reply())
            .create_async()
            .await;

        let envelope = client.send("  Xin chao ").await.unwrap();

        assert_eq!(envelope.data.message.text, "Chao ban!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_and_long_messages_are_rejected_locally() {
        let (mut server, client) = client_with_server().await;
        let mock = server
            .mock("POST", "/webhook")
            .expect(0)
            .create_async()
            .await;

        assert!(matches!(
            client.send("   ").await,
            Err(SendError::EmptyMessage)
        ));
        assert!(matches!(
            client.send(&"a".repeat(MAX_MESSAGE_LENGTH + 1)).await,
            Err(SendError::MessageTooLong)
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_statuses_are_mapped() {
        let (mut server, client) = client_with_server().await;
        server
            .mock("POST", "/webhook")
            .with_status(400)
            .with_body(r#"{"success":false,"error":"VALIDATION_ERROR","message":"Invalid webhook payload"}"#)
            .create_async()
            .await;

        match client.send("hi").await {
            Err(SendError::Rejected(message)) => assert_eq!(message, "Invalid webhook payload"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_invalid_signature() {
        let (mut server, client) = client_with_server().await;
        server
            .mock("POST", "/webhook")
            .with_status(403)
            .with_body(r#"{"success":false,"error":"INVALID_SIGNATURE"}"#)
            .create_async()
            .await;

        assert!(matches!(
            client.send("hi").await,
            Err(SendError::InvalidSignature)
        ));
    }

    #[test]
    fn test_serialization_failure_is_a_client_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let send_error = encode_error(err);

        assert!(matches!(send_error, SendError::Encode(_)));
        assert!(send_error
            .to_string()
            .starts_with("Could not encode the message"));
    }

    #[tokio::test]
    async fn test_envelope_without_text_is_invalid() {
        let (mut server, client) = client_with_server().await;
        server
            .mock("POST", "/webhook")
            .with_status(200)
            .with_body(r#"{"success":true,"data":{}}"#)
            .create_async()
            .await;

        assert!(matches!(
            client.send("hi").await,
            Err(SendError::InvalidResponse)
        ));
    }

    #[tokio::test]
    async fn test_health_probes_sibling_endpoint() {
        let (mut server, client) = client_with_server().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        assert!(client.health().await);
        mock.assert_async().await;
    }

    #[test]
    fn test_health_url() {
        assert_eq!(
            health_url("http://localhost:3001/webhook"),
            "http://localhost:3001/health"
        );
        assert_eq!(
            health_url("http://localhost:3001/"),
            "http://localhost:3001/health"
        );
    }
}
