//! Zalo OA `user_send_text` webhooks: the signed payload, its validation, and the reply.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, RequestErrorKind};
use crate::message_id;
use chatbot_ai::traits::responder::Provider;
use chatbot_auth::webhook::{WebhookValidator, ZEventSignatureValidator};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service::config::Config;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use utoipa::ToSchema;

pub use chatbot_auth::webhook::SIGNATURE_HEADER;

/// Longest accepted message text, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

const REQUIRED_STRING: &str = "Field is required and must be a string";
const REQUIRED_OBJECT: &str = "Field is required and must be an object";

/// Webhook events this service answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EventName {
    #[serde(rename = "user_send_text")]
    UserSendText,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::UserSendText => "user_send_text",
        }
    }
}

/// A conversation participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Party {
    pub id: String,
}

/// The user's message as carried by the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InboundMessage {
    pub text: String,
    pub msg_id: String,
}

/// The signed webhook body.
///
/// Field order is the wire order: serializing this struct yields
/// `app_id, sender, recipient, event_name, message, timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookPayload {
    pub app_id: String,
    pub sender: Party,
    pub recipient: Party,
    pub event_name: EventName,
    pub message: InboundMessage,
    /// Unix time in milliseconds, as decimal text.
    pub timestamp: String,
}

impl WebhookPayload {
    /// Build a `user_send_text` payload stamped with the current time and a fresh message id.
    pub fn user_text(app_id: &str, sender_id: &str, recipient_id: &str, text: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            sender: Party {
                id: sender_id.to_string(),
            },
            recipient: Party {
                id: recipient_id.to_string(),
            },
            event_name: EventName::UserSendText,
            message: InboundMessage {
                text: text.to_string(),
                msg_id: message_id::user(),
            },
            timestamp: chrono::Utc::now().timestamp_millis().to_string(),
        }
    }

    /// The exact body text to sign and transmit.
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse and validate a request body in one pass, reporting every bad field.
    pub fn parse(body: &[u8]) -> Result<Self, FieldErrors> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| FieldErrors::single("body", "Request body must be a JSON object"))?;
        let Some(object) = value.as_object() else {
            return Err(FieldErrors::single(
                "body",
                "Request body must be a JSON object",
            ));
        };

        let mut errors = FieldErrors::default();

        let app_id = required_string(object, "app_id", "app_id", &mut errors);
        let sender_id = party_id(object, "sender", &mut errors);
        let recipient_id = party_id(object, "recipient", &mut errors);
        let event_name = event_name(object, &mut errors);
        let message = inbound_message(object, &mut errors);
        let timestamp = required_string(object, "timestamp", "timestamp", &mut errors);

        match (app_id, sender_id, recipient_id, event_name, message, timestamp) {
            (
                Some(app_id),
                Some(sender_id),
                Some(recipient_id),
                Some(event_name),
                Some(message),
                Some(timestamp),
            ) if errors.is_empty() => Ok(Self {
                app_id,
                sender: Party { id: sender_id },
                recipient: Party { id: recipient_id },
                event_name,
                message,
                timestamp,
            }),
            _ => Err(errors),
        }
    }
}

/// Field-level validation failures keyed by dotted field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn single(field: &str, reason: &str) -> Self {
        let mut errors = Self::default();
        errors.add(field, reason);
        errors
    }

    pub fn add(&mut self, field: &str, reason: &str) {
        self.0.insert(field.to_string(), reason.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

fn required_string(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match object.get(key).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => {
            errors.add(path, REQUIRED_STRING);
            None
        }
    }
}

fn required_object<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    errors: &mut FieldErrors,
) -> Option<&'a Map<String, Value>> {
    let nested = object.get(key).and_then(Value::as_object);
    if nested.is_none() {
        errors.add(key, REQUIRED_OBJECT);
    }
    nested
}

fn party_id(object: &Map<String, Value>, key: &str, errors: &mut FieldErrors) -> Option<String> {
    let party = required_object(object, key, errors)?;
    required_string(party, "id", &format!("{}.id", key), errors)
}

fn event_name(object: &Map<String, Value>, errors: &mut FieldErrors) -> Option<EventName> {
    let name = required_string(object, "event_name", "event_name", errors)?;
    if name == EventName::UserSendText.as_str() {
        Some(EventName::UserSendText)
    } else {
        errors.add(
            "event_name",
            &format!(
                "Must be \"{}\", got \"{}\"",
                EventName::UserSendText.as_str(),
                name
            ),
        );
        None
    }
}

fn inbound_message(
    object: &Map<String, Value>,
    errors: &mut FieldErrors,
) -> Option<InboundMessage> {
    let message = required_object(object, "message", errors)?;
    let text = required_string(message, "text", "message.text", errors);
    let msg_id = required_string(message, "msg_id", "message.msg_id", errors);

    let text = text.filter(|text| {
        if text.trim().is_empty() {
            errors.add("message.text", "Message text cannot be empty");
            false
        } else if text.chars().count() > MAX_MESSAGE_LENGTH {
            errors.add(
                "message.text",
                &format!("Message text exceeds {} characters", MAX_MESSAGE_LENGTH),
            );
            false
        } else {
            true
        }
    });

    Some(InboundMessage {
        text: text?,
        msg_id: msg_id?,
    })
}

/// Body of a successful webhook response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplyEnvelope {
    pub success: bool,
    pub data: ReplyData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplyData {
    pub msg_id: String,
    pub recipient_id: String,
    pub message: OutboundMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OutboundMessage {
    pub text: String,
}

impl ReplyEnvelope {
    pub fn new(msg_id: String, recipient_id: String, text: String) -> Self {
        Self {
            success: true,
            data: ReplyData {
                msg_id,
                recipient_id,
                message: OutboundMessage { text },
            },
        }
    }
}

/// Provider id reported by the webhook validator.
pub const VALIDATOR_ID: &str = "zalo_oa";

/// Build the validator for inbound webhooks from the OA secret and the optional replay window.
pub fn signature_validator(config: &Config) -> Result<ZEventSignatureValidator, Error> {
    let secret = config
        .oa_secret_key()
        .ok_or_else(|| Error::config("OA_SECRET_KEY is not configured"))?;

    let validator = ZEventSignatureValidator::new(
        VALIDATOR_ID.to_string(),
        secret,
        SIGNATURE_HEADER.to_string(),
    );

    Ok(match config.webhook_max_age() {
        Some(max_age) => {
            info!("Rejecting webhooks older than {:?}", max_age);
            validator.with_max_age(max_age)
        }
        None => validator,
    })
}

/// Check the request's signature before anything else looks at the body.
///
/// A wrong or malformed signature is reported as `InvalidSignature` without saying which.
pub fn authenticate(
    validator: &dyn WebhookValidator,
    headers: &HashMap<String, String>,
    body: &[u8],
) -> Result<(), Error> {
    if validator.validate(headers, body)? {
        Ok(())
    } else {
        Err(Error::request(RequestErrorKind::InvalidSignature))
    }
}

/// Parse a signed body into a payload, mapping field failures to a request error.
pub fn parse_payload(body: &[u8]) -> Result<WebhookPayload, Error> {
    WebhookPayload::parse(body).map_err(|errors| Error::request(RequestErrorKind::Invalid(errors)))
}

/// Ask the AI provider for a reply to the payload's text, waiting at most `timeout`.
///
/// The reply is addressed back to the sender and carries a new `bot_msg_` id.
pub async fn reply(
    provider: &dyn Provider,
    payload: &WebhookPayload,
    timeout: Duration,
) -> Result<ReplyEnvelope, Error> {
    let user_message = payload.message.text.trim();
    debug!(
        "Generating {} reply for msg_id {} from {}",
        provider.provider_id(),
        payload.message.msg_id,
        payload.sender.id
    );

    let text = match tokio::time::timeout(timeout, provider.generate_response(user_message)).await
    {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("AI generation failed for {}: {}", payload.message.msg_id, e);
            return Err(e.into());
        }
        Err(_) => {
            warn!(
                "AI generation for {} abandoned after {:?}",
                payload.message.msg_id, timeout
            );
            return Err(Error {
                source: Some(format!("AI request timed out after {:?}", timeout).into()),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Timeout),
            });
        }
    };

    let mut msg_id = message_id::bot();
    while msg_id == payload.message.msg_id {
        msg_id = message_id::bot();
    }

    info!(
        "Replying to {} with {} ({} chars)",
        payload.sender.id,
        msg_id,
        text.chars().count()
    );
    Ok(ReplyEnvelope::new(msg_id, payload.sender.id.clone(), text))
}
