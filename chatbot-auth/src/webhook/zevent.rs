//! ZEvent webhook validator for Zalo OA style requests.

use std::collections::HashMap;
use std::time::Duration;

use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::signature;
use super::WebhookValidator;
use crate::error::{webhook_error, Error, WebhookErrorKind};

/// Validator for the `X-ZEvent-Signature` header.
///
/// Pulls `app_id` and `timestamp` out of the JSON body and verifies the signature over
/// the raw body text. A replay window can be enabled with [`with_max_age`](Self::with_max_age);
/// without it a captured request stays valid forever, matching the platform's behavior.
pub struct ZEventSignatureValidator {
    provider_id: String,
    secret: SecretString,
    signature_header: String,
    max_age: Option<Duration>,
}

impl ZEventSignatureValidator {
    /// Create a new ZEvent signature validator.
    ///
    /// # Arguments
    ///
    /// * `provider_id` - Provider identifier
    /// * `secret` - OA secret key shared with the signer
    /// * `signature_header` - Name of the header containing the signature
    pub fn new(provider_id: String, secret: SecretString, signature_header: String) -> Self {
        Self {
            provider_id,
            secret,
            signature_header,
            max_age: None,
        }
    }

    /// Reject validly signed requests whose timestamp is further than `max_age` from now.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    fn find_signature<'a>(&self, headers: &'a HashMap<String, String>) -> Option<&'a str> {
        headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&self.signature_header))
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    fn check_freshness(&self, timestamp: &str, now_millis: i64) -> Result<(), Error> {
        let Some(max_age) = self.max_age else {
            return Ok(());
        };

        let sent_millis: i64 = timestamp.parse().map_err(|_| {
            webhook_error(
                WebhookErrorKind::TimestampExpired,
                "Timestamp is not an integer millisecond value",
            )
        })?;

        let age_millis = now_millis.abs_diff(sent_millis);
        if u128::from(age_millis) > max_age.as_millis() {
            return Err(webhook_error(
                WebhookErrorKind::TimestampExpired,
                &format!("Timestamp is {}ms away from server time", age_millis),
            ));
        }

        Ok(())
    }
}

/// Read a required non-empty string field from the top level of the body.
fn required_field<'a>(body: &'a Value, field: &str) -> Result<&'a str, Error> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            webhook_error(
                WebhookErrorKind::InvalidPayload,
                &format!("Missing required field: {}", field),
            )
        })
}

impl WebhookValidator for ZEventSignatureValidator {
    fn validate(&self, headers: &HashMap<String, String>, body: &[u8]) -> Result<bool, Error> {
        let signature = self.find_signature(headers).ok_or_else(|| {
            webhook_error(
                WebhookErrorKind::MissingSignature,
                &format!("{} header is required", self.signature_header),
            )
        })?;

        // The signature covers the body text exactly as received.
        let data = std::str::from_utf8(body).map_err(|_| {
            webhook_error(
                WebhookErrorKind::InvalidPayload,
                "Request body must be UTF-8 encoded JSON",
            )
        })?;

        let parsed: Value = serde_json::from_str(data).map_err(|_| {
            webhook_error(
                WebhookErrorKind::InvalidPayload,
                "Request body must be valid JSON",
            )
        })?;

        let app_id = required_field(&parsed, "app_id")?;
        let timestamp = required_field(&parsed, "timestamp")?;

        if !signature::verify(
            signature,
            app_id,
            data,
            timestamp,
            self.secret.expose_secret(),
        ) {
            debug!("ZEvent signature mismatch for app_id {}", app_id);
            return Ok(false);
        }

        self.check_freshness(timestamp, chrono::Utc::now().timestamp_millis())?;

        Ok(true)
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }
}
