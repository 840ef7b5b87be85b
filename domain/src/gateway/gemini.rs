//! Google Gemini client for chatbot replies.
//!
//! Talks to the `generateContent` REST endpoint directly. The API key travels in the
//! `x-goog-api-key` header attached by the authenticated client, never in the URL.

use async_trait::async_trait;
use chatbot_ai::traits::responder::Provider;
use chatbot_ai::types::conversation::render_transcript;
use chatbot_ai::{Error, Turn};
use chatbot_auth::api_key::{ApiKeyAuth, ApiKeyProvider};
use chatbot_auth::http::{AuthenticatedClient, AuthenticatedClientBuilder};
use log::*;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service::config::{Config, PLACEHOLDER_GEMINI_API_KEY};

/// Instructions prepended to every prompt.
pub const SYSTEM_PROMPT: &str = "You are a helpful and friendly AI assistant for a Zalo Official Account chatbot simulator.
Keep your responses concise, helpful, and conversational.
Respond in Vietnamese by default unless the user writes in another language.
If you don't understand something, ask for clarification politely.";

const PROVIDER_ID: &str = "gemini";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts joined, trimmed.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: AuthenticatedClient,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Build a client from the server configuration.
    ///
    /// A missing, empty or placeholder API key is rejected here so a misconfigured
    /// server fails at startup rather than on the first webhook.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let api_key = config.gemini_api_key().ok_or_else(|| {
            Error::Configuration("GEMINI_API_KEY is not configured".to_string())
        })?;
        if api_key.expose_secret().trim() == PLACEHOLDER_GEMINI_API_KEY {
            return Err(Error::Configuration(
                "GEMINI_API_KEY is not configured. Please set a valid API key".to_string(),
            ));
        }

        let auth = ApiKeyAuth::new(ApiKeyProvider::Gemini, api_key)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        let client = AuthenticatedClientBuilder::new()
            .with_auth(Box::new(auth))
            .with_timeout(config.ai_request_timeout())
            .with_max_retries(config.ai_max_retries)
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.gemini_base_url().trim_end_matches('/').to_string(),
            model: config.gemini_model().to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, Error> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!("Calling Gemini model {}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            return Err(map_status(status, retry_after));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Gemini response: {:?}", e);
            Error::Provider("Invalid response from Gemini API".to_string())
        })?;

        let text = body.text();
        if text.is_empty() {
            return Err(Error::Provider("Empty response from Gemini API".to_string()));
        }
        Ok(text)
    }
}

fn single_turn_prompt(user_message: &str) -> String {
    format!("{}\n\nUser: {}\n\nAssistant:", SYSTEM_PROMPT, user_message)
}

fn context_prompt(history: &[Turn], user_message: &str) -> String {
    format!(
        "{}\n\n{}\nUser: {}\n\nAssistant:",
        SYSTEM_PROMPT,
        render_transcript(history),
        user_message
    )
}

fn map_status(status: StatusCode, retry_after: Option<u64>) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Authentication("Invalid Gemini API key".to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited {
            retry_after_seconds: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        s if s.is_server_error() => Error::Provider("Gemini API service error".to_string()),
        s => Error::Provider(format!("Gemini API returned status {}", s.as_u16())),
    }
}

fn map_send_error(err: reqwest_middleware::Error) -> Error {
    match err {
        reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => {
            Error::Timeout("Gemini API request timeout".to_string())
        }
        reqwest_middleware::Error::Reqwest(e) => {
            warn!("Gemini request failed: {:?}", e);
            Error::Network(e.to_string())
        }
        reqwest_middleware::Error::Middleware(e) => Error::Network(e.to_string()),
    }
}

#[async_trait]
impl Provider for GeminiClient {
    async fn generate_response(&self, user_message: &str) -> Result<String, Error> {
        if user_message.trim().is_empty() {
            return Err(Error::InvalidInput("Message text cannot be empty".to_string()));
        }
        self.generate_content(&single_turn_prompt(user_message))
            .await
    }

    async fn generate_response_with_context(
        &self,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String, Error> {
        match self
            .generate_content(&context_prompt(history, user_message))
            .await
        {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!("Context generation failed, retrying without history: {}", e);
                self.generate_response(user_message).await
            }
        }
    }

    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn verify_credentials(&self) -> Result<bool, Error> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let response = self.client.get(&url).send().await.map_err(map_send_error)?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            s => Err(map_status(s, None)),
        }
    }
}
