use chatbot_ai::traits::responder::Provider;
use chatbot_auth::webhook::WebhookValidator;
use config::Config;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state: configuration plus the collaborators each request needs.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ai_provider: Arc<dyn Provider>,
    pub webhook_validator: Arc<dyn WebhookValidator>,
}

impl AppState {
    pub fn new(
        app_config: Config,
        ai_provider: Arc<dyn Provider>,
        webhook_validator: Arc<dyn WebhookValidator>,
    ) -> Self {
        Self {
            config: app_config,
            ai_provider,
            webhook_validator,
        }
    }

    pub fn ai_provider_ref(&self) -> &dyn Provider {
        self.ai_provider.as_ref()
    }

    pub fn webhook_validator_ref(&self) -> &dyn WebhookValidator {
        self.webhook_validator.as_ref()
    }
}
