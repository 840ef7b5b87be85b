use chatbot_ai::traits::responder::Provider;
use domain::gateway::gemini::GeminiClient;
use domain::webhook;
use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file and ensure all required variables are set.");
        process::exit(1);
    }

    let gemini = match GeminiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Gemini client: {}", e);
            process::exit(1);
        }
    };

    match gemini.verify_credentials().await {
        Ok(true) => info!("Gemini credentials accepted for model {}", gemini.model()),
        Ok(false) => warn!("Gemini rejected the configured API key; replies will fail"),
        Err(e) => warn!("Could not verify Gemini credentials: {}", e),
    }

    let validator = match webhook::signature_validator(&config) {
        Ok(validator) => validator,
        Err(e) => {
            error!("Failed to create webhook validator: {}", e);
            process::exit(1);
        }
    };

    let app_state = AppState::new(config, Arc::new(gemini), Arc::new(validator));

    if let Err(e) = web::init_server(app_state).await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}
