use log::*;
use tokio::net::TcpListener;
use tokio::signal;

pub use self::error::{Error, Result};
pub use service::AppState;

mod controller;
mod error;
mod middleware;
pub mod router;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{}:{}", interface, app_state.config.port);
    let listener = TcpListener::bind(&server_url).await?;

    info!(
        "Server starting... listening for connections on http://{} ({} environment)",
        server_url,
        app_state.config.runtime_env()
    );
    info!(
        "Webhook endpoint: POST http://{}/webhook, AI model: {}",
        server_url,
        app_state.config.gemini_model()
    );

    let router = router::define_routes(app_state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
