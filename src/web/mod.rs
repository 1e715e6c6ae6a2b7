//! Web server module
//!
//! A rewriting reverse proxy: requests are forwarded to the backend and the
//! responses pass through the rewrite engine on their way back.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use config::*;
pub use routes::*;
pub use types::*;

use crate::core::{ProxyError, ProxyManager};
use crate::response::ResponsePolicy;

pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    pub fn new(config: WebConfig, manager: ProxyManager) -> Result<Self, ProxyError> {
        config.validate()?;

        let policy = ResponsePolicy::new(manager.config())?;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let state = AppState::new(
            manager,
            policy,
            client,
            &config.upstream,
            config.max_body_size,
        );

        Ok(Self { config, state })
    }

    pub async fn start(&self) -> Result<(), ProxyError> {
        let app = create_routes(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.config.listen_address()).await?;

        tracing::info!(
            address = %self.config.listen_address(),
            upstream = %self.config.upstream,
            active = self.state.manager.is_active(),
            "Web server starting"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
