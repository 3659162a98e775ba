use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Extension, Router, routing::get};
use reqwest::Client;

use crate::{api, config::Config, info, management::SessionManager};

/// Shared by every handler through an `Extension` layer.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionManager,
    pub http: Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        let sessions = SessionManager::new(config.session_secret.clone());
        Ok(AppState {
            config,
            sessions,
            http,
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/callback", get(api::callback))
        .route("/recommendations", get(api::recommendations))
        .route("/refresh-token", get(api::refresh_token))
        .route("/health", get(api::health))
        .layer(Extension(state))
}

pub async fn start_api_server(state: Arc<AppState>) -> crate::Res<()> {
    let addr = SocketAddr::from_str(&state.config.server_addr())
        .map_err(|e| format!("Failed to parse server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
