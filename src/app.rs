/*
 * Responsibility
 * - Config -> dependencies -> Router
 * - Middleware wiring (path auth gate, HTTP layers)
 * - axum::serve()
 */
use anyhow::Result;
use axum::{
    Router,
    http::{Method, request::Parts},
};
use tracing_subscriber::EnvFilter;

use crate::api;
use crate::api::v1::handlers::fallback::not_found;
use crate::config::Config;
use crate::middleware::{
    self,
    path_auth::{PathAuth, PathAuthConfig, PathAuthConfigError},
};
use crate::services::api_keys::ApiKeyStore;
use crate::state::AppState;

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let api_keys = ApiKeyStore::new(config.api_keys.iter().cloned());
    if api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty; key-protected routes will reject every request");
    }

    let gate = build_gate(&config, api_keys.clone())?;
    let state = AppState::new(api_keys);
    let app = middleware::http::apply(build_router(state, gate), &config);

    tracing::info!(addr = %config.addr, env = ?config.app_env, "listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Gate for `{PATH_AUTH_PARAM}` backed by the API key store. Preflight
/// requests bypass it.
pub fn build_gate(config: &Config, api_keys: ApiKeyStore) -> Result<PathAuth, PathAuthConfigError> {
    PathAuth::with_config(
        PathAuthConfig::new(config.path_auth_param.as_str())
            .validator(api_keys)
            .skipper(|parts: &Parts| parts.method == Method::OPTIONS),
    )
}

pub fn build_router(state: AppState, gate: PathAuth) -> Router {
    Router::new()
        .nest("/api/v1", api::v1::routes(gate))
        .fallback(not_found)
        .with_state(state)
}
