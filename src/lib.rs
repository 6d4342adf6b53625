//! Portal backend — library crate shared by the binary and integration tests.

pub mod api;
pub mod cli;
pub mod config;
pub mod csrf;
pub mod errors;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod proxy;

use csrf::TokenGuard;
use middleware::metrics::CsrfMetrics;
use middleware::session::SessionKeys;
use proxy::upstream::HealthClient;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub config: config::Config,
    pub csrf: TokenGuard,
    pub sessions: SessionKeys,
    pub health: HealthClient,
    pub metrics: CsrfMetrics,
}

impl AppState {
    pub fn new(config: config::Config) -> anyhow::Result<Self> {
        let csrf = TokenGuard::new(config.csrf_secret.as_bytes(), config.csrf_token_ttl)?;
        Self::with_guard(config, csrf)
    }

    /// Build state around a pre-made guard (tests inject a manual clock this way).
    pub fn with_guard(config: config::Config, csrf: TokenGuard) -> anyhow::Result<Self> {
        Ok(Self {
            sessions: SessionKeys::from_secret(config.session_secret.as_bytes()),
            health: HealthClient::new()?,
            metrics: CsrfMetrics::new()?,
            csrf,
            config,
        })
    }
}
