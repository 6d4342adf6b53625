use std::fmt;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::csrf::{DEFAULT_TOKEN_TTL, MAX_TOKEN_TTL};

/// Secrets shorter than this still load, but with a warning.
const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_HEALTH_PERMISSION: &str = "zz-addev-role-admin";

pub struct Config {
    pub port: u16,
    /// HMAC key for CSRF token signatures. Required.
    pub csrf_secret: Zeroizing<String>,
    /// HS256 key used to verify session JWTs. Required.
    pub session_secret: Zeroizing<String>,
    pub csrf_token_ttl: Duration,
    /// How often expired CSRF records are swept from memory.
    pub csrf_sweep_interval: Duration,
    /// Base URL of the external system queried by `/api/gcr-health`.
    pub gcr_system_url: Option<String>,
    pub gcr_system_key: Option<Zeroizing<String>>,
    /// Permission a session must carry to call `/api/gcr-health`.
    pub health_permission: String,
    pub dashboard_origin: String,
    /// Also accept any `http://localhost:*` / `http://127.0.0.1:*` origin. Development only.
    pub cors_allow_localhost: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("csrf_secret", &"<redacted>")
            .field("session_secret", &"<redacted>")
            .field("csrf_token_ttl", &self.csrf_token_ttl)
            .field("csrf_sweep_interval", &self.csrf_sweep_interval)
            .field("gcr_system_url", &self.gcr_system_url)
            .field("gcr_system_key", &self.gcr_system_key.as_ref().map(|_| "<redacted>"))
            .field("health_permission", &self.health_permission)
            .field("dashboard_origin", &self.dashboard_origin)
            .field("cors_allow_localhost", &self.cors_allow_localhost)
            .finish()
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from an arbitrary key lookup (the process env in production).
pub fn from_lookup<F>(get: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let csrf_secret = required_secret(&get, "CSRF_SECRET")?;
    let session_secret = required_secret(&get, "PORTAL_SESSION_SECRET")?;

    let gcr_system_url = get("GCR_SYSTEM").filter(|s| !s.trim().is_empty());
    if let Some(raw) = &gcr_system_url {
        if let Err(e) = url::Url::parse(raw) {
            tracing::warn!(url = %raw, "GCR_SYSTEM is not a valid URL: {}", e);
        }
    }

    Ok(Config {
        port: get("PORTAL_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000),
        csrf_secret,
        session_secret,
        csrf_token_ttl: token_ttl(get("CSRF_TOKEN_TTL_SECS")),
        csrf_sweep_interval: Duration::from_secs(
            get("CSRF_SWEEP_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(300),
        ),
        gcr_system_url,
        gcr_system_key: get("GCR_SYSTEM_KEY")
            .filter(|s| !s.is_empty())
            .map(Zeroizing::new),
        health_permission: get("GCR_HEALTH_PERMISSION")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HEALTH_PERMISSION.to_string()),
        dashboard_origin: get("DASHBOARD_ORIGIN")
            .unwrap_or_else(|| "http://localhost:3000".to_string()),
        cors_allow_localhost: get("CORS_ALLOW_LOCALHOST")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false),
    })
}

fn token_ttl(raw: Option<String>) -> Duration {
    let secs: u64 = raw
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TOKEN_TTL.as_secs());

    if secs > MAX_TOKEN_TTL.as_secs() {
        tracing::warn!(
            requested_secs = secs,
            max_secs = MAX_TOKEN_TTL.as_secs(),
            "CSRF_TOKEN_TTL_SECS exceeds the maximum; clamping"
        );
        return MAX_TOKEN_TTL;
    }
    Duration::from_secs(secs)
}

fn required_secret<F>(get: &F, key: &str) -> anyhow::Result<Zeroizing<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let value = get(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} is not set; refusing to start without it", key))?;

    if value.len() < MIN_SECRET_LEN {
        tracing::warn!(
            "{} is shorter than {} bytes; use a longer random value in production",
            key,
            MIN_SECRET_LEN
        );
    }
    Ok(Zeroizing::new(value))
}
