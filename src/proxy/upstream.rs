/// HTTP client for the external system's health endpoint.
/// Uses reqwest-middleware to retry requests that never reached the upstream.
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    default_on_request_failure, policies::ExponentialBackoff, RetryTransientMiddleware,
    Retryable, RetryableStrategy,
};
use std::time::Duration;

use crate::errors::AppError;

/// Upstream reply relayed to the caller as-is.
#[derive(Debug)]
pub struct HealthReply {
    pub status: reqwest::StatusCode,
    pub body: serde_json::Value,
}

/// Retry connection failures only. Any upstream reply, 5xx included, is the
/// health answer and gets relayed after a single fetch.
struct ConnectFailuresOnly;

impl RetryableStrategy for ConnectFailuresOnly {
    fn handle(
        &self,
        res: &Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        match res {
            Ok(_) => None,
            Err(e) => default_on_request_failure(e),
        }
    }
}

pub struct HealthClient {
    client: ClientWithMiddleware,
}

impl HealthClient {
    pub fn new() -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);

        let client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                ConnectFailuresOnly,
            ))
            .build();

        Ok(Self { client })
    }

    /// GET `{base_url}/health` with the system key as a bearer token.
    pub async fn check(&self, base_url: &str, key: &str) -> Result<HealthReply, AppError> {
        let url = format!("{}/health", base_url.trim_end_matches('/'));

        let resp = self
            .client
            .get(&url)
            .bearer_auth(key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, "health request failed after retries: {}", e);
                AppError::UpstreamUnreachable(e.to_string())
            })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| {
            AppError::UpstreamUnreachable(format!("failed reading health response: {}", e))
        })?;
        let body = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(url = %url, status = %status, "health response is not JSON");
            AppError::Upstream(e.to_string())
        })?;

        tracing::debug!(url = %url, status = %status, "health check relayed");
        Ok(HealthReply { status, body })
    }
}
