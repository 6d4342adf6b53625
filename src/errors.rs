use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid csrf token")]
    InvalidCsrfToken,

    #[error("missing required fields")]
    MissingFields,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0} environment variable is not configured")]
    NotConfigured(&'static str),

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg, details) = match &self {
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
                None,
            ),
            AppError::Forbidden(reason) => (
                StatusCode::FORBIDDEN,
                "Forbidden".to_string(),
                Some(reason.clone()),
            ),
            AppError::InvalidCsrfToken => (
                StatusCode::FORBIDDEN,
                "Invalid CSRF token".to_string(),
                None,
            ),
            AppError::MissingFields => (
                StatusCode::BAD_REQUEST,
                "Missing required fields".to_string(),
                None,
            ),
            AppError::InvalidBody(reason) => (
                StatusCode::BAD_REQUEST,
                "Invalid request body".to_string(),
                Some(reason.clone()),
            ),
            AppError::NotConfigured(var) => {
                tracing::error!("{} is not configured", var);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{} environment variable is not configured", var),
                    None,
                )
            }
            AppError::UpstreamUnreachable(e) => {
                tracing::warn!("upstream unreachable: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Failed to connect to GCR system".to_string(),
                    Some("Network error or invalid URL".to_string()),
                )
            }
            AppError::Upstream(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(e.clone()),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = match details {
            Some(details) => json!({ "error": msg, "details": details }),
            None => json!({ "error": msg }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_csrf_rejection_is_403() {
        let (status, body) = body_of(AppError::InvalidCsrfToken).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Invalid CSRF token");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_503_with_details() {
        let (status, body) = body_of(AppError::UpstreamUnreachable("refused".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Failed to connect to GCR system");
        assert_eq!(body["details"], "Network error or invalid URL");
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let (status, body) = body_of(AppError::Internal(anyhow::anyhow!("db password leaked"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn test_not_configured_names_variable() {
        let (status, body) = body_of(AppError::NotConfigured("GCR_SYSTEM_KEY")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "GCR_SYSTEM_KEY environment variable is not configured"
        );
    }
}
