use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::errors::AppError;
use crate::middleware::rbac;
use crate::middleware::session::Session;
use crate::models::contact::{ContactReceipt, ContactSubmission, CsrfTokenResponse};
use crate::AppState;

/// GET /api/csrf-token — issue a one-time token for the caller.
pub async fn issue_csrf_token(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Json<CsrfTokenResponse> {
    let csrf_token = state.csrf.issue(session.principal_id());
    state.metrics.record_issued(state.csrf.len());
    Json(CsrfTokenResponse { csrf_token })
}

/// POST /api/contact — CSRF-protected contact form submission.
///
/// The token is checked before the form fields, so a rejected form still
/// consumes a valid token and the client must fetch a new one.
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<Json<ContactReceipt>, AppError> {
    let Json(submission) = payload.map_err(|e| AppError::InvalidBody(e.body_text()))?;
    let principal = session.principal_id();

    let outcome = match submission.csrf_token.as_deref() {
        Some(token) if !token.is_empty() => state.csrf.check(principal, token),
        _ => crate::csrf::Validation::Missing,
    };
    state.metrics.record_validation(outcome, state.csrf.len());
    if !outcome.is_accepted() {
        tracing::warn!(
            principal,
            outcome = outcome.as_str(),
            "contact submission rejected: csrf"
        );
        return Err(AppError::InvalidCsrfToken);
    }

    let contact = submission.into_message().ok_or(AppError::MissingFields)?;

    let receipt = ContactReceipt::at(chrono::Utc::now());
    tracing::info!(
        principal,
        user_email = session.claims.email.as_deref().unwrap_or(""),
        name = %contact.name,
        email = %contact.email,
        message_len = contact.message.len(),
        received_at = %receipt.received_at,
        "contact form submission received"
    );

    Ok(Json(receipt))
}

/// GET /api/gcr-health — relay the external system's health report.
pub async fn gcr_health(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    rbac::enforce(&session, &state.config.health_permission)?;

    let base_url = state
        .config
        .gcr_system_url
        .as_deref()
        .ok_or(AppError::NotConfigured("GCR_SYSTEM"))?;
    let key = state
        .config
        .gcr_system_key
        .as_deref()
        .ok_or(AppError::NotConfigured("GCR_SYSTEM_KEY"))?;

    let reply = state.health.check(base_url, key).await?;
    let status =
        StatusCode::from_u16(reply.status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(reply.body)))
}

/// GET /metrics — Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        state.metrics.render(),
    )
}
