//! Session endpoints
//!
//! - POST /jwt - Issue a session token for an identity and set the `token` cookie
//! - POST /log-out - Clear the `token` cookie
//!
//! Logout has no server-side effect: a token copied before logout stays valid
//! until it expires.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, SESSION_COOKIE};
use crate::config::AppMode;

/// Request body for token issue
#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Build the session router (public)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jwt", post(issue_token))
        .route("/log-out", post(log_out))
}

/// Attributes shared by the set and clear cookies
fn cookie_attributes(mode: AppMode) -> &'static str {
    if mode.is_production() {
        "Path=/; HttpOnly; Secure; SameSite=None"
    } else {
        "Path=/; HttpOnly; SameSite=Strict"
    }
}

/// `Set-Cookie` value carrying a fresh token
pub fn session_cookie(token: &str, max_age_seconds: i64, mode: AppMode) -> String {
    format!(
        "{}={}; {}; Max-Age={}",
        SESSION_COOKIE,
        token,
        cookie_attributes(mode),
        max_age_seconds
    )
}

/// `Set-Cookie` value that makes the client drop the token
pub fn clear_session_cookie(mode: AppMode) -> String {
    format!("{}=; {}; Max-Age=0", SESSION_COOKIE, cookie_attributes(mode))
}

fn set_cookie_headers(cookie: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| ApiError::internal_error("Failed to build session cookie"))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

/// POST /jwt - Issue a session token
async fn issue_token(
    State(state): State<AppState>,
    payload: Result<Json<IssueTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::validation_error(e.body_text()))?;
    let email = body
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::validation_error("email is required"))?;

    let token = state.token_codec.issue(&email).map_err(|e| {
        tracing::error!("Failed to issue session token: {}", e);
        ApiError::internal_error("Failed to issue session token")
    })?;

    let cookie = session_cookie(&token, state.token_codec.ttl().num_seconds(), state.mode);
    tracing::info!(identity = %email, "session token issued");

    Ok((set_cookie_headers(&cookie)?, Json(SuccessResponse { success: true })))
}

/// POST /log-out - Clear the session cookie
async fn log_out(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let headers = set_cookie_headers(&clear_session_cookie(state.mode))?;
    Ok((headers, Json(SuccessResponse { success: true })))
}
