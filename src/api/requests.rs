//! Volunteer request (application) endpoints, all protected
//!
//! - GET /my-volunteer-request?email=
//! - POST /be-volunteer
//! - DELETE /my-volunteer-request/{id}

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value;

use crate::api::common::{document_body, query_params, required_param};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, EmailQuery};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my-volunteer-request", get(list_my_requests))
        .route("/my-volunteer-request/{id}", delete(cancel_request))
        .route("/be-volunteer", post(create_request))
}

async fn list_my_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query_params(query)?;
    required_param(query.email, "email")?;
    Ok(Json(state.volunteer_service.list_requests_by_owner(user.email()).await?))
}

async fn create_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = document_body(payload)?;
    Ok(Json(state.volunteer_service.create_request(user.email(), body).await?))
}

async fn cancel_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.volunteer_service.cancel_request(user.email(), &id).await?))
}
