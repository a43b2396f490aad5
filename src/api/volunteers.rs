//! Volunteer post endpoints
//!
//! Public:
//! - GET /volunteer-details/{id}
//! - GET /need-volunteer-section
//! - GET /need-volunteer?search=
//!
//! Protected:
//! - GET /my-need-vol?email=
//! - POST /add-volunteer
//! - PATCH /update-volunteer/{id}
//! - DELETE /need-volunteer/{id}

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::common::{document_body, query_params, required_param};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, EmailQuery};
use crate::models::UpdateVolunteerInput;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/volunteer-details/{id}", get(get_post))
        .route("/need-volunteer-section", get(list_posts))
        .route("/need-volunteer", get(search_posts))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/my-need-vol", get(list_my_posts))
        .route("/add-volunteer", post(create_post))
        .route("/update-volunteer/{id}", patch(update_post))
        .route("/need-volunteer/{id}", delete(delete_post))
}

/// GET /volunteer-details/{id} - One post, or `null`
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.volunteer_service.get_post(&id).await?;
    Ok(Json(post))
}

async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.volunteer_service.list_posts().await?))
}

/// GET /need-volunteer?search= - Exact title match
async fn search_posts(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query_params(query)?;
    let title = required_param(query.search, "search")?;
    Ok(Json(state.volunteer_service.search_posts(&title).await?))
}

async fn list_my_posts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query_params(query)?;
    // The gate has already matched a present email against the identity.
    required_param(query.email, "email")?;
    Ok(Json(state.volunteer_service.list_posts_by_owner(user.email()).await?))
}

async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = document_body(payload)?;
    Ok(Json(state.volunteer_service.create_post(user.email(), body).await?))
}

/// PATCH /update-volunteer/{id} - Only whitelisted fields are applied
async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateVolunteerInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload.map_err(|e| ApiError::validation_error(e.body_text()))?;
    Ok(Json(state.volunteer_service.update_post(user.email(), &id, input).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.volunteer_service.delete_post(user.email(), &id).await?))
}
