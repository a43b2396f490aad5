//! Common API utilities shared by the collection handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Json,
};
use serde_json::Value;

use crate::api::middleware::ApiError;
use crate::models::Document;

/// Unwrap a JSON body that must be an object
pub fn document_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Document, ApiError> {
    let Json(value) = payload.map_err(|e| ApiError::validation_error(e.body_text()))?;
    match value {
        Value::Object(doc) => Ok(doc),
        _ => Err(ApiError::validation_error("Request body must be a JSON object")),
    }
}

/// Unwrap query parameters, reporting a malformed query string as a validation error
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::validation_error(e.body_text()))
}

/// Require a non-empty query parameter
pub fn required_param(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation_error(format!("{} is required", name)))
}
