//! Public book listing.

use axum::{extract::State, http::StatusCode};
use serde_json::json;
use std::sync::Arc;

use crate::auth::AppState;
use crate::catalog::{CatalogError, Payload};
use crate::error::ApiError;

/// Passes the catalog's book listing through without credentials.
pub async fn list_books(State(state): State<Arc<AppState>>) -> Result<Payload, ApiError> {
    match state.catalog.get_public("/books").await {
        Ok(payload) => Ok(payload),
        Err(CatalogError::Status { status }) => Err(ApiError::Upstream {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            body: json!({"error": "Failed to fetch books data."}),
        }),
        Err(err) => Err(ApiError::from_catalog(err, "Error fetching books data.")),
    }
}
