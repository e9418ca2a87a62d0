//! shelf-gate web server.
//!
//! This crate provides the HTTP surface of shelf-gate: login and sessions,
//! the moderation and settings pages, and the policy editor that projects
//! permission grids into the policy-enforcement layer.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pages;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use auth::AppState;

/// Builds the application router.
///
/// Moderation and settings routes re-resolve the caller's roles before they
/// run; the remaining routes read roles from the session as stored.
pub fn router(state: Arc<AppState>) -> Router {
    let synced = Router::new()
        .route("/requests", get(pages::requests::page))
        .route("/requests/books/pending", get(pages::requests::pending_books))
        .route(
            "/requests/reviews/pending",
            get(pages::requests::pending_reviews),
        )
        .route(
            "/requests/books/approve/{id}",
            get(pages::requests::approve_book),
        )
        .route(
            "/requests/books/reject/{id}",
            get(pages::requests::reject_book),
        )
        .route(
            "/requests/reviews/approve/{id}",
            get(pages::requests::approve_review),
        )
        .route(
            "/requests/reviews/reject/{id}",
            get(pages::requests::reject_review),
        )
        .route("/settings", get(pages::settings::page))
        .route("/settings/change_role", post(pages::settings::change_role))
        .route("/settings/delete_role", delete(pages::settings::delete_role))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::sync_roles,
        ));

    Router::new()
        .route("/", get(auth::index))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/dashboard", get(auth::dashboard))
        .route("/books", get(pages::books::list_books))
        .route("/policy/editor", get(pages::policy::editor))
        .route("/api/permissions", get(pages::policy::get_permissions))
        .route(
            "/api/permissions/{resource}",
            post(pages::policy::update_permissions),
        )
        .merge(synced)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
