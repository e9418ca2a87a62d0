//! Authentication module for the shelf-gate server.
//!
//! This module provides:
//! - Password-grant login against the identity provider
//! - Server-side sessions (in-memory or PostgreSQL)
//! - Authentication extractors for Axum routes
//! - Role synchronization before permission-sensitive routes
//!
//! # Authorization Model
//!
//! Sessions cache the caller's roles, resolved at login from the access
//! token's claims. Routes that list or mutate permission-sensitive resources
//! re-resolve roles from the identity provider first, so a role change made by
//! an administrator applies within one request. Admin-only routes additionally
//! read the token's claims on every request.
//!
//! Enforcement of what the downstream services allow is done by the
//! policy-enforcement layer, not here.

pub mod db;
pub mod directory;
pub mod middleware;
pub mod routes;
pub mod store;
pub mod token;

use shelf_gate_authz::{PolicyConfig, PolicyStore};
use shelf_gate_platform_access::{RoleDirectory, RoleSynchronizer, TokenExchange};
use std::sync::Arc;

use crate::catalog::CatalogClient;
use crate::config::SessionConfig;

pub use directory::KeycloakDirectory;
pub use middleware::{AuthRejection, OptionalAuth, RequireAdmin, RequireAuth, sync_roles};
pub use routes::{dashboard, index, login, logout};
pub use store::{MemorySessionStore, SessionStore, SessionStoreError};
pub use token::{IdpClientError, KeycloakTokenClient};

/// Shared application state.
pub struct AppState {
    /// Session storage.
    pub sessions: Arc<dyn SessionStore>,
    /// Password and refresh grants.
    pub tokens: Arc<dyn TokenExchange>,
    /// Administrative user and role lookups.
    pub directory: Arc<dyn RoleDirectory>,
    /// Re-resolves session roles before permission-sensitive routes.
    pub synchronizer: RoleSynchronizer,
    /// Downstream catalog service.
    pub catalog: CatalogClient,
    /// Stored policy documents.
    pub policies: Arc<dyn PolicyStore>,
    /// Policy projection settings.
    pub policy_config: PolicyConfig,
    /// Session configuration.
    pub session_config: SessionConfig,
    /// Identity-provider client id, used to pick client roles out of claims.
    pub client_id: String,
    /// Realm roles that count as application roles.
    pub app_roles: Vec<String>,
}
