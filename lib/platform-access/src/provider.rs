//! Seams to the identity provider.
//!
//! `TokenExchange` covers the grant flows a browser session needs.
//! `RoleDirectory` covers the administrative lookups and role mutations.
//! The server provides HTTP implementations; tests substitute fakes.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AuthError, RoleMutationError};

/// Tokens returned by a successful grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }
}

/// Password and refresh grants against the identity provider's token endpoint.
///
/// Implementations never touch session state; callers own that.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Exchanges a username and password for tokens.
    ///
    /// Any rejection or transport failure is `AuthError::InvalidCredentials`.
    async fn exchange_password(&self, username: &str, password: &str)
    -> Result<TokenPair, AuthError>;

    /// Exchanges a refresh token for new tokens.
    ///
    /// Any rejection or transport failure is `AuthError::RefreshFailed`.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Ends the user's session at the identity provider.
    async fn logout(&self, access_token: &str, refresh_token: Option<&str>)
    -> Result<(), AuthError>;
}

/// A user as listed by the role directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryUser {
    pub id: String,
    pub username: String,
    /// The first client role mapped to the user, if any.
    pub role: Option<String>,
}

/// Administrative access to users and client role mappings.
///
/// Lookups absorb transport failures: they log and return `None` or an empty
/// list so callers degrade to "no roles". Mutations report failure explicitly.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Obtains an administrative token.
    async fn admin_token(&self) -> Option<String>;

    /// Resolves a username to the identity provider's user id.
    async fn user_id(&self, admin_token: &str, username: &str) -> Option<String>;

    /// Resolves the application's registered client to its internal id.
    async fn client_id(&self, admin_token: &str) -> Option<String>;

    /// Client roles mapped to a user, in the order the provider returns them.
    async fn user_roles(&self, admin_token: &str, user_id: &str, client_id: &str) -> Vec<String>;

    /// Every user, each with their primary client role.
    async fn list_users(&self, admin_token: &str, client_id: &str) -> Vec<DirectoryUser>;

    /// Every role defined on the application's client.
    async fn list_roles(&self, admin_token: &str, client_id: &str) -> Vec<String>;

    /// Replaces the user's client roles with exactly `role`.
    async fn assign_role(&self, username: &str, role: &str) -> Result<(), RoleMutationError>;

    /// Removes every client role from the user.
    async fn revoke_role(&self, username: &str) -> Result<(), RoleMutationError>;
}
