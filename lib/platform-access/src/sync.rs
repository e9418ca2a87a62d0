//! Role synchronization.
//!
//! Before permission-sensitive requests, the caller's roles are re-resolved
//! from the identity provider. When they differ from the session's cached set,
//! or the access token is about to expire, the session's tokens are refreshed
//! and the session is updated in one step. If the refresh cannot happen the
//! session is cleared and the caller must log in again.
//!
//! Two concurrent requests from the same session may both synchronize; the
//! last one to save the session wins. The next request re-synchronizes, so
//! the store needs no cross-request locking.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::claims::TokenClaims;
use crate::provider::{RoleDirectory, TokenExchange};
use crate::role::RoleSet;
use crate::session::Session;

/// What synchronization did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The session has no access token; nothing to synchronize.
    Unauthenticated,
    /// The directory could not be consulted; the session is untouched.
    Skipped,
    /// Roles match the directory.
    Unchanged,
    /// Roles changed or the access token was expiring; the session now holds
    /// refreshed tokens and the current roles.
    Refreshed { roles: RoleSet },
    /// The session was cleared and must be destroyed.
    Invalidated,
}

impl SyncOutcome {
    /// Returns true if the session was modified and must be saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        matches!(self, Self::Refreshed { .. })
    }
}

/// Keeps sessions consistent with the identity provider's role mappings.
#[derive(Clone)]
pub struct RoleSynchronizer {
    tokens: Arc<dyn TokenExchange>,
    directory: Arc<dyn RoleDirectory>,
    app_roles: Vec<String>,
    session_duration: Duration,
    refresh_margin: Duration,
}

impl RoleSynchronizer {
    #[must_use]
    pub fn new(
        tokens: Arc<dyn TokenExchange>,
        directory: Arc<dyn RoleDirectory>,
        app_roles: Vec<String>,
        session_duration: Duration,
    ) -> Self {
        Self {
            tokens,
            directory,
            app_roles,
            session_duration,
            refresh_margin: Duration::seconds(30),
        }
    }

    /// Sets how close to expiry an access token may get before it is
    /// refreshed even though roles are unchanged.
    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Re-resolves the session's roles and refreshes it on drift or when its
    /// access token is about to expire.
    ///
    /// Derived fields are only written after every upstream call succeeded, so
    /// a timeout part-way leaves the session as it was.
    pub async fn synchronize(&self, session: &mut Session) -> SyncOutcome {
        let Some(access_token) = session.access_token() else {
            return SyncOutcome::Unauthenticated;
        };

        let (realm_roles, expiring) = match TokenClaims::decode(access_token) {
            Ok(claims) => (
                claims.app_realm_roles(&self.app_roles),
                claims.expires_within(self.refresh_margin, Utc::now()),
            ),
            Err(e) => {
                warn!(username = %session.username(), error = %e, "Undecodable session token");
                session.clear();
                return SyncOutcome::Invalidated;
            }
        };

        let Some(admin_token) = self.directory.admin_token().await else {
            warn!("No administrative token, skipping role synchronization");
            return SyncOutcome::Skipped;
        };

        let user_id = match session.keycloak_user_id() {
            Some(id) => id.to_string(),
            None => match self
                .directory
                .user_id(&admin_token, session.username())
                .await
            {
                Some(id) => id,
                None => {
                    warn!(username = %session.username(), "User not found in directory");
                    return SyncOutcome::Skipped;
                }
            },
        };

        let Some(client_id) = self.directory.client_id(&admin_token).await else {
            warn!("Application client not found, skipping role synchronization");
            return SyncOutcome::Skipped;
        };

        let directory_roles: RoleSet = self
            .directory
            .user_roles(&admin_token, &user_id, &client_id)
            .await
            .into_iter()
            .collect();
        let current = directory_roles.union(&realm_roles);

        if session.keycloak_user_id().is_none() {
            session.set_keycloak_user_id(user_id);
        }

        if &current == session.roles() {
            if !expiring {
                debug!(username = %session.username(), "Roles unchanged");
                return SyncOutcome::Unchanged;
            }
            info!(username = %session.username(), "Access token expiring, refreshing session");
        } else {
            info!(
                username = %session.username(),
                cached = %session.display_role(),
                current = %current.display(),
                "Role change detected, refreshing session"
            );
        }

        let Some(refresh_token) = session.refresh_token().map(str::to_string) else {
            warn!(username = %session.username(), "No refresh token, invalidating session");
            session.clear();
            return SyncOutcome::Invalidated;
        };

        match self.tokens.refresh(&refresh_token).await {
            Ok(pair) => {
                session.apply_refresh(pair, current.clone(), self.session_duration);
                SyncOutcome::Refreshed { roles: current }
            }
            Err(e) => {
                warn!(username = %session.username(), error = %e, "Refresh failed, invalidating session");
                session.clear();
                SyncOutcome::Invalidated
            }
        }
    }
}
