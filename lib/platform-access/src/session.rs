//! Server-side sessions.
//!
//! A session is created after a successful password-grant exchange and holds
//! the caller's tokens and resolved roles. It is mutated by token refresh and
//! destroyed on logout, refresh failure, or when its token cannot be decoded.
//! A session without an access token is unauthenticated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shelf_gate_core::SessionId;

use crate::provider::TokenPair;
use crate::role::RoleSet;

/// Per-user authentication state held by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    username: String,
    /// The identity provider's id for the user.
    keycloak_user_id: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    roles: RoleSet,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates an authenticated session with a fresh ID.
    #[must_use]
    pub fn authenticated(
        username: impl Into<String>,
        keycloak_user_id: Option<String>,
        tokens: TokenPair,
        roles: RoleSet,
        duration: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            username: username.into(),
            keycloak_user_id,
            access_token: Some(tokens.access_token),
            refresh_token: tokens.refresh_token,
            roles,
            created_at: now,
            expires_at: now + duration,
        }
    }

    /// Rebuilds a session from persisted fields.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn with_all_fields(
        id: SessionId,
        username: String,
        keycloak_user_id: Option<String>,
        access_token: Option<String>,
        refresh_token: Option<String>,
        roles: RoleSet,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            keycloak_user_id,
            access_token,
            refresh_token,
            roles,
            created_at,
            expires_at,
        }
    }

    /// Returns the session ID.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn keycloak_user_id(&self) -> Option<&str> {
        self.keycloak_user_id.as_deref()
    }

    /// Records the identity provider's id for the user once it is resolved.
    pub fn set_keycloak_user_id(&mut self, id: String) {
        self.keycloak_user_id = Some(id);
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns the cached role set.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Roles joined for display, e.g. `moderator-user`.
    #[must_use]
    pub fn display_role(&self) -> String {
        self.roles.display()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the session carries an access token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Replaces tokens and roles together after a successful refresh.
    ///
    /// The new expiry is `duration` from now and always later than the old one.
    pub fn apply_refresh(&mut self, tokens: TokenPair, roles: RoleSet, duration: Duration) {
        let next_expiry = Utc::now() + duration;
        self.expires_at = if next_expiry > self.expires_at {
            next_expiry
        } else {
            self.expires_at + Duration::milliseconds(1)
        };
        self.access_token = Some(tokens.access_token);
        if tokens.refresh_token.is_some() {
            self.refresh_token = tokens.refresh_token;
        }
        self.roles = roles;
    }

    /// Drops every credential and role, leaving an unauthenticated shell.
    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.keycloak_user_id = None;
        self.roles = RoleSet::none();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(access: &str, refresh: Option<&str>) -> TokenPair {
        TokenPair::new(access.to_string(), refresh.map(String::from))
    }

    fn session() -> Session {
        Session::authenticated(
            "alice",
            Some("kc-1".to_string()),
            tokens("access-1", Some("refresh-1")),
            RoleSet::from_names(["user"]),
            Duration::hours(1),
        )
    }

    #[test]
    fn new_session_is_authenticated_for_one_hour() {
        let before = Utc::now();
        let session = session();

        assert!(session.is_authenticated());
        assert!(!session.is_expired());
        assert_eq!(session.username(), "alice");
        assert_eq!(session.keycloak_user_id(), Some("kc-1"));
        assert_eq!(session.refresh_token(), Some("refresh-1"));
        assert!(session.expires_at() >= before + Duration::hours(1));
        assert!(session.expires_at() <= Utc::now() + Duration::hours(1));
    }

    #[test]
    fn refresh_replaces_tokens_and_roles_and_extends_expiry() {
        let mut session = session();
        let old_expiry = session.expires_at();

        session.apply_refresh(
            tokens("access-2", Some("refresh-2")),
            RoleSet::from_names(["moderator"]),
            Duration::hours(1),
        );

        assert_eq!(session.access_token(), Some("access-2"));
        assert_eq!(session.refresh_token(), Some("refresh-2"));
        assert_eq!(session.display_role(), "moderator");
        assert!(session.expires_at() > old_expiry);
    }

    #[test]
    fn refresh_keeps_old_refresh_token_when_none_issued() {
        let mut session = session();
        session.apply_refresh(tokens("access-2", None), RoleSet::none(), Duration::hours(1));
        assert_eq!(session.refresh_token(), Some("refresh-1"));
    }

    #[test]
    fn clear_leaves_unauthenticated_session() {
        let mut session = session();
        session.clear();

        assert!(!session.is_authenticated());
        assert!(session.refresh_token().is_none());
        assert!(session.roles().is_empty());
    }

    #[test]
    fn expired_session() {
        let session = Session::authenticated(
            "bob",
            None,
            tokens("a", None),
            RoleSet::none(),
            Duration::seconds(-1),
        );
        assert!(session.is_expired());
    }

    #[test]
    fn serialization_roundtrip() {
        let session = session();
        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, session);
    }
}
