//! Authorization gate decisions.
//!
//! The web layer turns these decisions into redirects and status codes. The
//! admin check reads claims freshly from the access token on every call, so a
//! role granted or removed at the identity provider takes effect without a
//! new login.

use crate::claims::TokenClaims;
use crate::error::AuthorizationError;
use crate::role::{ADMIN_ROLE, RoleSet};
use crate::session::Session;

/// An authenticated caller, available to handlers behind the gate.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    session: Session,
}

impl AuthenticatedUser {
    /// Wraps a session that has already passed the gate.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.session.username()
    }

    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        self.session.roles()
    }

    /// The bearer token forwarded to downstream services.
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        self.session.access_token().unwrap_or_default()
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }
}

/// The union of the session's cached roles and the roles embedded in its token.
///
/// # Errors
///
/// `NotAuthenticated` if the session has no access token; `SessionInvalid`
/// if the token cannot be decoded.
pub fn effective_roles(session: &Session) -> Result<RoleSet, AuthorizationError> {
    let token = session
        .access_token()
        .ok_or(AuthorizationError::NotAuthenticated)?;
    let claims = TokenClaims::decode(token)?;
    Ok(session.roles().union(&claims.all_roles()))
}

/// Requires the admin role in the session's effective roles.
///
/// # Errors
///
/// `AdminRequired` when the caller is authenticated but not an admin, plus the
/// errors of [`effective_roles`].
pub fn require_admin(session: &Session) -> Result<RoleSet, AuthorizationError> {
    let roles = effective_roles(session)?;
    if roles.contains(ADMIN_ROLE) {
        Ok(roles)
    } else {
        Err(AuthorizationError::AdminRequired)
    }
}
