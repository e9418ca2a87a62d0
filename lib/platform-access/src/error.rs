//! Error types for the platform-access crate.
//!
//! - `AuthError`: token exchange failures against the identity provider
//! - `ClaimsError`: a bearer token whose payload cannot be read
//! - `AuthorizationError`: gate decisions that deny a caller
//! - `RoleMutationError`: administrative role changes that did not take effect

use std::fmt;

/// Errors from token exchange operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity provider rejected the username/password, or could not be reached
    /// during the initial exchange.
    InvalidCredentials,
    /// A refresh-token grant failed. Callers must end the session.
    RefreshFailed { reason: String },
    /// The identity provider answered a logout with a non-success status.
    LogoutRejected { status: u16 },
    /// The identity provider could not be reached.
    UpstreamUnavailable { reason: String },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::RefreshFailed { reason } => write!(f, "token refresh failed: {reason}"),
            Self::LogoutRejected { status } => {
                write!(f, "identity provider rejected logout with status {status}")
            }
            Self::UpstreamUnavailable { reason } => {
                write!(f, "identity provider unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Errors from decoding bearer token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    /// The token is not three dot-separated segments.
    MalformedToken,
    /// The payload segment is not valid base64url.
    InvalidEncoding { reason: String },
    /// The payload is not the expected JSON shape.
    InvalidPayload { reason: String },
}

impl fmt::Display for ClaimsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedToken => write!(f, "token is not a JWT"),
            Self::InvalidEncoding { reason } => {
                write!(f, "token payload is not base64url: {reason}")
            }
            Self::InvalidPayload { reason } => write!(f, "token payload is invalid: {reason}"),
        }
    }
}

impl std::error::Error for ClaimsError {}

/// Reasons the authorization gate refuses a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No session, or a session without an access token.
    NotAuthenticated,
    /// The session's token could not be decoded; the session must be destroyed.
    SessionInvalid { reason: String },
    /// The caller is authenticated but lacks the admin role.
    AdminRequired,
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user is not authenticated"),
            Self::SessionInvalid { reason } => write!(f, "session is invalid: {reason}"),
            Self::AdminRequired => write!(f, "admin access required"),
        }
    }
}

impl std::error::Error for AuthorizationError {}

impl From<ClaimsError> for AuthorizationError {
    fn from(err: ClaimsError) -> Self {
        Self::SessionInvalid {
            reason: err.to_string(),
        }
    }
}

/// Errors from administrative role mutations.
///
/// Every variant means the requested change did not take effect as asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleMutationError {
    /// No administrative token could be obtained.
    AdminTokenUnavailable,
    /// The user does not exist in the identity provider.
    UserNotFound { username: String },
    /// The application's client is not registered.
    ClientNotFound,
    /// The requested role is not defined on the application's client.
    RoleNotFound { role: String },
    /// Removing the user's existing role mappings failed; nothing changed.
    RevokeFailed { username: String },
    /// Existing mappings were removed but the new role could not be assigned.
    /// The user is left without any client role.
    AssignFailedAfterRevoke { username: String, role: String },
}

impl fmt::Display for RoleMutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdminTokenUnavailable => write!(f, "administrative token unavailable"),
            Self::UserNotFound { username } => write!(f, "user '{username}' not found"),
            Self::ClientNotFound => write!(f, "application client not found"),
            Self::RoleNotFound { role } => write!(f, "role '{role}' not found"),
            Self::RevokeFailed { username } => {
                write!(f, "failed to revoke roles of user '{username}'")
            }
            Self::AssignFailedAfterRevoke { username, role } => write!(
                f,
                "revoked roles of user '{username}' but failed to assign '{role}'; user has no role"
            ),
        }
    }
}

impl std::error::Error for RoleMutationError {}
