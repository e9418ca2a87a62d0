//! HTTP error responses.
//!
//! Domain errors are mapped into [`ApiError`], which renders a status code and
//! a short JSON message. Details are logged here and never sent to the browser.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rootcause::prelude::Report;
use serde_json::json;
use shelf_gate_authz::PolicyError;
use shelf_gate_platform_access::{AuthError, RoleMutationError};
use std::fmt;

use crate::catalog::CatalogError;

/// Message returned whenever the caller may not access something downstream.
pub const NO_PERMISSION_MESSAGE: &str = "You do not have permission to access this resource.";

/// Errors returned by JSON endpoints.
#[derive(Debug)]
pub enum ApiError {
    /// Bad username/password, or the identity provider rejected the login.
    InvalidCredentials,
    /// The downstream service or the gate refused the caller.
    NoPermission,
    /// The caller is authenticated but not an admin.
    AdminRequired,
    /// An upstream dependency failed; the message is safe to show.
    UpstreamUnavailable { message: &'static str },
    /// The request cannot be processed as sent.
    BadRequest { message: String },
    /// An upstream answered with a status that is passed through.
    Upstream { status: StatusCode, body: serde_json::Value },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::NoPermission => write!(f, "no permission"),
            Self::AdminRequired => write!(f, "admin access required"),
            Self::UpstreamUnavailable { message } => write!(f, "upstream unavailable: {message}"),
            Self::BadRequest { message } => write!(f, "bad request: {message}"),
            Self::Upstream { status, .. } => write!(f, "upstream returned {status}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "message": "Invalid credentials"})),
            )
                .into_response(),
            Self::NoPermission => (
                StatusCode::FORBIDDEN,
                Json(json!({"error": NO_PERMISSION_MESSAGE})),
            )
                .into_response(),
            Self::AdminRequired => (
                StatusCode::FORBIDDEN,
                Json(json!({"error": "Admin access required"})),
            )
                .into_response(),
            Self::UpstreamUnavailable { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": message})),
            )
                .into_response(),
            Self::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "message": message})),
            )
                .into_response(),
            Self::Upstream { status, body } => (status, Json(body)).into_response(),
        }
    }
}

impl ApiError {
    /// Maps a failed catalog call, using `failure_message` for everything
    /// that is not a permission denial.
    pub fn from_catalog(err: CatalogError, failure_message: &'static str) -> Self {
        match err {
            CatalogError::NoPermission => Self::NoPermission,
            CatalogError::Status { .. } | CatalogError::Unavailable { .. } => {
                tracing::error!(error = %err, "Catalog request failed");
                Self::UpstreamUnavailable {
                    message: failure_message,
                }
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::RefreshFailed { .. } | AuthError::LogoutRejected { .. } => {
                tracing::warn!(error = %err, "Identity provider rejected request");
                Self::InvalidCredentials
            }
            AuthError::UpstreamUnavailable { .. } => {
                tracing::error!(error = %err, "Identity provider unavailable");
                Self::UpstreamUnavailable {
                    message: "Identity provider unavailable",
                }
            }
        }
    }
}

impl From<RoleMutationError> for ApiError {
    fn from(err: RoleMutationError) -> Self {
        tracing::error!(error = %err, "Role change did not take effect");
        let message = match err {
            RoleMutationError::AssignFailedAfterRevoke { .. } => {
                "Failed to change role; the user currently has no role"
            }
            RoleMutationError::RoleNotFound { .. } => "Unknown role",
            RoleMutationError::UserNotFound { .. } => "Unknown user",
            _ => "Failed to change role",
        };
        Self::BadRequest {
            message: message.to_string(),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::UnknownResource { .. } | PolicyError::InvalidInput { .. } => {
                Self::BadRequest {
                    message: err.to_string(),
                }
            }
            _ => {
                tracing::error!(error = %err, "Policy operation failed");
                Self::UpstreamUnavailable {
                    message: "Policy store unavailable",
                }
            }
        }
    }
}

impl From<Report<PolicyError>> for ApiError {
    fn from(report: Report<PolicyError>) -> Self {
        tracing::error!(error = %report, "Policy store operation failed");
        Self::UpstreamUnavailable {
            message: "Policy store unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_is_401() {
        let response = ApiError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn no_permission_is_403() {
        assert_eq!(
            ApiError::NoPermission.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn catalog_denial_is_no_permission() {
        let err = ApiError::from_catalog(CatalogError::NoPermission, "Error fetching books data.");
        assert!(matches!(err, ApiError::NoPermission));
    }

    #[test]
    fn catalog_failure_uses_route_message() {
        let err = ApiError::from_catalog(
            CatalogError::Unavailable {
                reason: "timed out".to_string(),
            },
            "Error approving book.",
        );
        assert!(matches!(
            err,
            ApiError::UpstreamUnavailable {
                message: "Error approving book."
            }
        ));
    }

    #[test]
    fn partial_role_change_is_reported() {
        let err = ApiError::from(RoleMutationError::AssignFailedAfterRevoke {
            username: "bob".to_string(),
            role: "moderator".to_string(),
        });
        match err {
            ApiError::BadRequest { message } => assert!(message.contains("no role")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_resource_is_bad_request() {
        let err = ApiError::from(PolicyError::UnknownResource {
            name: "authors".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failure_is_500() {
        let err = ApiError::from(PolicyError::RequestFailed {
            details: "forbidden".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
