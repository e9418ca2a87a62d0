//! Policy error types.

use std::fmt;

/// Errors from projecting or persisting access policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The resource name is not one the grid covers.
    UnknownResource {
        /// The requested resource.
        name: String,
    },
    /// A submitted grid entry is invalid.
    InvalidInput {
        /// Error details.
        details: String,
    },
    /// The policy object does not exist.
    NotFound {
        /// Name of the policy object.
        name: String,
    },
    /// Failed to connect to the policy-enforcement API.
    ConnectionFailed {
        /// Error details.
        details: String,
    },
    /// The policy-enforcement API rejected a request.
    RequestFailed {
        /// Error details.
        details: String,
    },
    /// A stored policy object could not be read as a policy document.
    InvalidDocument {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownResource { name } => write!(f, "unknown resource '{}'", name),
            Self::InvalidInput { details } => write!(f, "invalid permission input: {}", details),
            Self::NotFound { name } => write!(f, "policy '{}' not found", name),
            Self::ConnectionFailed { details } => {
                write!(f, "failed to connect to policy-enforcement API: {}", details)
            }
            Self::RequestFailed { details } => {
                write!(f, "policy-enforcement request failed: {}", details)
            }
            Self::InvalidDocument { details } => {
                write!(f, "invalid policy document: {}", details)
            }
        }
    }
}

impl std::error::Error for PolicyError {}
