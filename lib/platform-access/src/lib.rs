//! Platform access for shelf-gate: who is calling and what may they do.
//!
//! This crate provides:
//! - The server-side `Session` model and its lifecycle
//! - Role sets (`RoleSet`) and untrusted token claim decoding (`TokenClaims`)
//! - Identity-provider configuration (`IdentityProviderConfig`)
//! - The `TokenExchange` and `RoleDirectory` seams to the identity provider
//! - The admin gate decision and the `RoleSynchronizer`
//!
//! # Trust boundary
//!
//! Bearer tokens are decoded here without signature verification. The claims
//! drive routing and UX decisions only. Real enforcement happens in the
//! policy-enforcement proxy in front of the downstream services, which
//! verifies signatures; adding verification here would change that model.
//!
//! # Example
//!
//! ```
//! use chrono::Duration;
//! use shelf_gate_platform_access::{RoleSet, Session, TokenPair};
//!
//! let tokens = TokenPair::new("access".to_string(), Some("refresh".to_string()));
//! let roles = RoleSet::from_names(["moderator", "user"]);
//! let session = Session::authenticated("alice", None, tokens, roles, Duration::hours(1));
//!
//! assert!(session.is_authenticated());
//! assert_eq!(session.display_role(), "moderator-user");
//! ```

pub mod auth;
pub mod claims;
pub mod error;
pub mod idp;
pub mod provider;
pub mod role;
pub mod session;
pub mod sync;

pub use auth::{AuthenticatedUser, effective_roles, require_admin};
pub use claims::TokenClaims;
pub use error::{AuthError, AuthorizationError, ClaimsError, RoleMutationError};
pub use idp::IdentityProviderConfig;
pub use provider::{DirectoryUser, RoleDirectory, TokenExchange, TokenPair};
pub use role::{ADMIN_ROLE, RoleSet};
pub use session::Session;
pub use sync::{RoleSynchronizer, SyncOutcome};
