//! Untrusted decoding of bearer token claims.
//!
//! The payload segment of the JWT is base64url-decoded and parsed; the
//! signature is not checked. Claims are recomputed from the access token
//! whenever they are needed and are never stored on their own.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::ClaimsError;
use crate::role::RoleSet;

#[derive(Debug, Default, Deserialize)]
struct RoleList {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    exp: Option<i64>,
    preferred_username: Option<String>,
    #[serde(default)]
    realm_access: Option<RoleList>,
    #[serde(default)]
    resource_access: HashMap<String, RoleList>,
}

/// Claims read from an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// The subject, which is the identity provider's user id.
    pub subject: Option<String>,
    /// Username as known to the identity provider.
    pub preferred_username: Option<String>,
    /// Expiry as seconds since the epoch.
    pub expires_at: Option<i64>,
    /// Realm-level roles.
    pub realm_roles: Vec<String>,
    /// Client-scoped roles, keyed by client identifier.
    pub client_roles: HashMap<String, Vec<String>>,
}

impl TokenClaims {
    /// Decodes the payload of a JWT without verifying its signature.
    ///
    /// # Errors
    ///
    /// Returns `ClaimsError` when the token is not a three-segment JWT or its
    /// payload is not base64url-encoded JSON.
    pub fn decode(token: &str) -> Result<Self, ClaimsError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments[1].is_empty() {
            return Err(ClaimsError::MalformedToken);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(segments[1].trim_end_matches('='))
            .map_err(|e| ClaimsError::InvalidEncoding {
                reason: e.to_string(),
            })?;

        let raw: RawClaims =
            serde_json::from_slice(&payload).map_err(|e| ClaimsError::InvalidPayload {
                reason: e.to_string(),
            })?;

        Ok(Self {
            subject: raw.sub,
            preferred_username: raw.preferred_username,
            expires_at: raw.exp,
            realm_roles: raw.realm_access.unwrap_or_default().roles,
            client_roles: raw
                .resource_access
                .into_iter()
                .map(|(client, list)| (client, list.roles))
                .collect(),
        })
    }

    /// Returns true when the token expires less than `margin` after `now`.
    /// A token without an expiry claim never expires.
    #[must_use]
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - now.timestamp() < margin.num_seconds())
    }

    /// Returns the roles scoped to the given client.
    #[must_use]
    pub fn roles_for_client(&self, client_id: &str) -> &[String] {
        self.client_roles
            .get(client_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every role the token asserts: realm roles plus roles of every client.
    #[must_use]
    pub fn all_roles(&self) -> RoleSet {
        self.realm_roles
            .iter()
            .chain(self.client_roles.values().flatten())
            .cloned()
            .collect()
    }

    /// The realm roles that are application roles.
    ///
    /// Identity providers attach bookkeeping realm roles (offline access,
    /// default-role composites) that mean nothing to this application.
    #[must_use]
    pub fn app_realm_roles(&self, app_roles: &[String]) -> RoleSet {
        self.realm_roles
            .iter()
            .filter(|role| app_roles.contains(role))
            .cloned()
            .collect()
    }

    /// The role set a session is built from: application realm roles plus the
    /// client's roles.
    #[must_use]
    pub fn session_roles(&self, client_id: &str, app_roles: &[String]) -> RoleSet {
        let mut roles = self.app_realm_roles(app_roles);
        for role in self.roles_for_client(client_id) {
            roles.insert(role.clone());
        }
        roles
    }
}
