//! Identity provider configuration.
//!
//! The identity provider is an OpenID-compatible service (Keycloak-style URL
//! layout) that issues tokens for the application's client and exposes an
//! administrative API for users and client role mappings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the identity provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// Base URL of the identity provider (e.g. "http://keycloak:8080").
    base_url: String,
    /// Realm the application's users live in.
    realm: String,
    /// Client identifier the application authenticates as.
    /// Default: "Istio"
    #[serde(default = "default_client_id")]
    client_id: String,
    /// Realm holding the administrative account.
    /// Default: "master"
    #[serde(default = "default_admin_realm")]
    admin_realm: String,
    /// Client used to obtain administrative tokens.
    /// Default: "admin-cli"
    #[serde(default = "default_admin_client_id")]
    admin_client_id: String,
    /// Administrative account username.
    admin_username: String,
    /// Administrative account password.
    admin_password: String,
    /// Timeout applied to every identity-provider call, in seconds.
    /// Default: 2
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    /// Realm roles that are meaningful to the application, comma-separated.
    /// Default: "admin,user,verified,moderator"
    #[serde(default = "default_app_roles")]
    app_roles: String,
}

fn default_client_id() -> String {
    "Istio".to_string()
}

fn default_admin_realm() -> String {
    "master".to_string()
}

fn default_admin_client_id() -> String {
    "admin-cli".to_string()
}

fn default_timeout_seconds() -> u64 {
    2
}

fn default_app_roles() -> String {
    "admin,user,verified,moderator".to_string()
}

impl IdentityProviderConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        realm: impl Into<String>,
        admin_username: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            realm: realm.into(),
            client_id: default_client_id(),
            admin_realm: default_admin_realm(),
            admin_client_id: default_admin_client_id(),
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            timeout_seconds: default_timeout_seconds(),
            app_roles: default_app_roles(),
        }
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Token endpoint of the application realm.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base(),
            self.realm
        )
    }

    /// Logout endpoint of the application realm.
    #[must_use]
    pub fn logout_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/logout",
            self.base(),
            self.realm
        )
    }

    /// Token endpoint of the administrative realm.
    #[must_use]
    pub fn admin_token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base(),
            self.admin_realm
        )
    }

    /// Root of the administrative API for the application realm.
    #[must_use]
    pub fn admin_api_url(&self) -> String {
        format!("{}/admin/realms/{}", self.base(), self.realm)
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn admin_client_id(&self) -> &str {
        &self.admin_client_id
    }

    #[must_use]
    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    #[must_use]
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Returns the application realm roles, parsed from the comma-separated string.
    #[must_use]
    pub fn app_roles(&self) -> Vec<String> {
        self.app_roles
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map(String::from)
            .collect()
    }
}
