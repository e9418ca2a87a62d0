//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! See [`IdentityProviderConfig`] for identity-provider settings and
//! [`PolicyConfig`] for policy projection settings.

use serde::Deserialize;
use shelf_gate_authz::PolicyConfig;
use shelf_gate_platform_access::IdentityProviderConfig;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// PostgreSQL connection URL. Sessions are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Identity provider configuration.
    pub idp: IdentityProviderConfig,

    /// Downstream catalog service.
    pub catalog: CatalogConfig,

    /// Policy-enforcement layer configuration.
    #[serde(default)]
    pub policy: PolicySettings,
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session duration in minutes, counted from login or the last refresh.
    #[serde(default = "default_session_duration_minutes")]
    pub duration_minutes: i64,

    /// Interval between session cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Access tokens closer than this many seconds to expiry are refreshed
    /// during role synchronization.
    #[serde(default = "default_token_refresh_margin_seconds")]
    pub token_refresh_margin_seconds: i64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

fn default_session_duration_minutes() -> i64 {
    60
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_token_refresh_margin_seconds() -> i64 {
    30
}

fn default_secure_cookies() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_session_duration_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            token_refresh_margin_seconds: default_token_refresh_margin_seconds(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.duration_minutes)
    }

    #[must_use]
    pub fn token_refresh_margin(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_refresh_margin_seconds)
    }
}

/// Downstream catalog/review service.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Base URL, e.g. "http://books-information:8080".
    pub base_url: String,

    #[serde(default = "default_catalog_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_catalog_timeout_seconds() -> u64 {
    5
}

/// Where policy documents are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyBackend {
    /// `AuthorizationPolicy` custom resources in the cluster.
    #[default]
    Kubernetes,
    /// In-process store, for local development.
    Memory,
}

/// Policy-enforcement layer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySettings {
    #[serde(default)]
    pub backend: PolicyBackend,

    /// Projection settings.
    #[serde(flatten)]
    pub projection: PolicyConfig,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
