//! Downstream catalog/review service client.
//!
//! Calls forward the caller's bearer token. 401 and 403 answers become
//! [`CatalogError::NoPermission`]; transport failures become
//! [`CatalogError::Unavailable`]. Non-JSON bodies are passed through as text.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::CatalogConfig;

/// A downstream response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    /// Removes array items authored by the given identity-provider user.
    ///
    /// Items carry their author as `user.keycloakId`. Non-array payloads are
    /// returned unchanged.
    #[must_use]
    pub fn without_author(self, keycloak_user_id: Option<&str>) -> Self {
        match (self, keycloak_user_id) {
            (Self::Json(serde_json::Value::Array(items)), Some(author)) => Self::Json(
                items
                    .into_iter()
                    .filter(|item| {
                        item.get("user")
                            .and_then(|user| user.get("keycloakId"))
                            .and_then(serde_json::Value::as_str)
                            != Some(author)
                    })
                    .collect(),
            ),
            (payload, _) => payload,
        }
    }
}

impl IntoResponse for Payload {
    fn into_response(self) -> Response {
        match self {
            Self::Json(value) => Json(value).into_response(),
            Self::Text(text) => text.into_response(),
        }
    }
}

/// Failures of a downstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The service answered 401 or 403.
    NoPermission,
    /// The service answered with another non-success status.
    Status { status: u16 },
    /// The service could not be reached.
    Unavailable { reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPermission => write!(f, "catalog denied access"),
            Self::Status { status } => write!(f, "catalog returned status {}", status),
            Self::Unavailable { reason } => write!(f, "catalog unavailable: {}", reason),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Client for the catalog service.
#[derive(Clone)]
pub struct CatalogClient {
    base_url: String,
    http: reqwest::Client,
}

impl CatalogClient {
    /// Creates a catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// GET `path` with the caller's bearer token.
    #[instrument(skip(self, bearer_token))]
    pub async fn get(&self, path: &str, bearer_token: &str) -> Result<Payload, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Error connecting to catalog service");
                CatalogError::Unavailable {
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Catalog denied request");
            debug!(body = %body, "Catalog denial body");
            return Err(CatalogError::NoPermission);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Catalog request failed");
            debug!(body = %body, "Catalog failure body");
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        read_payload(response).await
    }

    /// GET `path` without credentials, for public listings.
    #[instrument(skip(self))]
    pub async fn get_public(&self, path: &str) -> Result<Payload, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().await.map_err(|e| {
            warn!(error = %e, "Error connecting to catalog service");
            CatalogError::Unavailable {
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Catalog request failed");
            debug!(body = %body, "Catalog failure body");
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        read_payload(response).await
    }
}

async fn read_payload(response: reqwest::Response) -> Result<Payload, CatalogError> {
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let text = response.text().await.map_err(|e| CatalogError::Unavailable {
        reason: e.to_string(),
    })?;

    if is_json {
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Payload::Json(value)),
            Err(e) => {
                warn!(error = %e, "Catalog sent malformed JSON, passing through as text");
                Ok(Payload::Text(text))
            }
        }
    } else {
        Ok(Payload::Text(text))
    }
}
