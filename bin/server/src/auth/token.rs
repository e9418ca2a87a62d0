//! Token exchange against the identity provider using the oauth2 crate.

use async_trait::async_trait;
use oauth2::{
    ClientId, RefreshToken, ResourceOwnerPassword, ResourceOwnerUsername, TokenResponse, TokenUrl,
    basic::BasicClient,
};
use shelf_gate_platform_access::{AuthError, IdentityProviderConfig, TokenExchange, TokenPair};
use std::fmt;
use tracing::{debug, instrument, warn};

/// Errors building an identity-provider client from configuration.
#[derive(Debug)]
pub enum IdpClientError {
    /// A derived endpoint URL is invalid.
    InvalidUrl { url: String, reason: String },
    /// The HTTP client could not be created.
    HttpClient { reason: String },
}

impl fmt::Display for IdpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url, reason } => write!(f, "invalid URL '{}': {}", url, reason),
            Self::HttpClient { reason } => write!(f, "failed to create HTTP client: {}", reason),
        }
    }
}

impl std::error::Error for IdpClientError {}

/// Builds the HTTP client used for identity-provider calls.
///
/// Redirects are disabled, as the oauth2 crate requires.
pub(crate) fn http_client(
    timeout: std::time::Duration,
) -> Result<reqwest::Client, IdpClientError> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .map_err(|e| IdpClientError::HttpClient {
            reason: e.to_string(),
        })
}

/// Password and refresh grants for the application client.
#[derive(Clone)]
pub struct KeycloakTokenClient {
    client_id: String,
    token_url: TokenUrl,
    logout_url: String,
    http: reqwest::Client,
}

impl KeycloakTokenClient {
    /// Creates a token client for the application realm.
    ///
    /// # Errors
    ///
    /// Returns an error if the token URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &IdentityProviderConfig) -> Result<Self, IdpClientError> {
        let token_url =
            TokenUrl::new(config.token_url()).map_err(|e| IdpClientError::InvalidUrl {
                url: config.token_url(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client_id: config.client_id().to_string(),
            token_url,
            logout_url: config.logout_url(),
            http: http_client(config.timeout())?,
        })
    }
}

#[async_trait]
impl TokenExchange for KeycloakTokenClient {
    #[instrument(skip(self, password))]
    async fn exchange_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, AuthError> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_token_uri(self.token_url.clone());

        let username = ResourceOwnerUsername::new(username.to_string());
        let password = ResourceOwnerPassword::new(password.to_string());

        let response = client
            .exchange_password(&username, &password)
            .request_async(&self.http)
            .await
            .map_err(|e| {
                warn!(error = %e, "Password grant failed");
                AuthError::InvalidCredentials
            })?;

        debug!("Password grant succeeded");
        Ok(TokenPair::new(
            response.access_token().secret().clone(),
            response.refresh_token().map(|t| t.secret().clone()),
        ))
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_token_uri(self.token_url.clone());

        let refresh_token = RefreshToken::new(refresh_token.to_string());

        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
            .map_err(|e| {
                warn!(error = %e, "Refresh grant failed");
                AuthError::RefreshFailed {
                    reason: e.to_string(),
                }
            })?;

        debug!("Refresh grant succeeded");
        Ok(TokenPair::new(
            response.access_token().secret().clone(),
            response.refresh_token().map(|t| t.secret().clone()),
        ))
    }

    #[instrument(skip_all)]
    async fn logout(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let mut form = vec![("client_id", self.client_id.as_str())];
        if let Some(refresh_token) = refresh_token {
            form.push(("refresh_token", refresh_token));
        }

        let response = self
            .http
            .post(&self.logout_url)
            .bearer_auth(access_token)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Logout request failed");
                AuthError::UpstreamUnavailable {
                    reason: e.to_string(),
                }
            })?;

        let status = response.status().as_u16();
        if (200..=204).contains(&status) {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(status, body = %body, "Logout rejected");
            Err(AuthError::LogoutRejected { status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_PATH: &str = "/realms/books/protocol/openid-connect/token";
    const LOGOUT_PATH: &str = "/realms/books/protocol/openid-connect/logout";

    fn client(server: &MockServer) -> KeycloakTokenClient {
        let config = IdentityProviderConfig::new(server.uri(), "books", "admin", "admin");
        KeycloakTokenClient::new(&config).expect("client")
    }

    fn token_body(access: &str, refresh: &str) -> serde_json::Value {
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "token_type": "bearer",
            "expires_in": 300
        })
    }

    #[tokio::test]
    async fn password_grant_returns_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("client_id=Istio"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at", "rt")))
            .mount(&server)
            .await;

        let pair = client(&server)
            .exchange_password("alice", "secret")
            .await
            .expect("tokens");

        assert_eq!(pair.access_token, "at");
        assert_eq!(pair.refresh_token.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn rejected_password_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid user credentials"
            })))
            .mount(&server)
            .await;

        let result = client(&server).exchange_password("alice", "wrong").await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn unreachable_provider_is_invalid_credentials() {
        let config = IdentityProviderConfig::new("http://127.0.0.1:9", "books", "a", "a")
            .with_timeout_seconds(1);
        let client = KeycloakTokenClient::new(&config).expect("client");

        let result = client.exchange_password("alice", "secret").await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn refresh_grant_returns_new_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-2", "rt-2")))
            .mount(&server)
            .await;

        let pair = client(&server).refresh("rt-1").await.expect("tokens");
        assert_eq!(pair.access_token, "at-2");
    }

    #[tokio::test]
    async fn rejected_refresh_is_refresh_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let result = client(&server).refresh("rt-1").await;
        assert!(matches!(result, Err(AuthError::RefreshFailed { .. })));
    }

    #[tokio::test]
    async fn logout_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .and(header("authorization", "Bearer at"))
            .and(body_string_contains("refresh_token=rt"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert_eq!(client(&server).logout("at", Some("rt")).await, Ok(()));
    }

    #[tokio::test]
    async fn logout_reports_rejection_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        assert_eq!(
            client(&server).logout("at", Some("rt")).await,
            Err(AuthError::LogoutRejected { status: 400 })
        );
    }
}
