#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use shelf_gate_authz::{MemoryPolicyStore, PolicyConfig};
use shelf_gate_platform_access::{IdentityProviderConfig, RoleSynchronizer};
use shelf_gate_server::{
    auth::{AppState, KeycloakDirectory, KeycloakTokenClient, MemorySessionStore},
    catalog::CatalogClient,
    config::{CatalogConfig, SessionConfig},
    router,
};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/realms/books/protocol/openid-connect/token";
pub const LOGOUT_PATH: &str = "/realms/books/protocol/openid-connect/logout";
pub const ADMIN_TOKEN_PATH: &str = "/realms/master/protocol/openid-connect/token";
pub const ADMIN_API: &str = "/admin/realms/books";

/// Builds an unsigned JWT around the given claims.
pub fn jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// An access token for `username` carrying the given realm roles.
pub fn access_token(username: &str, realm_roles: &[&str]) -> String {
    jwt(&json!({
        "sub": format!("kc-{username}"),
        "preferred_username": username,
        "realm_access": {"roles": realm_roles},
    }))
}

pub fn token_body(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
        "expires_in": 300
    })
}

/// The router wired to in-memory stores and mock upstreams.
pub struct TestApp {
    pub router: Router,
    pub idp: MockServer,
    pub catalog: MockServer,
    pub sessions: Arc<MemorySessionStore>,
    pub policies: Arc<MemoryPolicyStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        let idp = MockServer::start().await;
        let catalog = MockServer::start().await;

        let idp_config = IdentityProviderConfig::new(idp.uri(), "books", "admin", "admin-pass");
        let session_config = SessionConfig {
            secure_cookies: false,
            ..SessionConfig::default()
        };

        let tokens = Arc::new(KeycloakTokenClient::new(&idp_config).expect("token client"));
        let directory = Arc::new(KeycloakDirectory::new(&idp_config).expect("directory"));
        let sessions = Arc::new(MemorySessionStore::new());
        let policies = Arc::new(MemoryPolicyStore::new());

        let state = Arc::new(AppState {
            sessions: sessions.clone(),
            tokens: tokens.clone(),
            directory: directory.clone(),
            synchronizer: RoleSynchronizer::new(
                tokens,
                directory,
                idp_config.app_roles(),
                session_config.duration(),
            )
            .with_refresh_margin(session_config.token_refresh_margin()),
            catalog: CatalogClient::new(&CatalogConfig {
                base_url: catalog.uri(),
                timeout_seconds: 5,
            })
            .expect("catalog client"),
            policies: policies.clone(),
            policy_config: PolicyConfig::default(),
            session_config,
            client_id: idp_config.client_id().to_string(),
            app_roles: idp_config.app_roles(),
        });

        Self {
            router: router(state),
            idp,
            catalog,
            sessions,
            policies,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Accepts `username`'s password grant, issuing a token with `realm_roles`.
    pub async fn mount_password_grant(&self, username: &str, realm_roles: &[&str]) {
        self.mount_password_grant_token(username, &access_token(username, realm_roles))
            .await;
    }

    /// Accepts `username`'s password grant, issuing `token`.
    pub async fn mount_password_grant_token(&self, username: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains(format!("username={username}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body(token, &format!("refresh-{username}"))),
            )
            .mount(&self.idp)
            .await;
    }

    /// Logs in and returns the `Cookie` header value for the new session.
    pub async fn login(&self, username: &str, realm_roles: &[&str]) -> String {
        self.login_with_token(username, &access_token(username, realm_roles))
            .await
    }

    /// Logs in as `username` with the identity provider issuing `token`.
    pub async fn login_with_token(&self, username: &str, token: &str) -> String {
        self.mount_password_grant_token(username, token).await;
        let response = self.send(login_request(username, "secret")).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("session cookie")
    }

    /// Mounts the administrative token grant.
    pub async fn mount_admin_token(&self) {
        Mock::given(method("POST"))
            .and(path(ADMIN_TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "admin-token",
                "token_type": "bearer"
            })))
            .mount(&self.idp)
            .await;
    }

    /// Mounts the application client lookup, resolving to `c-1`.
    pub async fn mount_client_lookup(&self) {
        Mock::given(method("GET"))
            .and(path(format!("{ADMIN_API}/clients")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": "c-1", "clientId": "Istio"}])),
            )
            .mount(&self.idp)
            .await;
    }

    /// Mounts the client role mappings of user `kc-{username}`.
    pub async fn mount_role_mappings(&self, username: &str, roles: Value) {
        Mock::given(method("GET"))
            .and(path(format!(
                "{ADMIN_API}/users/kc-{username}/role-mappings/clients/c-1"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(roles))
            .mount(&self.idp)
            .await;
    }
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .expect("request")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn send_json(method: &str, uri: &str, cookie: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// The `name=value` pair of the session cookie set by a response, if any.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| value.starts_with("session="))
        .filter_map(|value| value.split(';').next())
        .map(str::to_string)
        .next()
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn text_body(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
