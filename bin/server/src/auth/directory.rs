//! Identity-provider administrative API client.
//!
//! Lookups log failures and return `None` or an empty list. Role mutations
//! report failures explicitly, since the administrator must know when a change
//! did not take effect.

use async_trait::async_trait;
use oauth2::{
    ClientId, ResourceOwnerPassword, ResourceOwnerUsername, TokenResponse, TokenUrl,
    basic::BasicClient,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shelf_gate_platform_access::{
    DirectoryUser, IdentityProviderConfig, RoleDirectory, RoleMutationError,
};
use tracing::{debug, error, info, instrument, warn};

use super::token::{IdpClientError, http_client};

/// Users requested per page when listing the directory.
const USERS_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct UserRepresentation {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRepresentation {
    id: String,
    client_id: String,
}

/// The fields the role-mapping endpoints need.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoleRepresentation {
    id: String,
    name: String,
}

/// Keycloak-style administrative client.
#[derive(Clone)]
pub struct KeycloakDirectory {
    admin_client_id: String,
    admin_username: String,
    admin_password: String,
    admin_token_url: TokenUrl,
    api_url: String,
    client_id: String,
    http: reqwest::Client,
}

impl KeycloakDirectory {
    /// Creates a directory client.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin token URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &IdentityProviderConfig) -> Result<Self, IdpClientError> {
        let admin_token_url = TokenUrl::new(config.admin_token_url()).map_err(|e| {
            IdpClientError::InvalidUrl {
                url: config.admin_token_url(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            admin_client_id: config.admin_client_id().to_string(),
            admin_username: config.admin_username().to_string(),
            admin_password: config.admin_password().to_string(),
            admin_token_url,
            api_url: config.admin_api_url(),
            client_id: config.client_id().to_string(),
            http: http_client(config.timeout())?,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        admin_token: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Option<T> {
        let response = match self
            .http
            .get(url)
            .bearer_auth(admin_token)
            .query(query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Directory request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url, status = status.as_u16(), "Directory request rejected");
            debug!(url, body = %body, "Directory rejection body");
            return None;
        }

        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(url, error = %e, "Directory response not understood");
                None
            }
        }
    }

    async fn role_mappings(
        &self,
        admin_token: &str,
        user_id: &str,
        client_id: &str,
    ) -> Option<Vec<RoleRepresentation>> {
        let url = format!(
            "{}/users/{}/role-mappings/clients/{}",
            self.api_url, user_id, client_id
        );
        self.get_json(admin_token, &url, &[]).await
    }

    async fn role_by_name(
        &self,
        admin_token: &str,
        client_id: &str,
        role: &str,
    ) -> Option<RoleRepresentation> {
        let mut url = match reqwest::Url::parse(&self.api_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %self.api_url, error = %e, "Invalid admin API URL");
                return None;
            }
        };
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["clients", client_id, "roles", role]);
        self.get_json(admin_token, url.as_str(), &[]).await
    }

    /// Sends `roles` to the user's client role-mapping endpoint.
    async fn send_mappings(
        &self,
        method: reqwest::Method,
        admin_token: &str,
        user_id: &str,
        client_id: &str,
        roles: &[RoleRepresentation],
    ) -> bool {
        let url = format!(
            "{}/users/{}/role-mappings/clients/{}",
            self.api_url, user_id, client_id
        );
        match self
            .http
            .request(method.clone(), &url)
            .bearer_auth(admin_token)
            .json(roles)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(%method, status = response.status().as_u16(), "Role mapping change rejected");
                false
            }
            Err(e) => {
                warn!(%method, error = %e, "Role mapping request failed");
                false
            }
        }
    }

    /// Resolves the admin token, user id, and client id a mutation needs.
    async fn mutation_context(
        &self,
        username: &str,
    ) -> Result<(String, String, String), RoleMutationError> {
        let admin_token = self
            .admin_token()
            .await
            .ok_or(RoleMutationError::AdminTokenUnavailable)?;
        let user_id = self.user_id(&admin_token, username).await.ok_or_else(|| {
            RoleMutationError::UserNotFound {
                username: username.to_string(),
            }
        })?;
        let client_id = self
            .client_id(&admin_token)
            .await
            .ok_or(RoleMutationError::ClientNotFound)?;
        Ok((admin_token, user_id, client_id))
    }

    /// Removes every client role mapped to the user.
    async fn revoke_all(
        &self,
        admin_token: &str,
        user_id: &str,
        client_id: &str,
        username: &str,
    ) -> Result<(), RoleMutationError> {
        let revoke_failed = || RoleMutationError::RevokeFailed {
            username: username.to_string(),
        };

        let current = self
            .role_mappings(admin_token, user_id, client_id)
            .await
            .ok_or_else(revoke_failed)?;
        if current.is_empty() {
            return Ok(());
        }

        if self
            .send_mappings(reqwest::Method::DELETE, admin_token, user_id, client_id, &current)
            .await
        {
            Ok(())
        } else {
            Err(revoke_failed())
        }
    }
}

#[async_trait]
impl RoleDirectory for KeycloakDirectory {
    #[instrument(skip(self))]
    async fn admin_token(&self) -> Option<String> {
        let client = BasicClient::new(ClientId::new(self.admin_client_id.clone()))
            .set_token_uri(self.admin_token_url.clone());
        let username = ResourceOwnerUsername::new(self.admin_username.clone());
        let password = ResourceOwnerPassword::new(self.admin_password.clone());

        match client
            .exchange_password(&username, &password)
            .request_async(&self.http)
            .await
        {
            Ok(response) => Some(response.access_token().secret().clone()),
            Err(e) => {
                error!(error = %e, "Failed to obtain administrative token");
                None
            }
        }
    }

    #[instrument(skip(self, admin_token))]
    async fn user_id(&self, admin_token: &str, username: &str) -> Option<String> {
        let url = format!("{}/users", self.api_url);
        let users: Vec<UserRepresentation> = self
            .get_json(admin_token, &url, &[("username", username), ("exact", "true")])
            .await?;
        let found = users
            .into_iter()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .map(|user| user.id);
        if found.is_none() {
            warn!("User not found");
        }
        found
    }

    #[instrument(skip(self, admin_token))]
    async fn client_id(&self, admin_token: &str) -> Option<String> {
        let url = format!("{}/clients", self.api_url);
        let clients: Vec<ClientRepresentation> = self
            .get_json(admin_token, &url, &[("clientId", self.client_id.as_str())])
            .await?;
        let found = clients
            .into_iter()
            .find(|client| client.client_id == self.client_id)
            .map(|client| client.id);
        if found.is_none() {
            warn!(client_id = %self.client_id, "Application client not found");
        }
        found
    }

    #[instrument(skip(self, admin_token))]
    async fn user_roles(&self, admin_token: &str, user_id: &str, client_id: &str) -> Vec<String> {
        self.role_mappings(admin_token, user_id, client_id)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|role| role.name)
            .collect()
    }

    #[instrument(skip(self, admin_token))]
    async fn list_users(&self, admin_token: &str, client_id: &str) -> Vec<DirectoryUser> {
        let url = format!("{}/users", self.api_url);
        let max = USERS_PAGE_SIZE.to_string();
        let mut users: Vec<UserRepresentation> = Vec::new();
        loop {
            let first = users.len().to_string();
            let Some(page) = self
                .get_json::<Vec<UserRepresentation>>(
                    admin_token,
                    &url,
                    &[
                        ("briefRepresentation", "true"),
                        ("first", first.as_str()),
                        ("max", max.as_str()),
                    ],
                )
                .await
            else {
                break;
            };
            let full_page = page.len() >= USERS_PAGE_SIZE;
            users.extend(page);
            if !full_page {
                break;
            }
        }

        let mut listed = Vec::with_capacity(users.len());
        for user in users {
            let role = self
                .user_roles(admin_token, &user.id, client_id)
                .await
                .into_iter()
                .next();
            listed.push(DirectoryUser {
                id: user.id,
                username: user.username,
                role,
            });
        }
        listed
    }

    #[instrument(skip(self, admin_token))]
    async fn list_roles(&self, admin_token: &str, client_id: &str) -> Vec<String> {
        let url = format!("{}/clients/{}/roles", self.api_url, client_id);
        self.get_json::<Vec<RoleRepresentation>>(admin_token, &url, &[])
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|role| role.name)
            .collect()
    }

    #[instrument(skip(self))]
    async fn assign_role(&self, username: &str, role: &str) -> Result<(), RoleMutationError> {
        let (admin_token, user_id, client_id) = self.mutation_context(username).await?;

        // Resolved before revoking so an unknown role leaves the user untouched.
        let target = self
            .role_by_name(&admin_token, &client_id, role)
            .await
            .ok_or_else(|| RoleMutationError::RoleNotFound {
                role: role.to_string(),
            })?;

        self.revoke_all(&admin_token, &user_id, &client_id, username)
            .await?;

        if self
            .send_mappings(
                reqwest::Method::POST,
                &admin_token,
                &user_id,
                &client_id,
                std::slice::from_ref(&target),
            )
            .await
        {
            info!("Role assigned");
            Ok(())
        } else {
            error!("Roles revoked but assignment failed; user has no role");
            Err(RoleMutationError::AssignFailedAfterRevoke {
                username: username.to_string(),
                role: role.to_string(),
            })
        }
    }

    #[instrument(skip(self))]
    async fn revoke_role(&self, username: &str) -> Result<(), RoleMutationError> {
        let (admin_token, user_id, client_id) = self.mutation_context(username).await?;
        self.revoke_all(&admin_token, &user_id, &client_id, username)
            .await?;
        info!("Roles revoked");
        Ok(())
    }
}
