//! Settings page: user role administration.

use axum::{Json, extract::State, response::Html};
use leptos::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use shelf_gate_platform_access::DirectoryUser;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Shell, to_document};
use crate::auth::{AppState, RequireAdmin};
use crate::error::ApiError;

const SETTINGS_SCRIPT: &str = r#"
async function send(method, url, body) {
  const response = await fetch(url, {
    method,
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(body),
  });
  const result = await response.json();
  if (result.success) {
    window.location.reload();
  } else {
    document.getElementById("settings-error").textContent = result.message;
  }
}
for (const row of document.querySelectorAll("tr[data-username]")) {
  const username = row.dataset.username;
  row.querySelector(".change-role").addEventListener("click", () =>
    send("POST", "/settings/change_role", { username, role: row.querySelector(".role-choice").value }));
  row.querySelector(".delete-role").addEventListener("click", () =>
    send("DELETE", "/settings/delete_role", { username }));
}
"#;

/// Request body for changing a user's role.
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    username: String,
    role: String,
}

/// Request body for removing a user's role.
#[derive(Debug, Deserialize)]
pub struct DeleteRoleRequest {
    username: String,
}

/// Lists directory users with their roles.
///
/// Directory failures render an empty table rather than an error page.
pub async fn page(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
) -> Html<String> {
    let (users, roles) = match state.directory.admin_token().await {
        Some(token) => match state.directory.client_id(&token).await {
            Some(client_id) => (
                state.directory.list_users(&token, &client_id).await,
                state.directory.list_roles(&token, &client_id).await,
            ),
            None => {
                warn!("Application client not found, listing no users");
                (Vec::new(), Vec::new())
            }
        },
        None => {
            warn!("No administrative token, listing no users");
            (Vec::new(), Vec::new())
        }
    };

    Html(render(admin.username(), &users, &roles))
}

fn render(username: &str, users: &[DirectoryUser], roles: &[String]) -> String {
    let signed_in = format!("Signed in as {username}.");
    let rows = users
        .iter()
        .map(|user| {
            let options = roles
                .iter()
                .map(|role| view! { <option value=role.clone()>{role.clone()}</option> })
                .collect_view();
            view! {
                <tr data-username=user.username.clone()>
                    <td>{user.username.clone()}</td>
                    <td>{user.role.clone().unwrap_or_default()}</td>
                    <td>
                        <select class="role-choice">{options}</select>
                        <button class="change-role">"Change"</button>
                        <button class="delete-role">"Remove role"</button>
                    </td>
                </tr>
            }
        })
        .collect_view();

    to_document(view! {
        <Shell title="Settings">
            <main class="settings-page">
                <h1>"Settings"</h1>
                <p>{signed_in}</p>
                <table>
                    <thead>
                        <tr>
                            <th>"User"</th>
                            <th>"Role"</th>
                            <th></th>
                        </tr>
                    </thead>
                    <tbody>{rows}</tbody>
                </table>
                <p id="settings-error" role="alert"></p>
            </main>
            <script inner_html=SETTINGS_SCRIPT></script>
        </Shell>
    })
}

/// Replaces a user's client role.
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .directory
        .assign_role(&request.username, &request.role)
        .await?;
    info!(
        admin = %admin.username(),
        username = %request.username,
        role = %request.role,
        "Role changed"
    );
    Ok(Json(json!({"success": true})))
}

/// Removes every client role from a user.
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<DeleteRoleRequest>,
) -> Result<Json<Value>, ApiError> {
    state.directory.revoke_role(&request.username).await?;
    info!(admin = %admin.username(), username = %request.username, "Role removed");
    Ok(Json(json!({"success": true})))
}
