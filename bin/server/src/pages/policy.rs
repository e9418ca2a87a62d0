//! Policy editor: the permission grid for each guarded resource.

use axum::{
    Json,
    extract::{Path, State},
    response::Html,
};
use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shelf_gate_authz::{
    PermissionEntry, PermissionGrid, Resource, from_policy_document, to_policy_document, upsert,
};
use std::sync::Arc;
use tracing::info;

use super::{Shell, to_document};
use crate::auth::{AppState, RequireAdmin};
use crate::error::ApiError;

const POLICY_SCRIPT: &str = r#"
const RESOURCES = ["books", "reviews"];
async function load() {
  const response = await fetch("/api/permissions");
  const grids = await response.json();
  const container = document.getElementById("grids");
  container.replaceChildren();
  for (const resource of RESOURCES) {
    const section = document.createElement("section");
    const heading = document.createElement("h2");
    heading.textContent = resource;
    section.append(heading);
    for (const entry of grids[resource + "_permissions"]) {
      const label = document.createElement("label");
      const box = document.createElement("input");
      box.type = "checkbox";
      box.checked = entry.granted;
      box.dataset.role = entry.role;
      box.dataset.permission = entry.permission;
      label.append(box, " " + entry.role + " " + entry.permission);
      section.append(label);
    }
    const save = document.createElement("button");
    save.textContent = "Save " + resource;
    save.addEventListener("click", async () => {
      const permissions = [...section.querySelectorAll("input")].map((box) => ({
        role: box.dataset.role,
        permission: box.dataset.permission,
        granted: box.checked,
      }));
      const result = await fetch("/api/permissions/" + resource, {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({ permissions }),
      });
      const body = await result.json();
      document.getElementById("policy-status").textContent =
        body.success ? "Saved " + resource : (body.message || body.error);
    });
    section.append(save);
    container.append(section);
  }
}
load();
"#;

/// The grids of both resources, every cell included.
#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub books_permissions: Vec<PermissionEntry>,
    pub reviews_permissions: Vec<PermissionEntry>,
}

/// A submitted grid.
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsRequest {
    permissions: Vec<PermissionEntry>,
}

/// The permission editor page.
pub async fn editor(RequireAdmin(admin): RequireAdmin) -> Html<String> {
    Html(render(admin.username()))
}

fn render(username: &str) -> String {
    let signed_in = format!("Signed in as {username}.");

    to_document(view! {
        <Shell title="Permissions">
            <main class="policy-page">
                <h1>"Permissions"</h1>
                <p>{signed_in}</p>
                <div id="grids"></div>
                <p id="policy-status" role="status"></p>
            </main>
            <script inner_html=POLICY_SCRIPT></script>
        </Shell>
    })
}

async fn current_grid(state: &AppState, resource: Resource) -> Result<PermissionGrid, ApiError> {
    let document = state.policies.get(&resource.policy_name()).await?;
    Ok(document
        .as_ref()
        .map(|document| from_policy_document(document, &state.policy_config))
        .unwrap_or_default())
}

/// The stored grids. A resource without a policy has nothing granted.
pub async fn get_permissions(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<PermissionsResponse>, ApiError> {
    let books = current_grid(&state, Resource::Books).await?;
    let reviews = current_grid(&state, Resource::Reviews).await?;

    Ok(Json(PermissionsResponse {
        books_permissions: books.to_entries(),
        reviews_permissions: reviews.to_entries(),
    }))
}

/// Projects a submitted grid into the resource's policy and stores it.
pub async fn update_permissions(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(resource): Path<String>,
    Json(request): Json<UpdatePermissionsRequest>,
) -> Result<Json<Value>, ApiError> {
    let resource: Resource = resource.parse()?;
    let grid = PermissionGrid::from_entries(&request.permissions)?;
    let document = to_policy_document(resource, &grid, &state.policy_config);

    let outcome = upsert(state.policies.as_ref(), &document).await?;
    info!(
        admin = %admin.username(),
        resource = %resource,
        outcome = ?outcome,
        "Permissions updated"
    );

    Ok(Json(json!({"success": true})))
}
