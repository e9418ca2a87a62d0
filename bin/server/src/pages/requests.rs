//! Moderation requests: pending books and reviews, and their approval.
//!
//! These routes run behind role synchronization, so the bearer token they
//! forward always carries the caller's current roles.

use axum::{
    extract::{Path, State},
    response::Html,
};
use leptos::prelude::*;
use shelf_gate_platform_access::AuthenticatedUser;
use std::sync::Arc;

use super::{Shell, to_document};
use crate::auth::{AppState, RequireAuth};
use crate::catalog::Payload;
use crate::error::ApiError;

const REQUESTS_SCRIPT: &str = r#"
async function load(kind) {
  const list = document.getElementById("pending-" + kind);
  list.replaceChildren();
  const response = await fetch("/requests/" + kind + "/pending");
  const items = await response.json();
  if (!response.ok) {
    document.getElementById("requests-error").textContent = items.error;
    return;
  }
  for (const item of items) {
    const entry = document.createElement("li");
    entry.textContent = (item.title || item.content || "item " + item.id) + " ";
    for (const action of ["approve", "reject"]) {
      const button = document.createElement("button");
      button.textContent = action;
      button.addEventListener("click", async () => {
        const result = await fetch("/requests/" + kind + "/" + action + "/" + item.id);
        if (!result.ok) {
          document.getElementById("requests-error").textContent = (await result.json()).error;
        }
        load(kind);
      });
      entry.append(button);
    }
    list.append(entry);
  }
}
load("books");
load("reviews");
"#;

/// The moderation page.
pub async fn page(RequireAuth(user): RequireAuth) -> Html<String> {
    Html(render(user.username(), &user.session().display_role()))
}

fn render(username: &str, role: &str) -> String {
    let signed_in = format!("Signed in as {username} ({role}).");

    to_document(view! {
        <Shell title="Requests">
            <main class="requests-page">
                <h1>"Pending requests"</h1>
                <p>{signed_in}</p>
                <section>
                    <h2>"Books"</h2>
                    <ul id="pending-books"></ul>
                </section>
                <section>
                    <h2>"Reviews"</h2>
                    <ul id="pending-reviews"></ul>
                </section>
                <p id="requests-error" role="alert"></p>
            </main>
            <script inner_html=REQUESTS_SCRIPT></script>
        </Shell>
    })
}

async fn forward(
    state: &AppState,
    user: &AuthenticatedUser,
    path: &str,
    failure_message: &'static str,
) -> Result<Payload, ApiError> {
    state
        .catalog
        .get(path, user.bearer_token())
        .await
        .map_err(|e| ApiError::from_catalog(e, failure_message))
}

/// Books awaiting moderation, excluding the caller's own submissions.
pub async fn pending_books(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> Result<Payload, ApiError> {
    let payload = forward(&state, &user, "/books/pending", "Error fetching books data.").await?;
    Ok(payload.without_author(user.session().keycloak_user_id()))
}

/// Reviews awaiting moderation, excluding the caller's own submissions.
pub async fn pending_reviews(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> Result<Payload, ApiError> {
    let payload = forward(
        &state,
        &user,
        "/reviews/pending",
        "Error fetching reviews data.",
    )
    .await?;
    Ok(payload.without_author(user.session().keycloak_user_id()))
}

pub async fn approve_book(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Payload, ApiError> {
    let path = format!("/books/approve/{}", id);
    forward(&state, &user, &path, "Error approving book.").await
}

pub async fn reject_book(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Payload, ApiError> {
    let path = format!("/books/reject/{}", id);
    forward(&state, &user, &path, "Error rejecting book.").await
}

pub async fn approve_review(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Payload, ApiError> {
    let path = format!("/reviews/approve/{}", id);
    forward(&state, &user, &path, "Error approving review.").await
}

pub async fn reject_review(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Payload, ApiError> {
    let path = format!("/reviews/reject/{}", id);
    forward(&state, &user, &path, "Error rejecting review.").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_escapes_identity() {
        let page = render("bob<", "user");
        assert!(page.contains("Signed in as bob&lt; (user)."));
        assert!(page.contains(r#"load("reviews");"#));
    }
}
