//! Dashboard page.

use leptos::prelude::*;

use super::{Shell, to_document};

const LOGOUT_SCRIPT: &str = r#"
document.getElementById("logout").addEventListener("click", async () => {
  const response = await fetch("/logout", { method: "POST" });
  const result = await response.json();
  if (result.success) {
    window.location = result.redirect;
  }
});
"#;

/// Renders the dashboard for a logged-in user.
pub fn render(username: &str, role: &str) -> String {
    let greeting = format!("Welcome, {username}!");
    let role = if role.is_empty() {
        "none".to_string()
    } else {
        role.to_string()
    };

    to_document(view! {
        <Shell title="Dashboard">
            <main class="home-page">
                <h1>{greeting}</h1>
                <p>"Signed in with role " <strong>{role}</strong></p>
                <nav>
                    <a href="/books">"Books"</a>
                    <a href="/requests">"Requests"</a>
                    <a href="/settings">"Settings"</a>
                    <a href="/policy/editor">"Permissions"</a>
                </nav>
                <button id="logout">"Log out"</button>
            </main>
            <script inner_html=LOGOUT_SCRIPT></script>
        </Shell>
    })
}
