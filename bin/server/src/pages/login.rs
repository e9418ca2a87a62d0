//! Login page.

use leptos::prelude::*;

use super::{Shell, to_document};

const LOGIN_SCRIPT: &str = r#"
document.getElementById("login-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const response = await fetch("/login", {
    method: "POST",
    body: new URLSearchParams(new FormData(event.target)),
  });
  const result = await response.json();
  if (result.success) {
    window.location = result.redirect;
  } else {
    document.getElementById("login-error").textContent = result.message;
  }
});
"#;

/// Renders the login form. Submission posts the form to `/login` and follows
/// the returned redirect.
pub fn render() -> String {
    to_document(view! {
        <Shell title="Log in">
            <main class="login-page">
                <h1>"Shelf Gate"</h1>
                <form id="login-form">
                    <label>
                        "Username "
                        <input name="username" autocomplete="username" required=true/>
                    </label>
                    <label>
                        "Password "
                        <input
                            name="password"
                            type="password"
                            autocomplete="current-password"
                            required=true
                        />
                    </label>
                    <button type="submit">"Log in"</button>
                </form>
                <p id="login-error" role="alert"></p>
                <p>
                    <a href="/books">"Browse books"</a>
                </p>
            </main>
            <script inner_html=LOGIN_SCRIPT></script>
        </Shell>
    })
}
