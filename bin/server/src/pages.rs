//! Page views and the routes behind them.
//!
//! Each module renders one page with leptos on the server, along with the
//! JSON endpoints that page calls. Dynamic content is fetched by small inline
//! scripts.

use leptos::prelude::*;

pub mod books;
pub mod home;
pub mod login;
pub mod policy;
pub mod requests;
pub mod settings;

/// The document shell every page is rendered into.
#[component]
pub(crate) fn Shell(title: &'static str, children: Children) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <title>{format!("{title} | Shelf Gate")}</title>
            </head>
            <body>{children()}</body>
        </html>
    }
}

/// Renders a page view to an HTML document.
pub(crate) fn to_document(page: impl IntoView) -> String {
    page.to_html()
}
