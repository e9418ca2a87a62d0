//! Authentication routes for login, logout, and the landing pages.

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use shelf_gate_platform_access::{AuthError, Session, TokenClaims};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    AppState,
    middleware::{OptionalAuth, RequireAuth, removal_cookie, session_cookie, session_id},
};
use crate::error::ApiError;
use crate::pages;

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// Renders the login page, or sends an authenticated caller to the dashboard.
pub async fn index(OptionalAuth(user): OptionalAuth) -> Response {
    match user {
        Some(_) => Redirect::to("/dashboard").into_response(),
        None => Html(pages::login::render()).into_response(),
    }
}

/// Exchanges the submitted credentials for tokens and starts a session.
///
/// The session's roles and username are read from the access token's claims.
/// A token that cannot be decoded is treated as a failed login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .tokens
        .exchange_password(&form.username, &form.password)
        .await
        .inspect_err(|_| info!(username = %form.username, "Login rejected"))?;

    let claims = TokenClaims::decode(&tokens.access_token).map_err(|e| {
        warn!(username = %form.username, error = %e, "Identity provider issued an undecodable token");
        ApiError::InvalidCredentials
    })?;

    let roles = claims.session_roles(&state.client_id, &state.app_roles);
    // The provider's spelling of the username wins over what was typed.
    let username = claims.preferred_username.unwrap_or(form.username);
    let session = Session::authenticated(
        username,
        claims.subject,
        tokens,
        roles,
        state.session_config.duration(),
    );

    state.sessions.save(&session).await.map_err(|e| {
        error!(error = %e, "Failed to save session");
        ApiError::UpstreamUnavailable {
            message: "Session store unavailable",
        }
    })?;

    info!(username = %session.username(), roles = %session.display_role(), "User logged in");

    let jar = jar.add(session_cookie(&state, &session));
    Ok((
        jar,
        Json(json!({"success": true, "redirect": "/dashboard"})),
    ))
}

/// The authenticated landing page.
pub async fn dashboard(RequireAuth(user): RequireAuth) -> Html<String> {
    Html(pages::home::render(user.username(), &user.session().display_role()))
}

/// Ends the session at the identity provider, then locally.
///
/// The local session survives a rejected logout so the caller can retry.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let session = match session_id(&jar) {
        Some(id) => match state.sessions.load(&id).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Failed to load session");
                None
            }
        },
        None => None,
    };

    let Some((session, access_token)) = session.and_then(|session| {
        let token = session.access_token()?.to_string();
        Some((session, token))
    }) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "No active session"})),
        )
            .into_response();
    };

    match state
        .tokens
        .logout(&access_token, session.refresh_token())
        .await
    {
        Ok(()) => {
            if let Err(e) = state.sessions.delete(&session.id()).await {
                error!(error = %e, "Failed to delete session");
            }
            info!(username = %session.username(), "User logged out");
            (
                jar.add(removal_cookie()),
                Json(json!({"success": true, "redirect": "/"})),
            )
                .into_response()
        }
        Err(AuthError::LogoutRejected { status }) => {
            warn!(username = %session.username(), status, "Identity provider rejected logout");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                Json(json!({"success": false, "message": "Logout failed"})),
            )
                .into_response()
        }
        Err(e) => {
            error!(username = %session.username(), error = %e, "Error during logout");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "message": "Error during logout"})),
            )
                .into_response()
        }
    }
}
