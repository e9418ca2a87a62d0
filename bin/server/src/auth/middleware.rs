//! Authentication middleware and extractors for Axum.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use shelf_gate_core::SessionId;
use shelf_gate_platform_access::{
    AuthenticatedUser, AuthorizationError, Session, SyncOutcome, require_admin,
};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{debug, error, info, warn};

use super::AppState;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

/// Reads the session id from the cookie jar.
pub(crate) fn session_id(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}

/// Builds the session cookie, valid for the session's full lifetime.
pub(crate) fn session_cookie(state: &AppState, session: &Session) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.id().to_string()))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(state.session_config.duration_minutes))
        .build()
}

/// A cookie that makes the browser drop the session cookie.
pub(crate) fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

async fn load_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<Session>, AuthRejection> {
    let Some(id) = session_id(jar) else {
        return Ok(None);
    };
    state.sessions.load(&id).await.map_err(|e| {
        error!(error = %e, "Failed to load session");
        AuthRejection::InternalError
    })
}

/// Extractor for requiring an authenticated user.
///
/// If the user is not authenticated, they will be redirected to the login page.
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::InternalError)?;

        let session = load_session(&app_state, &jar)
            .await?
            .ok_or(AuthRejection::NotAuthenticated)?;

        if !session.is_authenticated() {
            return Err(AuthRejection::NotAuthenticated);
        }

        Ok(RequireAuth(AuthenticatedUser::new(session)))
    }
}

/// Extractor for optionally getting the authenticated user.
///
/// Returns None if the user is not authenticated.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match RequireAuth::from_request_parts(parts, state).await {
            Ok(RequireAuth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

/// Extractor for requiring an authenticated admin user.
///
/// The admin role is looked up in the session's cached roles and in the
/// claims of its access token, decoded on every request. A token that cannot
/// be decoded destroys the session.
pub struct RequireAdmin(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        match require_admin(user.session()) {
            Ok(_) => Ok(RequireAdmin(user)),
            Err(AuthorizationError::NotAuthenticated) => Err(AuthRejection::NotAuthenticated),
            Err(AuthorizationError::AdminRequired) => {
                warn!(username = %user.username(), "Admin access denied");
                Err(AuthRejection::AdminRequired)
            }
            Err(AuthorizationError::SessionInvalid { reason }) => {
                warn!(username = %user.username(), reason = %reason, "Destroying session with unreadable token");
                let app_state = Arc::<AppState>::from_ref(state);
                if let Err(e) = app_state.sessions.delete(&user.session().id()).await {
                    error!(error = %e, "Failed to delete invalid session");
                }
                Err(AuthRejection::SessionInvalid)
            }
        }
    }
}

/// Re-resolves the caller's roles before the wrapped routes run.
///
/// Requests without a session pass through; the route's extractor decides
/// what to do with them. A session that cannot be kept consistent is destroyed
/// and the caller is sent to log in again.
pub async fn sync_roles(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let mut session = match load_session(&state, &jar).await {
        Ok(Some(session)) => session,
        Ok(None) => return next.run(request).await,
        Err(rejection) => return rejection.into_response(),
    };

    let had_user_id = session.keycloak_user_id().is_some();
    match state.synchronizer.synchronize(&mut session).await {
        SyncOutcome::Invalidated => {
            info!(username = %session.username(), "Session invalidated during role synchronization");
            if let Err(e) = state.sessions.delete(&session.id()).await {
                error!(error = %e, "Failed to delete invalidated session");
            }
            return AuthRejection::SessionInvalid.into_response();
        }
        SyncOutcome::Refreshed { roles } => {
            debug!(roles = %roles.display(), "Saving refreshed session");
            if let Err(e) = state.sessions.save(&session).await {
                error!(error = %e, "Failed to save refreshed session");
                return AuthRejection::InternalError.into_response();
            }
            // The cookie lifetime restarts with the session's.
            let jar = CookieJar::new().add(session_cookie(&state, &session));
            return (jar, next.run(request).await).into_response();
        }
        SyncOutcome::Unchanged | SyncOutcome::Skipped | SyncOutcome::Unauthenticated => {
            // The directory lookup may have filled in the user id.
            if !had_user_id && session.keycloak_user_id().is_some() {
                if let Err(e) = state.sessions.save(&session).await {
                    warn!(error = %e, "Failed to save session");
                }
            }
        }
    }

    next.run(request).await
}

/// Rejection type for authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated,
    /// The session was destroyed; the cookie is removed as well.
    SessionInvalid,
    AdminRequired,
    InternalError,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => Redirect::to("/").into_response(),
            Self::SessionInvalid => {
                (CookieJar::new().add(removal_cookie()), Redirect::to("/")).into_response()
            }
            Self::AdminRequired => (
                StatusCode::FORBIDDEN,
                Json(json!({"error": "Admin access required"})),
            )
                .into_response(),
            Self::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
