//! PostgreSQL-backed session storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shelf_gate_core::SessionId;
use shelf_gate_platform_access::{RoleSet, Session};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use super::store::{SessionStore, SessionStoreError};

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    username: String,
    keycloak_user_id: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    roles: serde_json::Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, sqlx::Error> {
        let id = SessionId::from_str(&self.id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid session id '{}': {}", self.id, e),
            )))
        })?;
        let roles: RoleSet = serde_json::from_value(self.roles).map_err(|e| {
            tracing::warn!(session_id = %self.id, error = %e, "Corrupt roles column");
            sqlx::Error::Decode(Box::new(e))
        })?;

        Ok(Session::with_all_fields(
            id,
            self.username,
            self.keycloak_user_id,
            self.access_token,
            self.refresh_token,
            roles,
            self.created_at,
            self.expires_at,
        ))
    }
}

/// Session store over the `sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new session store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, username, keycloak_user_id, access_token, refresh_token, roles, created_at, expires_at
            FROM sessions
            WHERE id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_session()?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let roles_json =
            serde_json::to_value(session.roles()).map_err(|e| SessionStoreError::Database {
                details: format!("failed to encode roles: {}", e),
            })?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, username, keycloak_user_id, access_token, refresh_token, roles, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username,
                keycloak_user_id = EXCLUDED.keycloak_user_id,
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                roles = EXCLUDED.roles,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session.id().to_string())
        .bind(session.username())
        .bind(session.keycloak_user_id())
        .bind(session.access_token())
        .bind(session.refresh_token())
        .bind(roles_json)
        .bind(session.created_at())
        .bind(session.expires_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionStoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
