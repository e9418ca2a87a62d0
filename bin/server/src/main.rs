use shelf_gate_authz::{KubePolicyStore, MemoryPolicyStore, PolicyStore};
use shelf_gate_platform_access::{RoleDirectory, RoleSynchronizer, TokenExchange};
use shelf_gate_server::{
    auth::{
        self, AppState, KeycloakDirectory, KeycloakTokenClient, MemorySessionStore, SessionStore,
    },
    catalog::CatalogClient,
    config::{PolicyBackend, ServerConfig},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
    })?;
    tracing::info!("Loaded configuration");

    let sessions = session_store(config.database_url.as_deref()).await?;

    // Cleanup expired sessions on startup
    match sessions.delete_expired().await {
        Ok(count) if count > 0 => {
            tracing::info!(
                deleted_sessions = count,
                "Cleaned up expired sessions on startup"
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to cleanup expired sessions on startup");
        }
    }

    // Spawn periodic session cleanup task
    let cleanup_store = sessions.clone();
    let cleanup_interval_secs = config.session.cleanup_interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(cleanup_interval_secs));
        loop {
            interval.tick().await;
            match cleanup_store.delete_expired().await {
                Ok(count) if count > 0 => {
                    tracing::debug!(deleted_sessions = count, "Periodic session cleanup");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to cleanup expired sessions");
                }
            }
        }
    });

    let tokens: Arc<dyn TokenExchange> = Arc::new(KeycloakTokenClient::new(&config.idp)?);
    let directory: Arc<dyn RoleDirectory> = Arc::new(KeycloakDirectory::new(&config.idp)?);
    let app_roles = config.idp.app_roles();
    let synchronizer = RoleSynchronizer::new(
        tokens.clone(),
        directory.clone(),
        app_roles.clone(),
        config.session.duration(),
    )
    .with_refresh_margin(config.session.token_refresh_margin());

    let policies: Arc<dyn PolicyStore> = match config.policy.backend {
        PolicyBackend::Kubernetes => {
            tracing::info!(
                namespace = %config.policy.projection.namespace,
                "Connecting to cluster policy store"
            );
            Arc::new(KubePolicyStore::connect(config.policy.projection.namespace.clone()).await?)
        }
        PolicyBackend::Memory => {
            tracing::warn!("Using in-memory policy store; policies are not enforced");
            Arc::new(MemoryPolicyStore::new())
        }
    };

    let app_state = Arc::new(AppState {
        sessions,
        tokens,
        directory,
        synchronizer,
        catalog: CatalogClient::new(&config.catalog)?,
        policies,
        policy_config: config.policy.projection,
        session_config: config.session,
        client_id: config.idp.client_id().to_string(),
        app_roles,
    });

    let app = shelf_gate_server::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Chooses PostgreSQL when a database URL is configured, memory otherwise.
async fn session_store(database_url: Option<&str>) -> Result<Arc<dyn SessionStore>, BoxError> {
    let Some(url) = database_url else {
        tracing::warn!("No database configured; sessions are kept in memory");
        return Ok(Arc::new(MemorySessionStore::new()));
    };

    // Create database connection pool
    let db_pool = PgPoolOptions::new().max_connections(5).connect(url).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    Ok(Arc::new(auth::db::PgSessionStore::new(db_pool)))
}
