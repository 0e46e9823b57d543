use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::Router;
use migration::MigratorTrait;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, auth};
use service::{
    auth::{repo::seaorm::SeaOrmAuthRepository, repository::memory::InMemoryAuthRepository, repository::AuthRepository, AuthConfig, AuthService},
    maintenance, runtime,
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &configs::ServerConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address {}:{}: {}", cfg.host, cfg.port, e)))
}

/// Pick the repository: PostgreSQL when `database.url` is set, in-memory otherwise.
async fn build_repository(cfg: &configs::DatabaseConfig) -> Result<Arc<dyn AuthRepository>, StartupError> {
    if cfg.is_in_memory() {
        warn!("database.url is empty; using the in-memory user store");
        return Ok(Arc::new(InMemoryAuthRepository::new()));
    }
    let db = models::db::connect_with_config(cfg)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    migration::Migrator::up(&db, None)
        .await
        .map_err(|e| StartupError::Database(format!("migrations failed: {e}")))?;
    info!("migrations applied");
    maintenance::spawn_blacklist_sweeper(db.clone(), maintenance::DEFAULT_PURGE_INTERVAL);
    Ok(Arc::new(SeaOrmAuthRepository::new(db)))
}

/// Wire configuration, storage and routes into an application router.
pub async fn build_app(cfg: &configs::AppConfig) -> Result<Router, StartupError> {
    let repo = build_repository(&cfg.database).await?;
    let auth_cfg = AuthConfig {
        jwt_secret: cfg.auth.jwt_secret.clone(),
        access_ttl_secs: cfg.auth.access_token_lifetime_secs,
        refresh_ttl_secs: cfg.auth.refresh_token_lifetime_secs,
    };
    let state = auth::ServerState::new(AuthService::new(repo, auth_cfg), cfg.app.clone());
    Ok(routes::build_router(state, build_cors()))
}

/// Resolves on Ctrl+C. If the handler cannot be installed the server runs until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received; draining in-flight requests");
}

/// Serve `app` until `shutdown` resolves, then wait for open requests to finish.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server drained");
    Ok(())
}

/// Public entry: build the app from an already validated config and serve it until Ctrl+C.
pub async fn run(cfg: configs::AppConfig) -> anyhow::Result<()> {
    if cfg.app.debug {
        warn!("debug mode: serving media and static files from local directories");
        runtime::ensure_env(&cfg.app.media_root, &cfg.app.static_root).await?;
    }

    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg.server)?;
    info!(%addr, debug = cfg.app.debug, "starting server");
    let listener = TcpListener::bind(addr).await?;
    serve(listener, app, shutdown_signal()).await
}
