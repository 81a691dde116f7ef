//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::types::HealthResponse;
use super::{profile, tasks};
use crate::config::Config;
use crate::scheduler::AiScheduler;
use crate::store::{ProfileStore, StoreError, TaskStore};

/// Shared application state.
pub struct AppState {
    pub tasks: TaskStore,
    pub profile: ProfileStore,
    pub scheduler: AiScheduler,
}

impl AppState {
    /// Open the stores under the configured data directory.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        let paths = config.paths();
        Ok(Self {
            tasks: TaskStore::open(&paths).await?,
            profile: ProfileStore::open(&paths).await?,
            scheduler: AiScheduler::from_config(config),
        })
    }
}

/// Map a store error onto an HTTP status.
pub(super) fn store_error(err: StoreError) -> (StatusCode, String) {
    let status = match &err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::Io { .. } | StoreError::Serialization(_) => {
            tracing::error!("Store failure: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// Build the application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/tasks", tasks::routes())
        .route("/api/categories", get(tasks::list_categories))
        .route("/api/statistics", get(tasks::get_statistics))
        .route("/api/schedule", post(tasks::schedule_tasks))
        .nest("/api/user-profile", profile::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::open(&config).await?);
    tracing::info!(
        "Data directory {}, assistant command '{}'",
        config.data_dir.display(),
        config.assistant_command
    );

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let (status, _) = store_error(StoreError::NotFound("Task x".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = store_error(StoreError::Validation("Title must not be empty".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Title"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let (status, _) = store_error(StoreError::io("Failed to write tasks.json", io));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
