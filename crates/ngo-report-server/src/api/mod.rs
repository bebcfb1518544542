//! HTTP surface: router assembly and serving

use crate::config::Config;
use crate::db;
use crate::features::{self, FeatureState};
use crate::middleware;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::future::Future;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub features: FeatureState,
    /// Present when the stores are PostgreSQL-backed; used by `/health`
    pub db: Option<PgPool>,
}

/// Bind to the configured address and serve until `shutdown` resolves
pub async fn serve<F>(config: &Config, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state, config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_routes = features::router(state.features.clone());

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .merge(feature_routes)
        // Apply layers from innermost to outermost
        .layer(DefaultBodyLimit::max(config.upload.max_bytes))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Response {
    let Some(pool) = state.db.as_ref() else {
        return (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "not configured" })),
        )
            .into_response();
    };

    match db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "connected" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "unreachable" })),
            )
                .into_response()
        },
    }
}
