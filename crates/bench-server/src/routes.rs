//! Route definitions for the harness API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{handlers, state::AppState};

/// Create the main router.
///
/// Requests matching no route are served from the configured static
/// directory, when there is one.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/api", api_routes());

    if let Some(dir) = &state.config.server.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Benchmark and generation routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/benchmark", post(handlers::run_benchmark))
        .route("/test-concurrency", post(handlers::run_benchmark))
        .route("/generate-prompts", post(handlers::generate_prompts))
}
