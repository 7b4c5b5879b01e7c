use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use web_cmn::responses::HealthResponse;

use crate::state::AppState;

mod process;

pub const STATIC_ROUTE: &str = "/static";

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/process", post(process::process_images))
        .route("/api/health", get(health))
}

/// The full application: API, static images and middleware.
pub fn app(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let static_files = ServeDir::new(&state.pipeline.config().static_dir);

    Router::new()
        .merge(api_routes())
        .nest_service(STATIC_ROUTE, static_files)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
