//! Route configuration and setup.
//!
//! Health checks live in [health](health); everything else maps one route per
//! handler in [crate::handlers].

mod health;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Request bodies are small JSON documents; anything larger is noise.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(&state.cors_origins)?;

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let app = Router::new()
        .route("/convert", post(handlers::convert::convert))
        .route("/status", get(handlers::status::list_status))
        .route("/status/{id}", get(handlers::status::get_status))
        .route("/files", get(handlers::library::list_files))
        .route("/files/{id}", delete(handlers::file_delete::delete_file))
        .route(
            "/folders",
            get(handlers::folders::list_folders).post(handlers::folders::create_folder),
        )
        .route("/folders/{name}", delete(handlers::folders::delete_folder))
        .route("/download/{id}", get(handlers::download::download_file))
        .route("/play/{id}", get(handlers::download::play_file))
        .route("/media/{*key}", get(handlers::public_file::get_public_media))
        .route(
            "/owner",
            get(handlers::owner::get_owner).post(handlers::owner::reassign_owner),
        )
        .route("/stats", get(handlers::library::get_stats))
        .route("/health", get(health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .with_state(state)
        .merge(
            utoipa_rapidoc::RapiDoc::new("/api-docs/openapi.json").path("/rapidoc"),
        )
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

fn setup_cors(origins: &[String]) -> Result<CorsLayer, anyhow::Error> {
    let cors = if origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let parsed: Result<Vec<HeaderValue>, _> = origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(parsed.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
