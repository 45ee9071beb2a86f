//! Route and middleware wiring.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::middleware::{rate_limit_middleware, UploadRateLimiter};
use crate::state::AppState;
use pixbin_core::constants::API_PREFIX;
use pixbin_core::Config;

/// Build the application router.
pub fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
    rate_limiter: Arc<UploadRateLimiter>,
) -> Result<Router> {
    let cors = setup_cors(config)?;

    // The validator enforces the configured limit with a 400; the transport
    // limit sits higher so only grossly oversized bodies are cut off early.
    let body_limit = config.upload.max_file_size_bytes * 2 + 1024 * 1024;

    let api_routes = Router::new()
        .route(&format!("{}/uploads", API_PREFIX), post(handlers::upload::upload_image))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .route("/health", get(handlers::health::health))
        .route(
            "/api/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        )
        .with_state(state);

    let app = api_routes
        .merge(
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs"),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.base.cors_origins.is_empty()
        || config.base.cors_origins.contains(&"*".to_string())
    {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .base
            .cors_origins
            .iter()
            .map(|o| o.parse())
            .collect::<Result<Vec<HeaderValue>, _>>()?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
