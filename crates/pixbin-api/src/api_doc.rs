//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use pixbin_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pixbin API",
        version = "0.1.0",
        description = "Public image upload API (v0). Accepts JPEG, PNG, GIF, WebP, and SVG uploads, optimizes them, and serves them from S3-compatible object storage. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::upload::upload_image,
        handlers::health::health,
    ),
    components(schemas(
        models::UploadResponse,
        error::ErrorResponse,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "uploads", description = "Image upload"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
