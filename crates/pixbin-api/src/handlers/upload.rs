//! Image upload handler.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_multipart_file;
use pixbin_core::{generate_object_key, sanitize_filename, AppError, ObjectMetadata, UploadResponse};

/// Upload an image.
///
/// Pipeline: multipart extraction, validation (size, MIME allowlist, magic
/// bytes), optimization on a blocking thread, then a single object-store
/// write under a collision-resistant key.
///
/// # Errors
/// - `AppError::FileTooLarge` / `UnsupportedFormat` / `ContentMismatch` /
///   `InvalidInput` - rejected uploads (400)
/// - `AppError::StorageWrite` - object store failure (500)
#[utoipa::path(
    post,
    path = "/api/v0/uploads",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image uploaded successfully", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let (data, original_filename, content_type) = extract_multipart_file(multipart)
        .await
        .map_err(HttpAppError::from)?;

    let original_size = data.len() as u64;

    let format = state
        .validator
        .validate(&content_type, &data)
        .map_err(HttpAppError::from)?;

    tracing::debug!(
        filename = %original_filename,
        content_type = %content_type,
        size_bytes = original_size,
        format = ?format,
        "Upload validated"
    );

    // Re-encoding is CPU-bound; keep it off the async runtime.
    let optimizer = state.optimizer.clone();
    let optimized = tokio::task::spawn_blocking(move || optimizer.optimize(data, format))
        .await
        .map_err(|e| HttpAppError(AppError::Internal(format!("Optimization task failed: {}", e))))?;

    let original_name = sanitize_filename(&original_filename);
    let key = generate_object_key(&original_filename, format);

    let stored = state
        .storage
        .put(
            &key,
            optimized.bytes,
            format.mime_type(),
            ObjectMetadata {
                original_name: original_name.clone(),
                optimized: optimized.optimized,
            },
        )
        .await
        .map_err(HttpAppError::from)?;

    let file_name = stored
        .key
        .rsplit('/')
        .next()
        .unwrap_or(stored.key.as_str())
        .to_string();

    tracing::info!(
        key = %stored.key,
        url = %stored.url,
        original_bytes = original_size,
        stored_bytes = stored.size_bytes,
        optimized = optimized.optimized,
        "Upload stored"
    );

    Ok(Json(UploadResponse {
        id: Uuid::new_v4(),
        url: stored.url,
        file_name,
        original_name,
        size: stored.size_bytes,
        original_size,
        content_type: stored.content_type,
        optimized: optimized.optimized,
        uploaded_at: stored.uploaded_at,
    }))
}
