//! Single-image generation HTTP handlers.
//!
//! This module implements the generation API endpoints:
//! - POST /api/generate/image - Start a generation job
//! - GET /api/generate/:id/status - Poll a job (one reconcile cycle)

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::generation::{GenerateImageRequest, GenerateImageResponse, GenerationStatusResponse},
    services::generation_service,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

/// Validate a client-supplied image URL.
///
/// # Rules
///
/// - Must be a valid URL
/// - Must use HTTP or HTTPS
/// - Maximum 2048 characters
pub(crate) fn validate_image_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::InvalidRequest(
            "URL gambar terlalu panjang.".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::InvalidRequest("URL gambar tidak valid.".to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(AppError::InvalidRequest(
            "URL gambar harus menggunakan HTTP atau HTTPS.".to_string(),
        )),
    }
}

/// Start a single-image generation.
///
/// # Request Body
///
/// ```json
/// {
///   "prompt": "A woman holding a serum bottle in morning light",
///   "characterId": "550e8400-...",
///   "productImageUrl": "https://cdn.example.com/products/serum.jpg"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "generationId": "770e8400-...",
///   "jobId": "kie-job-123",
///   "usedByok": false,
///   "status": "pending"
/// }
/// ```
///
/// The response returns as soon as the provider accepts the job; the client
/// polls the status endpoint until the job is terminal.
pub async fn generate_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<GenerateImageRequest>,
) -> Result<Json<GenerateImageResponse>, AppError> {
    // Rate limit before anything else; a denied request creates no job.
    if !state.limiter.check(&auth.user_id.to_string()).await {
        return Err(AppError::RateLimited);
    }

    if request.prompt.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Prompt dan karakter wajib diisi.".to_string(),
        ));
    }
    if let Some(url) = request.product_image_url.as_deref() {
        validate_image_url(url)?;
    }

    // The character must be the caller's own or a platform preset.
    let hero_image_url: Option<Option<String>> = sqlx::query_scalar(
        "SELECT hero_image_url FROM characters WHERE id = $1 AND (user_id = $2 OR is_preset = true)",
    )
    .bind(request.character_id)
    .bind(auth.user_id)
    .fetch_optional(&state.pool)
    .await?;
    let hero_image_url = hero_image_url.ok_or(AppError::CharacterNotFound)?;

    // Product photo wins as the reference image; otherwise anchor the
    // generation on the character's hero shot.
    let reference = request
        .product_image_url
        .as_deref()
        .or(hero_image_url.as_deref());

    let response =
        generation_service::start_image_generation(&state, &auth, &request, reference).await?;
    Ok(Json(response))
}

/// Poll one generation job.
///
/// Performs a single reconcile cycle (see `generation_service::reconcile`);
/// terminal jobs are answered from the database without contacting the
/// provider.
///
/// # Security
///
/// Returns 404 if the job doesn't exist or belongs to another user.
pub async fn generation_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(generation_id): Path<Uuid>,
) -> Result<Json<GenerationStatusResponse>, AppError> {
    let response = generation_service::reconcile(&state, &auth, generation_id).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_must_be_http_or_https() {
        assert!(validate_image_url("https://cdn.example.com/a.jpg").is_ok());
        assert!(validate_image_url("http://localhost:9000/a.jpg").is_ok());
        assert!(validate_image_url("ftp://example.com/a.jpg").is_err());
        assert!(validate_image_url("not a url").is_err());
    }

    #[test]
    fn oversized_image_urls_are_rejected() {
        let url = format!("https://example.com/{}", "a".repeat(2100));
        assert!(validate_image_url(&url).is_err());
    }
}
