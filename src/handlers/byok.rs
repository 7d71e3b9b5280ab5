//! BYOK key management HTTP handlers.
//!
//! This module implements the bring-your-own-key endpoints:
//! - POST /api/byok - Save (upsert) an encrypted provider key
//! - DELETE /api/byok - Remove a stored key
//! - POST /api/byok/validate - Probe a key against the provider (public,
//!   never stores anything)

use crate::{
    error::AppError,
    middleware::auth::{AuthContext, Tier},
    models::user_api_key::{
        DeleteKeyRequest, KeyValidationResponse, SaveKeyRequest, SaveKeyResponse,
        ValidateKeyRequest,
    },
    services::{credential_service, key_validation},
    state::AppState,
};
use axum::{Extension, Json, extract::State};

/// Save a provider key for the authenticated user.
///
/// # Security
///
/// - Requires the BYOK lifetime tier
/// - The key is encrypted before it touches the database
/// - Saving again for the same provider replaces the previous key
pub async fn save_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SaveKeyRequest>,
) -> Result<Json<SaveKeyResponse>, AppError> {
    if request.key.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Provider dan key wajib diisi.".to_string(),
        ));
    }

    if auth.tier != Tier::Byok || !auth.is_lifetime {
        return Err(AppError::ByokRequired);
    }

    credential_service::save_key(
        &state.pool,
        &state.config,
        auth.user_id,
        request.provider,
        &request.key,
    )
    .await?;

    Ok(Json(SaveKeyResponse {
        success: true,
        message: Some("API key berhasil disimpan!".to_string()),
    }))
}

/// Delete a stored provider key.
pub async fn delete_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DeleteKeyRequest>,
) -> Result<Json<SaveKeyResponse>, AppError> {
    let removed =
        credential_service::delete_key(&state.pool, auth.user_id, request.provider).await?;
    if !removed {
        tracing::debug!(
            "No {} key to delete for user {}",
            request.provider.as_str(),
            auth.user_id
        );
    }

    Ok(Json(SaveKeyResponse {
        success: true,
        message: None,
    }))
}

/// Probe a key against its provider without storing it.
///
/// Always returns 200 with a `{valid, error?}` body; provider connectivity
/// problems are reported in `error`, not as an HTTP failure.
pub async fn validate_key(
    State(state): State<AppState>,
    Json(request): Json<ValidateKeyRequest>,
) -> Result<Json<KeyValidationResponse>, AppError> {
    if request.key.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Provider dan key wajib diisi.".to_string(),
        ));
    }

    let result =
        key_validation::validate_key(&state.http, &state.config, request.provider, &request.key)
            .await;
    Ok(Json(result))
}
