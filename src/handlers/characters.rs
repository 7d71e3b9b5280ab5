//! Character-pack HTTP handler.
//!
//! POST /api/generate/character - Create a character with six AI-generated
//! reference shots. Unlike the single-image flow, this endpoint is
//! synchronous: it responds only once every shot has reached a terminal
//! outcome.

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::character::{GenerateCharacterRequest, GenerateCharacterResponse},
    services::character_service,
    state::AppState,
};
use axum::{Extension, Json, extract::State};

/// Create a character from the builder form.
///
/// # Response (200)
///
/// ```json
/// {
///   "characterId": "990e8400-...",
///   "shots": [{"type": "hero_portrait", "url": "https://..."}],
///   "failedShots": [{"shotType": "full_body", "error": "Generation timed out"}],
///   "usedByok": false,
///   "status": "completed"
/// }
/// ```
///
/// Partial failure is a success response: shots that failed are listed with
/// their reasons and the character is persisted with whatever succeeded.
pub async fn generate_character(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<GenerateCharacterRequest>,
) -> Result<Json<GenerateCharacterResponse>, AppError> {
    if !state.limiter.check(&auth.user_id.to_string()).await {
        return Err(AppError::RateLimited);
    }

    if request.name.trim().is_empty() || request.character_config.gender.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Konfigurasi karakter dan nama wajib diisi.".to_string(),
        ));
    }

    let response = character_service::create_character(&state, &auth, &request).await?;
    Ok(Json(response))
}
