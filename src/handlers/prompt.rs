//! UGC prompt-builder HTTP handler.
//!
//! POST /api/prompt - Analyze a product photo and compose a UGC-style
//! generation prompt around the chosen character's identity.

use crate::{
    error::AppError,
    handlers::generations::validate_image_url,
    middleware::auth::AuthContext,
    models::character::Character,
    models::prompt::{BuildPromptRequest, BuildPromptResponse},
    services::credential_service,
    state::AppState,
};
use axum::{Extension, Json, extract::State};

/// Build a UGC prompt from a product photo, a character and optional scene
/// parameters.
pub async fn build_prompt(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BuildPromptRequest>,
) -> Result<Json<BuildPromptResponse>, AppError> {
    if !state.limiter.check(&auth.user_id.to_string()).await {
        return Err(AppError::RateLimited);
    }

    if request.product_image_url.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Product image URL dan karakter wajib diisi.".to_string(),
        ));
    }
    validate_image_url(&request.product_image_url)?;

    let character = sqlx::query_as::<_, Character>(
        "SELECT * FROM characters WHERE id = $1 AND (user_id = $2 OR is_preset = true)",
    )
    .bind(request.character_id)
    .bind(auth.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::CharacterNotFound)?;

    // Prefer the full identity paragraph stored in the character config,
    // fall back to the truncated description.
    let identity_prompt = character
        .config
        .get("identity_prompt")
        .and_then(serde_json::Value::as_str)
        .map(String::from)
        .or(character.description)
        .unwrap_or_default();

    // Stored user key first, then the platform key. No per-request override
    // here; a missing key is a platform configuration problem.
    let gemini_key =
        credential_service::resolve_prompt_assist_key(&state.pool, &state.config, auth.user_id, None)
            .await?
            .ok_or_else(|| AppError::Configuration("PLATFORM_GEMINI_KEY is not set".to_string()))?;

    let analysis = state
        .gemini
        .analyze_product(&request.product_image_url, &gemini_key)
        .await?;

    let scene = request.scene.unwrap_or_default();
    let prompt = state
        .gemini
        .build_ugc_prompt(&analysis, &identity_prompt, &scene, &gemini_key)
        .await?;

    Ok(Json(BuildPromptResponse {
        prompt,
        product_analysis: analysis,
    }))
}
