//! Credit balance HTTP handler.

use crate::{
    error::AppError, middleware::auth::AuthContext, models::credits::CreditsResponse,
    services::credit_service, state::AppState,
};
use axum::{Extension, Json, extract::State};

/// Return the caller's credit balances and tier.
///
/// # Response (200)
///
/// ```json
/// {
///   "imageCredits": 3,
///   "videoCredits": 0,
///   "tier": "free",
///   "isLifetime": false
/// }
/// ```
pub async fn get_credits(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CreditsResponse>, AppError> {
    let credits = credit_service::fetch_credits(&state.pool, auth.user_id).await?;

    Ok(Json(CreditsResponse {
        image_credits: credits.image_credits,
        video_credits: credits.video_credits,
        tier: auth.tier.as_str().to_string(),
        is_lifetime: auth.is_lifetime,
    }))
}
