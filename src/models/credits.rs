//! Credit balance model.
//!
//! Free-tier users consume image credits; one credit is debited per
//! completed single-image generation and one per character pack, clamped at
//! zero. BYOK users keep their balance untouched.

use serde::Serialize;

/// Credit counters for one user, from the `user_credits` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredits {
    pub image_credits: i32,
    pub video_credits: i32,
}

/// Response body for the credits endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    pub image_credits: i32,
    pub video_credits: i32,
    pub tier: String,
    pub is_lifetime: bool,
}
