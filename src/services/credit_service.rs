//! Credit ledger.
//!
//! Free-tier image credits are debited exactly once per delivered result:
//! on reconciliation for the single-image flow, and once per batch for the
//! character flow. The decrement is a single-row atomic update clamped at
//! zero, so racing reconciliations can never drive the balance negative.

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::credits::UserCredits;
use uuid::Uuid;

/// Fetch a user's credit counters, defaulting to zero if no row exists yet.
pub async fn fetch_credits(pool: &DbPool, user_id: Uuid) -> Result<UserCredits, AppError> {
    let credits = sqlx::query_as::<_, UserCredits>(
        "SELECT image_credits, video_credits FROM user_credits WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(credits.unwrap_or(UserCredits {
        image_credits: 0,
        video_credits: 0,
    }))
}

/// Debit one image credit, clamped at zero.
pub async fn debit_image_credit(pool: &DbPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE user_credits
        SET image_credits = GREATEST(image_credits - 1, 0),
            updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}
