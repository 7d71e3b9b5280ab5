//! Credential resolution for provider calls.
//!
//! Every generation needs a provider key. Free-tier users run on the
//! platform's shared key and pay with credits; BYOK users run on their own
//! stored key, which is decrypted on demand. Resolution is read-only;
//! entitlement checks and billing live with the orchestration flows.

use crate::config::Config;
use crate::db::DbPool;
use crate::encryption::KeyCipher;
use crate::error::AppError;
use crate::middleware::auth::Tier;
use crate::models::user_api_key::Provider;
use uuid::Uuid;

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// The platform's shared key (free tier, billed in credits)
    Platform,
    /// The user's own stored key
    Byok,
}

/// A decrypted provider key ready for use.
pub struct ResolvedKey {
    pub key: String,
    pub source: KeySource,
}

impl ResolvedKey {
    pub fn used_byok(&self) -> bool {
        self.source == KeySource::Byok
    }
}

/// Build the key cipher from the configured encryption secret.
fn cipher(config: &Config) -> Result<KeyCipher, AppError> {
    let secret = config
        .encryption_secret
        .as_deref()
        .ok_or_else(|| AppError::Configuration("ENCRYPTION_SECRET is not set".to_string()))?;
    Ok(KeyCipher::from_hex_secret(secret)?)
}

/// Fetch and decrypt the user's stored key for a provider, if any.
pub async fn stored_key(
    pool: &DbPool,
    config: &Config,
    user_id: Uuid,
    provider: Provider,
) -> Result<Option<String>, AppError> {
    let encrypted: Option<String> = sqlx::query_scalar(
        "SELECT encrypted_key FROM user_api_keys WHERE user_id = $1 AND provider = $2",
    )
    .bind(user_id)
    .bind(provider.as_str())
    .fetch_optional(pool)
    .await?;

    match encrypted {
        Some(encrypted) => Ok(Some(cipher(config)?.decrypt(&encrypted)?)),
        None => Ok(None),
    }
}

/// Verify the user may start image generation work at all.
///
/// Free tier requires a positive credit balance; BYOK tier requires a stored
/// image-provider key. Checked before any job row is created.
pub async fn ensure_image_entitlement(
    pool: &DbPool,
    user_id: Uuid,
    tier: Tier,
) -> Result<(), AppError> {
    match tier {
        Tier::Free => {
            let credits: Option<i32> =
                sqlx::query_scalar("SELECT image_credits FROM user_credits WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?;
            if credits.unwrap_or(0) <= 0 {
                return Err(AppError::OutOfCredits);
            }
            Ok(())
        }
        Tier::Byok => {
            let has_key: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM user_api_keys WHERE user_id = $1 AND provider = $2)",
            )
            .bind(user_id)
            .bind(Provider::KieAi.as_str())
            .fetch_one(pool)
            .await?;
            if !has_key {
                return Err(AppError::MissingApiKey);
            }
            Ok(())
        }
    }
}

/// Resolve the image-provider key for this user's tier.
pub async fn resolve_image_key(
    pool: &DbPool,
    config: &Config,
    user_id: Uuid,
    tier: Tier,
) -> Result<ResolvedKey, AppError> {
    match tier {
        Tier::Free => {
            let key = config.platform_kie_ai_key.clone().ok_or_else(|| {
                AppError::Configuration("PLATFORM_KIE_AI_KEY is not set".to_string())
            })?;
            Ok(ResolvedKey {
                key,
                source: KeySource::Platform,
            })
        }
        Tier::Byok => {
            let key = stored_key(pool, config, user_id, Provider::KieAi)
                .await?
                .ok_or(AppError::MissingApiKey)?;
            Ok(ResolvedKey {
                key,
                source: KeySource::Byok,
            })
        }
    }
}

/// Resolve a prompt-assist (Gemini) key.
///
/// Order: an explicit per-request key wins, then the user's stored key, then
/// the platform key. Returns `None` when nothing is available; the caller
/// decides which error that is (the character flow treats it as a setup
/// problem, the prompt flow as a platform configuration problem).
pub async fn resolve_prompt_assist_key(
    pool: &DbPool,
    config: &Config,
    user_id: Uuid,
    override_key: Option<String>,
) -> Result<Option<String>, AppError> {
    if let Some(key) = override_key.filter(|key| !key.is_empty()) {
        return Ok(Some(key));
    }
    if let Some(key) = stored_key(pool, config, user_id, Provider::Gemini).await? {
        return Ok(Some(key));
    }
    Ok(config.platform_gemini_key.clone())
}

/// Encrypt and store a provider key, replacing any previous one.
pub async fn save_key(
    pool: &DbPool,
    config: &Config,
    user_id: Uuid,
    provider: Provider,
    key: &str,
) -> Result<(), AppError> {
    let encrypted = cipher(config)?.encrypt(key)?;

    sqlx::query(
        r#"
        INSERT INTO user_api_keys (user_id, provider, encrypted_key, is_valid, last_validated_at)
        VALUES ($1, $2, $3, true, NOW())
        ON CONFLICT (user_id, provider) DO UPDATE SET
            encrypted_key = EXCLUDED.encrypted_key,
            is_valid = true,
            last_validated_at = NOW(),
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(provider.as_str())
    .bind(&encrypted)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a stored provider key. Returns whether a row existed.
pub async fn delete_key(
    pool: &DbPool,
    user_id: Uuid,
    provider: Provider,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM user_api_keys WHERE user_id = $1 AND provider = $2")
        .bind(user_id)
        .bind(provider.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
