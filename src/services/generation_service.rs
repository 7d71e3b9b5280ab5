//! Single-image generation orchestration.
//!
//! The flow is split across two entry points, mirroring the async contract
//! with the client:
//!
//! - `start_image_generation` validates entitlement, resolves the credential,
//!   persists the job row and submits to the provider, then returns
//!   immediately. The HTTP response never waits for the image.
//! - `reconcile` performs one poll-and-settle cycle. The client calls it
//!   repeatedly; it is the single mutation point after submission and is
//!   idempotent once the job is terminal, which is also what makes billing
//!   exactly-once: the credit is debited in the same cycle that first
//!   observes (and stores) the completed result.

use crate::error::AppError;
use crate::middleware::auth::{AuthContext, Tier};
use crate::models::generation::{
    GenerateImageRequest, GenerateImageResponse, Generation, GenerationStatusResponse,
};
use crate::services::kie_ai::{self, CreateJobParams, JobStatus};
use crate::services::{credential_service, credit_service, prompt_templates};
use crate::state::AppState;
use crate::watermark::apply_watermark;
use uuid::Uuid;

const GENERATION_FAILED_MESSAGE: &str = "Generasi gagal. Coba lagi.";

/// Start a generation job and return its handle.
///
/// `reference_image_url` is the product photo when the client sent one,
/// otherwise the character's hero image (resolved by the handler).
pub async fn start_image_generation(
    state: &AppState,
    auth: &AuthContext,
    request: &GenerateImageRequest,
    reference_image_url: Option<&str>,
) -> Result<GenerateImageResponse, AppError> {
    // Entitlement before any row exists: free tier needs credits, BYOK tier
    // needs a stored key.
    credential_service::ensure_image_entitlement(&state.pool, auth.user_id, auth.tier).await?;
    let resolved =
        credential_service::resolve_image_key(&state.pool, &state.config, auth.user_id, auth.tier)
            .await?;

    let model = kie_ai::DEFAULT_IMAGE_MODEL;

    let generation_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO generations (user_id, status, prompt, model)
        VALUES ($1, 'pending', $2, $3)
        RETURNING id
        "#,
    )
    .bind(auth.user_id)
    .bind(&request.prompt)
    .bind(model.name)
    .fetch_one(&state.pool)
    .await?;

    // Submit to the provider. On failure the row stays pending and the
    // provider error surfaces; nothing has been billed.
    let job_id = state
        .kie
        .create_job(CreateJobParams {
            prompt: &request.prompt,
            model: model.name,
            reference_image_url,
            negative_prompt: Some(prompt_templates::negative_prompt()),
            api_key: &resolved.key,
        })
        .await?;

    sqlx::query(
        "UPDATE generations SET status = 'processing', provider_job_id = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(&job_id)
    .bind(generation_id)
    .execute(&state.pool)
    .await?;

    Ok(GenerateImageResponse {
        generation_id,
        job_id,
        used_byok: resolved.used_byok(),
        status: "pending",
    })
}

fn processing() -> GenerationStatusResponse {
    GenerationStatusResponse {
        status: "processing",
        result_url: None,
        error: None,
    }
}

/// One poll-and-settle cycle for a generation job.
///
/// Terminal rows are returned verbatim without touching the provider, so
/// repeated calls after completion can never re-bill or re-upload.
pub async fn reconcile(
    state: &AppState,
    auth: &AuthContext,
    generation_id: Uuid,
) -> Result<GenerationStatusResponse, AppError> {
    // Owner-filtered lookup; other users' jobs are indistinguishable from
    // nonexistent ones.
    let generation = sqlx::query_as::<_, Generation>(
        "SELECT * FROM generations WHERE id = $1 AND user_id = $2",
    )
    .bind(generation_id)
    .bind(auth.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::GenerationNotFound)?;

    match generation.status.as_str() {
        "completed" => {
            return Ok(GenerationStatusResponse {
                status: "completed",
                result_url: generation.image_url,
                error: None,
            });
        }
        "failed" => {
            return Ok(GenerationStatusResponse {
                status: "failed",
                result_url: None,
                error: Some(GENERATION_FAILED_MESSAGE.to_string()),
            });
        }
        _ => {}
    }

    // Same credential the job was submitted with.
    let resolved =
        credential_service::resolve_image_key(&state.pool, &state.config, auth.user_id, auth.tier)
            .await?;

    let Some(provider_job_id) = generation.provider_job_id.as_deref() else {
        // Submission never reached the provider; nothing to poll yet.
        return Ok(processing());
    };

    let job_status = state.kie.check_status(provider_job_id, &resolved.key).await?;

    match job_status.status {
        JobStatus::Pending | JobStatus::Processing => Ok(processing()),
        JobStatus::Failed => {
            sqlx::query(
                "UPDATE generations SET status = 'failed', updated_at = NOW() WHERE id = $1",
            )
            .bind(generation.id)
            .execute(&state.pool)
            .await?;

            if let Some(reason) = job_status.error {
                tracing::warn!("Generation {} failed at provider: {}", generation.id, reason);
            }

            Ok(GenerationStatusResponse {
                status: "failed",
                result_url: None,
                error: Some(GENERATION_FAILED_MESSAGE.to_string()),
            })
        }
        JobStatus::Completed => {
            let Some(result_url) = job_status.result_url else {
                // Completed without a URL: treat as still processing rather
                // than failing the job on a half-formed response.
                return Ok(processing());
            };

            let mut bytes = state.kie.download_image(&result_url).await?;
            if auth.tier == Tier::Free {
                bytes = apply_watermark(&bytes);
            }

            let path = format!("{}/image/{}.jpg", auth.user_id, generation.id);
            let public_url = state
                .storage
                .upload("generations", &path, bytes, "image/jpeg")
                .await?;

            sqlx::query(
                "UPDATE generations SET status = 'completed', image_url = $1, updated_at = NOW() WHERE id = $2",
            )
            .bind(&public_url)
            .bind(generation.id)
            .execute(&state.pool)
            .await?;

            // Billing is finalized here, exactly once, when the result is
            // actually delivered.
            if auth.tier == Tier::Free {
                credit_service::debit_image_credit(&state.pool, auth.user_id).await?;
            }

            Ok(GenerationStatusResponse {
                status: "completed",
                result_url: Some(public_url),
                error: None,
            })
        }
    }
}
