//! Generation job models and API request/response types.
//!
//! This module defines:
//! - `Generation`: Database entity representing one image generation job
//! - `GenerateImageRequest`: Request body for starting a generation
//! - `GenerateImageResponse` / `GenerationStatusResponse`: Response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a generation job record from the database.
///
/// # Database Table
///
/// Maps to the `generations` table. Each job:
/// - Belongs to one user (via `user_id`)
/// - Moves through `pending -> processing -> completed | failed`
/// - Is linked to the provider's own job via `provider_job_id` once
///   submission succeeds
///
/// # Terminal States
///
/// Once `status` is `completed` or `failed` the row is never mutated again;
/// status requests return the stored result without contacting the provider.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Generation {
    /// Unique identifier for this generation job
    pub id: Uuid,

    /// User that owns this job
    ///
    /// Status lookups always filter by `user_id` so one user can never
    /// observe (or even confirm the existence of) another user's jobs.
    pub user_id: Uuid,

    /// Current lifecycle state: pending, processing, completed or failed
    pub status: String,

    /// Final prompt text submitted to the provider
    pub prompt: String,

    /// Display name of the provider model used
    pub model: String,

    /// Public URL of the stored result image (set when completed)
    pub image_url: Option<String>,

    /// Provider-assigned job identifier (set once submission succeeds)
    pub provider_job_id: Option<String>,

    /// Timestamp when the job was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last status change
    pub updated_at: DateTime<Utc>,
}

/// Request body for starting a single-image generation.
///
/// # JSON Example
///
/// ```json
/// {
///   "prompt": "A woman holding a serum bottle in morning light",
///   "characterId": "550e8400-e29b-41d4-a716-446655440000",
///   "productImageUrl": "https://cdn.example.com/products/serum.jpg"
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    /// Final UGC prompt (usually produced by the prompt builder endpoint)
    pub prompt: String,

    /// Character whose likeness anchors the generation; may be a platform
    /// preset
    pub character_id: Uuid,

    /// Optional product photo forwarded as the job's reference image
    #[serde(default)]
    pub product_image_url: Option<String>,
}

/// Response body returned immediately after submission.
///
/// The job is still running at this point; the client polls the status
/// endpoint with `generation_id` until it reaches a terminal state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub generation_id: Uuid,
    pub job_id: String,
    pub used_byok: bool,
    pub status: &'static str,
}

/// Response body of the status (reconciliation) endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatusResponse {
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
