//! Character-pack orchestration.
//!
//! Creating a character fans out six shot generations that share one
//! identity paragraph. The endpoint is synchronous end-to-end: submissions
//! run concurrently, every shot that got a provider job is polled to a
//! terminal outcome, and only then is the character persisted and the
//! response returned.
//!
//! Failure isolation is per shot. A shot that fails submission, polling,
//! download or upload degrades to a recorded failure reason; it never
//! cancels its siblings. Only the identity-prompt step, which all shots
//! depend on, fails the request as a whole. A character may therefore be
//! persisted with anywhere from zero to six images, and one credit is
//! debited per batch regardless of how many shots made it.

use crate::error::AppError;
use crate::middleware::auth::{AuthContext, Tier};
use crate::models::character::{
    FailedShot, GenerateCharacterRequest, GenerateCharacterResponse, SHOT_TYPES, ShotResult,
    ShotSummary, ShotType,
};
use crate::services::kie_ai::{CreateJobParams, JobStatus, KieAiClient, model_for_shot};
use crate::services::prompt_templates::{assemble_character_prompt, negative_prompt};
use crate::services::{credential_service, credit_service};
use crate::state::AppState;
use crate::watermark::apply_watermark;
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

/// Spacing between status polls for one shot.
pub const GENERATION_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Poll attempts before a shot is abandoned as timed out (~3 minutes).
pub const MAX_POLL_ATTEMPTS: u32 = 60;

/// A shot that was accepted by the provider and is being polled.
struct ActiveShot {
    shot: ShotType,
    job_id: String,
    model: &'static str,
    prompt: String,
}

/// Poll one provider job until it reaches a terminal outcome.
///
/// Returns the result URL on success, or a human-readable reason on
/// failure. Exhausting `max_attempts` is a timeout failure; a provider call
/// that errors out (after its own retries) fails the shot immediately.
pub async fn poll_job_until_done(
    kie: &KieAiClient,
    job_id: &str,
    api_key: &str,
    interval: Duration,
    max_attempts: u32,
) -> Result<String, String> {
    for _ in 0..max_attempts {
        tokio::time::sleep(interval).await;

        match kie.check_status(job_id, api_key).await {
            Ok(status) => match status.status {
                JobStatus::Completed => {
                    if let Some(url) = status.result_url {
                        return Ok(url);
                    }
                    // Completed without a URL: keep polling.
                }
                JobStatus::Failed => {
                    return Err(status
                        .error
                        .unwrap_or_else(|| "Generation failed".to_string()));
                }
                JobStatus::Pending | JobStatus::Processing => {}
            },
            Err(err) => return Err(err.to_string()),
        }
    }

    Err("Generation timed out".to_string())
}

/// Download, watermark (hero shot on free tier only) and store one finished
/// shot, returning its public URL.
async fn finalize_shot(
    state: &AppState,
    auth: &AuthContext,
    character_id: Uuid,
    job: &ActiveShot,
    result_url: &str,
) -> Result<String, String> {
    let mut bytes = state
        .kie
        .download_image(result_url)
        .await
        .map_err(|err| err.to_string())?;

    if auth.tier == Tier::Free && job.shot == ShotType::HeroPortrait {
        bytes = apply_watermark(&bytes);
    }

    let path = format!("{}/{}/{}.jpg", auth.user_id, character_id, job.shot.as_str());
    state
        .storage
        .upload("characters", &path, bytes, "image/jpeg")
        .await
        .map_err(|err| {
            tracing::error!("Upload error for {}: {}", job.shot.as_str(), err);
            "Upload failed".to_string()
        })
}

/// Run the full character-pack flow for one request.
pub async fn create_character(
    state: &AppState,
    auth: &AuthContext,
    request: &GenerateCharacterRequest,
) -> Result<GenerateCharacterResponse, AppError> {
    credential_service::ensure_image_entitlement(&state.pool, auth.user_id, auth.tier).await?;
    let kie_key =
        credential_service::resolve_image_key(&state.pool, &state.config, auth.user_id, auth.tier)
            .await?;

    let gemini_key = credential_service::resolve_prompt_assist_key(
        &state.pool,
        &state.config,
        auth.user_id,
        request.gemini_api_key.clone(),
    )
    .await?
    .ok_or(AppError::MissingPromptAssistKey)?;

    // Every shot depends on the identity paragraph; failure here fails the
    // whole request.
    let identity_prompt = state
        .gemini
        .build_identity_prompt(&request.character_config, &gemini_key)
        .await?;

    // Phase 1: submit all six shots concurrently. A failed submission is a
    // failed shot, nothing more.
    let api_key = kie_key.key.as_str();
    let submissions = join_all(SHOT_TYPES.iter().map(|&shot| {
        let prompt = assemble_character_prompt(&identity_prompt, shot);
        async move {
            let model = model_for_shot(shot);
            match state
                .kie
                .create_job(CreateJobParams {
                    prompt: &prompt,
                    model: model.name,
                    reference_image_url: None,
                    negative_prompt: Some(negative_prompt()),
                    api_key,
                })
                .await
            {
                Ok(job_id) => Ok(ActiveShot {
                    shot,
                    job_id,
                    model: model.name,
                    prompt,
                }),
                Err(err) => {
                    tracing::warn!("Shot {} submission failed: {}", shot.as_str(), err);
                    Err(FailedShot {
                        shot_type: shot,
                        error: err.to_string(),
                    })
                }
            }
        }
    }))
    .await;

    let mut active_jobs = Vec::new();
    let mut failed_shots = Vec::new();
    for submission in submissions {
        match submission {
            Ok(job) => active_jobs.push(job),
            Err(failed) => failed_shots.push(failed),
        }
    }

    let character_id = Uuid::new_v4();

    // Phase 2: poll every accepted shot to a terminal outcome, concurrently
    // and independently. Completion order across shots is unspecified.
    let outcomes = join_all(active_jobs.iter().map(|job| async move {
        match poll_job_until_done(
            &state.kie,
            &job.job_id,
            api_key,
            GENERATION_POLL_INTERVAL,
            MAX_POLL_ATTEMPTS,
        )
        .await
        {
            Ok(result_url) => {
                match finalize_shot(state, auth, character_id, job, &result_url).await {
                    Ok(url) => Ok(ShotResult {
                        shot_type: job.shot,
                        url,
                        model: job.model.to_string(),
                        prompt: job.prompt.clone(),
                    }),
                    Err(reason) => Err(FailedShot {
                        shot_type: job.shot,
                        error: reason,
                    }),
                }
            }
            Err(reason) => Err(FailedShot {
                shot_type: job.shot,
                error: reason,
            }),
        }
    }))
    .await;

    let mut shot_results = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(shot) => shot_results.push(shot),
            Err(failed) => failed_shots.push(failed),
        }
    }

    // Flatten outcomes into the persisted character record. Zero successful
    // shots still persists the character.
    let hero_url = shot_results
        .iter()
        .find(|shot| shot.shot_type == ShotType::HeroPortrait)
        .map(|shot| shot.url.clone());
    let reference_images: Vec<&str> = shot_results.iter().map(|shot| shot.url.as_str()).collect();

    let mut shot_metadata = serde_json::Map::new();
    for shot in &shot_results {
        shot_metadata.insert(
            shot.shot_type.as_str().to_string(),
            json!({
                "url": shot.url,
                "model": shot.model,
                "prompt": shot.prompt,
            }),
        );
    }

    let mut config_json =
        serde_json::to_value(&request.character_config).unwrap_or_else(|_| json!({}));
    if let Some(config) = config_json.as_object_mut() {
        config.insert("identity_prompt".to_string(), json!(identity_prompt));
        config.insert("shot_metadata".to_string(), json!(shot_metadata));
        config.insert("reference_images".to_string(), json!(reference_images));
    }

    let gender_label = if request.character_config.gender == "female" {
        "Wanita"
    } else {
        "Pria"
    };
    let tags: Vec<String> = [
        Some(gender_label.to_string()),
        request.character_config.age_range.clone(),
        request.character_config.outfit.clone(),
    ]
    .into_iter()
    .flatten()
    .filter(|tag| !tag.is_empty())
    .collect();

    let description: String = identity_prompt.chars().take(500).collect();

    sqlx::query(
        r#"
        INSERT INTO characters (
            id, user_id, name, gender, age_range, style, tags,
            description, config, hero_image_url, is_preset
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false)
        "#,
    )
    .bind(character_id)
    .bind(auth.user_id)
    .bind(&request.name)
    .bind(&request.character_config.gender)
    .bind(request.character_config.age_range.as_deref())
    .bind(request.character_config.outfit.as_deref())
    .bind(&tags)
    .bind(&description)
    .bind(&config_json)
    .bind(hero_url.as_deref())
    .execute(&state.pool)
    .await?;

    // One credit per character creation, regardless of per-shot outcomes.
    if auth.tier == Tier::Free {
        credit_service::debit_image_credit(&state.pool, auth.user_id).await?;
    }

    let shots = shot_results
        .into_iter()
        .map(|shot| ShotSummary {
            shot_type: shot.shot_type,
            url: shot.url,
        })
        .collect();

    Ok(GenerateCharacterResponse {
        character_id,
        shots,
        failed_shots: if failed_shots.is_empty() {
            None
        } else {
            Some(failed_shots)
        },
        used_byok: kie_key.used_byok(),
        status: "completed",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_client(server: &MockServer) -> KieAiClient {
        KieAiClient::new(server.uri()).with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn polling_resolves_once_the_job_completes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/jobs/j1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/images/jobs/j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed", "result_url": "https://cdn.example.com/shot.jpg"
            })))
            .mount(&server)
            .await;

        let url = poll_job_until_done(
            &fast_client(&server),
            "j1",
            "k",
            Duration::from_millis(1),
            10,
        )
        .await
        .unwrap();
        assert_eq!(url, "https://cdn.example.com/shot.jpg");
    }

    #[tokio::test]
    async fn polling_gives_up_after_the_attempt_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/jobs/j2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})),
            )
            .expect(3)
            .mount(&server)
            .await;

        let result = poll_job_until_done(
            &fast_client(&server),
            "j2",
            "k",
            Duration::from_millis(1),
            3,
        )
        .await;
        assert_eq!(result, Err("Generation timed out".to_string()));
    }

    #[tokio::test]
    async fn failed_jobs_stop_polling_with_the_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/jobs/j3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed", "error": "content policy"
            })))
            .mount(&server)
            .await;

        let result = poll_job_until_done(
            &fast_client(&server),
            "j3",
            "k",
            Duration::from_millis(1),
            10,
        )
        .await;
        assert_eq!(result, Err("content policy".to_string()));
    }
}
