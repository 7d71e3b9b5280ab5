//! Kie AI image-generation client.
//!
//! Wraps the provider's HTTP API: job creation, status polling and result
//! download. The provider's wire format is loosely specified: job IDs,
//! status strings and result URLs appear under several possible field names,
//! sometimes nested under `data`. Every response goes through an explicit
//! normalization step, kept separate from the retry logic so each can be
//! tested on its own.
//!
//! # Retry Policy
//!
//! `create_job` and `check_status` make up to 3 attempts:
//! - HTTP 429 honors a `Retry-After` header (seconds) when present, else
//!   backs off `attempt * base delay`
//! - Any other failure (network error, non-2xx) backs off `attempt * base
//!   delay` and retries
//! - After the final attempt the last error is surfaced
//!
//! Image downloads are not retried.

use crate::error::ProviderError;
use crate::models::character::ShotType;
use serde_json::{Value, json};
use std::time::Duration;

/// Total attempts per provider call (first try included).
const MAX_RETRIES: u32 = 3;

/// Base backoff unit; attempt N waits N times this.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Per-request timeout for provider calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A provider model with its pricing-table entry.
#[derive(Debug, Clone, Copy)]
pub struct KieModel {
    /// Display name sent to the API and stored on job rows
    pub name: &'static str,
    /// Provider credits consumed per image
    pub credits: f32,
    /// Approximate cost per image in IDR
    pub cost_idr: u32,
}

pub const NANO_BANANA_PRO: KieModel = KieModel {
    name: "Nano Banana Pro",
    credits: 8.0,
    cost_idr: 640,
};

pub const NANO_BANANA: KieModel = KieModel {
    name: "Nano Banana",
    credits: 4.0,
    cost_idr: 320,
};

pub const SEEDREAM: KieModel = KieModel {
    name: "Seedream 4.0",
    credits: 3.5,
    cost_idr: 280,
};

/// Model used for single-image generations.
pub const DEFAULT_IMAGE_MODEL: KieModel = NANO_BANANA_PRO;

/// Which model renders each character shot. Hero and skin-detail shots use
/// the premium model; the rest use cheaper tiers.
pub fn model_for_shot(shot: ShotType) -> KieModel {
    match shot {
        ShotType::HeroPortrait => NANO_BANANA_PRO,
        ShotType::Profile34 => NANO_BANANA,
        ShotType::Talking => NANO_BANANA,
        ShotType::FullBody => SEEDREAM,
        ShotType::SkinDetail => NANO_BANANA_PRO,
        ShotType::ProductInteraction => NANO_BANANA,
    }
}

/// Canonical provider job states after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Normalized result of one status poll.
#[derive(Debug, Clone)]
pub struct JobStatusResult {
    pub status: JobStatus,
    pub result_url: Option<String>,
    pub error: Option<String>,
}

/// Parameters for creating a generation job.
#[derive(Debug)]
pub struct CreateJobParams<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub reference_image_url: Option<&'a str>,
    pub negative_prompt: Option<&'a str>,
    pub api_key: &'a str,
}

/// Map the provider's status vocabulary onto the four canonical states.
///
/// Matching is case-insensitive and deliberately permissive: anything
/// unrecognized is treated as `Pending` so an unexpected vocabulary change
/// degrades to more polling instead of a spurious failure.
pub fn normalize_status(raw: &str) -> JobStatus {
    let raw = raw.to_lowercase();
    if raw.contains("complet") || raw == "done" || raw == "success" {
        JobStatus::Completed
    } else if raw.contains("fail") || raw == "error" {
        JobStatus::Failed
    } else if raw.contains("process") || raw == "running" || raw == "in_progress" {
        JobStatus::Processing
    } else {
        JobStatus::Pending
    }
}

/// HTTP client for the Kie AI API.
pub struct KieAiClient {
    http: reqwest::Client,
    base_url: String,
    retry_delay: Duration,
}

impl KieAiClient {
    /// Create a client for the given API base URL (no trailing slash).
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the backoff base delay (tests use a near-zero delay).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Issue one provider request with the retry policy applied.
    async fn request_json(
        &self,
        method: reqwest::Method,
        path: &str,
        api_key: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..MAX_RETRIES {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(api_key)
                .header(reqwest::header::CONTENT_TYPE, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) if response.status().as_u16() == 429 => {
                    // Rate limited: honor Retry-After when the provider sends
                    // one, otherwise use the linear backoff.
                    let wait = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or(self.retry_delay * (attempt + 1));

                    tracing::warn!("Kie AI rate limited on {}, waiting {:?}", path, wait);
                    last_error = Some(ProviderError::Api {
                        status: 429,
                        body: "rate limited".to_string(),
                    });
                    tokio::time::sleep(wait).await;
                }
                Ok(response) if !response.status().is_success() => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    last_error = Some(ProviderError::Api { status, body });
                    if attempt + 1 < MAX_RETRIES {
                        tokio::time::sleep(self.retry_delay * (attempt + 1)).await;
                    }
                }
                Ok(response) => {
                    return response.json().await.map_err(ProviderError::Request);
                }
                Err(err) => {
                    last_error = Some(ProviderError::Request(err));
                    if attempt + 1 < MAX_RETRIES {
                        tokio::time::sleep(self.retry_delay * (attempt + 1)).await;
                    }
                }
            }
        }

        Err(last_error.expect("at least one attempt was made"))
    }

    /// Create a generation job, returning the provider's job identifier.
    ///
    /// The job ID is looked for under `data.job_id`, `data.id`, `job_id`
    /// and `id`, in that order.
    pub async fn create_job(&self, params: CreateJobParams<'_>) -> Result<String, ProviderError> {
        let mut body = json!({
            "prompt": params.prompt,
            "model": params.model,
        });
        if let Some(reference) = params.reference_image_url {
            body["reference_image_url"] = json!(reference);
        }
        if let Some(negative) = params.negative_prompt {
            body["negative_prompt"] = json!(negative);
        }

        let response = self
            .request_json(
                reqwest::Method::POST,
                "/images/generate",
                params.api_key,
                Some(&body),
            )
            .await?;

        extract_job_id(&response).ok_or(ProviderError::MissingJobId)
    }

    /// Poll one job, normalizing status, result URL and error message.
    pub async fn check_status(
        &self,
        job_id: &str,
        api_key: &str,
    ) -> Result<JobStatusResult, ProviderError> {
        let response = self
            .request_json(
                reqwest::Method::GET,
                &format!("/images/jobs/{job_id}"),
                api_key,
                None,
            )
            .await?;

        // Some response shapes nest the payload under "data".
        let inner = match response.get("data") {
            Some(data) if data.is_object() => data,
            _ => &response,
        };

        let raw_status = inner
            .get("status")
            .or_else(|| inner.get("state"))
            .and_then(Value::as_str)
            .unwrap_or("pending");
        let status = normalize_status(raw_status);

        let result_url = ["result_url", "output_url", "image_url"]
            .iter()
            .find_map(|field| inner.get(*field).and_then(Value::as_str))
            .map(String::from);

        let error = inner
            .get("error")
            .or_else(|| response.get("message"))
            .and_then(Value::as_str)
            .map(String::from);

        Ok(JobStatusResult {
            status,
            result_url,
            error: if status == JobStatus::Failed { error } else { None },
        })
    }

    /// Download a finished image. Not retried.
    pub async fn download_image(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Download {
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn extract_job_id(response: &Value) -> Option<String> {
    let data = response.get("data");
    [
        data.and_then(|d| d.get("job_id")),
        data.and_then(|d| d.get("id")),
        response.get("job_id"),
        response.get("id"),
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_str)
    .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> KieAiClient {
        KieAiClient::new(server.uri()).with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn status_vocabulary_normalizes_to_canonical_states() {
        for raw in ["done", "success", "completed", "COMPLETED", "completing"] {
            assert_eq!(normalize_status(raw), JobStatus::Completed, "{raw}");
        }
        for raw in ["running", "in_progress", "processing", "PROCESSING"] {
            assert_eq!(normalize_status(raw), JobStatus::Processing, "{raw}");
        }
        for raw in ["failed", "error", "failure"] {
            assert_eq!(normalize_status(raw), JobStatus::Failed, "{raw}");
        }
        for raw in ["queued", "waiting", "something_new", ""] {
            assert_eq!(normalize_status(raw), JobStatus::Pending, "{raw}");
        }
    }

    #[test]
    fn job_id_extracted_from_all_known_shapes() {
        let shapes = [
            json!({"data": {"job_id": "j1"}}),
            json!({"data": {"id": "j2"}}),
            json!({"job_id": "j3"}),
            json!({"id": "j4"}),
        ];
        let expected = ["j1", "j2", "j3", "j4"];
        for (shape, id) in shapes.iter().zip(expected) {
            assert_eq!(extract_job_id(shape).as_deref(), Some(id));
        }
        assert_eq!(extract_job_id(&json!({"ok": true})), None);
    }

    #[tokio::test]
    async fn create_job_returns_nested_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"job_id": "job-123"}})),
            )
            .mount(&server)
            .await;

        let job_id = test_client(&server)
            .create_job(CreateJobParams {
                prompt: "test prompt",
                model: "Nano Banana Pro",
                reference_image_url: None,
                negative_prompt: Some("no cartoon"),
                api_key: "k",
            })
            .await
            .unwrap();

        assert_eq!(job_id, "job-123");
    }

    #[tokio::test]
    async fn create_job_without_job_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let result = test_client(&server)
            .create_job(CreateJobParams {
                prompt: "p",
                model: "m",
                reference_image_url: None,
                negative_prompt: None,
                api_key: "k",
            })
            .await;

        assert!(matches!(result, Err(ProviderError::MissingJobId)));
    }

    #[tokio::test]
    async fn persistent_rate_limiting_stops_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generate"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .expect(3)
            .mount(&server)
            .await;

        let result = test_client(&server)
            .create_job(CreateJobParams {
                prompt: "p",
                model: "m",
                reference_image_url: None,
                negative_prompt: None,
                api_key: "k",
            })
            .await;

        assert!(matches!(
            result,
            Err(ProviderError::Api { status: 429, .. })
        ));
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/jobs/j1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let result = test_client(&server).check_status("j1", "k").await;
        assert!(matches!(
            result,
            Err(ProviderError::Api { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn transient_rate_limit_recovers_on_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generate"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/images/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-9"})))
            .mount(&server)
            .await;

        let job_id = test_client(&server)
            .create_job(CreateJobParams {
                prompt: "p",
                model: "m",
                reference_image_url: None,
                negative_prompt: None,
                api_key: "k",
            })
            .await
            .unwrap();

        assert_eq!(job_id, "job-9");
    }

    #[tokio::test]
    async fn check_status_normalizes_nested_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/jobs/j2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"state": "SUCCESS", "output_url": "https://cdn.example.com/out.jpg"}
            })))
            .mount(&server)
            .await;

        let status = test_client(&server).check_status("j2", "k").await.unwrap();
        assert_eq!(status.status, JobStatus::Completed);
        assert_eq!(
            status.result_url.as_deref(),
            Some("https://cdn.example.com/out.jpg")
        );
        assert_eq!(status.error, None);
    }

    #[tokio::test]
    async fn failed_jobs_carry_the_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/jobs/j3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed", "error": "nsfw content rejected"
            })))
            .mount(&server)
            .await;

        let status = test_client(&server).check_status("j3", "k").await.unwrap();
        assert_eq!(status.status, JobStatus::Failed);
        assert_eq!(status.error.as_deref(), Some("nsfw content rejected"));
    }

    #[test]
    fn hero_and_skin_shots_use_the_premium_model() {
        use crate::models::character::{SHOT_TYPES, ShotType};

        for shot in SHOT_TYPES {
            // Every shot must resolve to a model.
            assert!(!model_for_shot(shot).name.is_empty());
        }
        let hero = model_for_shot(ShotType::HeroPortrait);
        let talking = model_for_shot(ShotType::Talking);
        assert_eq!(hero.name, NANO_BANANA_PRO.name);
        assert!(hero.credits > talking.credits);
        assert!(hero.cost_idr > talking.cost_idr);
    }
}
