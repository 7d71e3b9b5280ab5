//! Live validation of BYOK provider keys.
//!
//! Before a user stores a key, the client can probe it against the actual
//! provider: a minimal generateContent call for Gemini, a model-list request
//! for Kie AI and Kling. Probes never store anything and always resolve to a
//! `{valid, error?}` result; connection problems are reported as a message,
//! not an HTTP error.

use crate::config::Config;
use crate::models::user_api_key::{KeyValidationResponse, Provider};
use serde_json::json;

const INVALID_KEY_MESSAGE: &str = "API key tidak valid. Periksa kembali.";
const CONNECTION_MESSAGE: &str = "Gagal terhubung ke provider. Coba lagi.";

fn valid() -> KeyValidationResponse {
    KeyValidationResponse {
        valid: true,
        error: None,
    }
}

fn invalid(message: impl Into<String>) -> KeyValidationResponse {
    KeyValidationResponse {
        valid: false,
        error: Some(message.into()),
    }
}

async fn validate_gemini(http: &reqwest::Client, base_url: &str, key: &str) -> KeyValidationResponse {
    let url = format!("{base_url}/models/gemini-2.0-flash:generateContent?key={key}");
    let body = json!({
        "contents": [{"parts": [{"text": "Say OK"}]}],
        "generationConfig": {"maxOutputTokens": 5},
    });

    match http.post(&url).json(&body).send().await {
        Ok(response) if response.status().is_success() => valid(),
        Ok(response) => {
            let status = response.status().as_u16();
            if status == 401 || status == 403 {
                return invalid(INVALID_KEY_MESSAGE);
            }
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(serde_json::Value::as_str)
                        .map(String::from)
                })
                .unwrap_or_else(|| INVALID_KEY_MESSAGE.to_string());
            invalid(message)
        }
        Err(_) => invalid(CONNECTION_MESSAGE),
    }
}

async fn validate_bearer_models(
    http: &reqwest::Client,
    base_url: &str,
    key: &str,
) -> KeyValidationResponse {
    match http
        .get(format!("{base_url}/models"))
        .bearer_auth(key)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => valid(),
        Ok(_) => invalid(INVALID_KEY_MESSAGE),
        Err(_) => invalid(CONNECTION_MESSAGE),
    }
}

/// Probe a key against its provider.
pub async fn validate_key(
    http: &reqwest::Client,
    config: &Config,
    provider: Provider,
    key: &str,
) -> KeyValidationResponse {
    match provider {
        Provider::Gemini => validate_gemini(http, &config.gemini_api_base, key).await,
        Provider::KieAi => validate_bearer_models(http, &config.kie_api_base, key).await,
        Provider::Kling => validate_bearer_models(http, &config.kling_api_base, key).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn reachable_key_is_valid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let result = validate_bearer_models(&reqwest::Client::new(), &server.uri(), "k").await;
        assert!(result.valid);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn rejected_key_reports_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = validate_bearer_models(&reqwest::Client::new(), &server.uri(), "bad").await;
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some(INVALID_KEY_MESSAGE));
    }

    #[tokio::test]
    async fn gemini_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "API key expired"}
            })))
            .mount(&server)
            .await;

        let result = validate_gemini(&reqwest::Client::new(), &server.uri(), "expired").await;
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("API key expired"));
    }
}
