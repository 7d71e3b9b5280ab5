//! Object storage client.
//!
//! Generated images are persisted to an external HTTP object store with
//! per-user, per-job paths (`generations/{user}/image/{id}.jpg`,
//! `characters/{user}/{id}/{shot}.jpg`). Uploads upsert so a repeated
//! reconciliation can never fail on an existing object.
//!
//! Storage credentials are optional at startup; an upload attempted without
//! them fails with a configuration error for that request only.

use crate::config::Config;
use crate::error::AppError;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the object store.
pub struct StorageClient {
    http: reqwest::Client,
    base_url: Option<String>,
    service_key: Option<String>,
}

impl StorageClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: config.storage_url.clone(),
            service_key: config.storage_service_key.clone(),
        }
    }

    fn settings(&self) -> Result<(&str, &str), AppError> {
        match (self.base_url.as_deref(), self.service_key.as_deref()) {
            (Some(base), Some(key)) => Ok((base, key)),
            _ => Err(AppError::Configuration(
                "STORAGE_URL or STORAGE_SERVICE_KEY is not set".to_string(),
            )),
        }
    }

    /// Upload an object and return its public URL.
    ///
    /// Existing objects at the same path are overwritten.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let (base, service_key) = self.settings()?;
        let url = format!("{base}/storage/v1/object/{bucket}/{path}");

        let response = self
            .http
            .post(&url)
            .bearer_auth(service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|err| AppError::Storage(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("upload failed ({status}): {body}")));
        }

        Ok(format!("{base}/storage/v1/object/public/{bucket}/{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StorageClient {
        StorageClient {
            http: reqwest::Client::new(),
            base_url: Some(server.uri()),
            service_key: Some("service-key".to_string()),
        }
    }

    #[tokio::test]
    async fn upload_returns_the_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/generations/u1/image/g1.jpg"))
            .and(header("x-upsert", "true"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = client_for(&server)
            .upload("generations", "u1/image/g1.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/generations/u1/image/g1.jpg",
                server.uri()
            )
        );
    }

    #[tokio::test]
    async fn failed_upload_is_a_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .upload("generations", "u1/image/g1.jpg", vec![0], "image/jpeg")
            .await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn missing_configuration_fails_at_the_point_of_use() {
        let client = StorageClient {
            http: reqwest::Client::new(),
            base_url: None,
            service_key: None,
        };
        let result = client.upload("b", "p.jpg", vec![0], "image/jpeg").await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
