//! Shared application state.
//!
//! One `AppState` is built at startup and cloned into every handler. All
//! fields are cheap to clone (pool handle, `Arc`s, reqwest client).

use crate::config::Config;
use crate::db::DbPool;
use crate::rate_limit::{FixedWindowLimiter, RateLimiter};
use crate::services::gemini::GeminiClient;
use crate::services::kie_ai::KieAiClient;
use crate::services::storage_service::StorageClient;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,

    /// Per-user request gate. Trait object so a shared external counter can
    /// replace the in-process map in a multi-instance deployment.
    pub limiter: Arc<dyn RateLimiter>,

    pub kie: Arc<KieAiClient>,
    pub gemini: Arc<GeminiClient>,
    pub storage: Arc<StorageClient>,

    /// Plain client for one-off probes (BYOK key validation).
    pub http: reqwest::Client,
}

impl AppState {
    /// Wire up all collaborators from configuration.
    ///
    /// Must be called from within the tokio runtime: the rate limiter spawns
    /// its background sweep task here.
    pub fn new(pool: DbPool, config: Config) -> Self {
        let limiter = Arc::new(FixedWindowLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        ));
        limiter.spawn_sweeper();

        let kie = Arc::new(KieAiClient::new(config.kie_api_base.clone()));
        let gemini = Arc::new(GeminiClient::new(config.gemini_api_base.clone()));
        let storage = Arc::new(StorageClient::from_config(&config));

        Self {
            pool,
            config: Arc::new(config),
            limiter,
            kie,
            gemini,
            storage,
            http: reqwest::Client::new(),
        }
    }
}
