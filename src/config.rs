//! Runtime configuration.
//!
//! Everything comes from environment variables, deserialized with `envy`
//! into one typed struct so the rest of the code never touches `std::env`.
//!
//! Secrets that are only needed for some requests (platform provider keys,
//! the BYOK encryption secret, object-storage credentials) are optional at
//! startup: a missing value surfaces as a configuration error on the request
//! that needs it instead of preventing the process from booting.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `PLATFORM_KIE_AI_KEY` (optional): shared Kie AI key used for free-tier generations
/// - `PLATFORM_GEMINI_KEY` (optional): shared Gemini key used for prompt assistance
/// - `ENCRYPTION_SECRET` (optional): 64 hex chars (32 bytes) protecting stored BYOK keys
/// - `STORAGE_URL` / `STORAGE_SERVICE_KEY` (optional): object storage endpoint and service credential
/// - `KIE_API_BASE`, `GEMINI_API_BASE`, `KLING_API_BASE` (optional): provider base URLs,
///   overridable for testing
/// - `RATE_LIMIT_MAX_REQUESTS` / `RATE_LIMIT_WINDOW_SECS` (optional): per-user
///   request budget, defaults to 10 per 60 seconds
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub platform_kie_ai_key: Option<String>,
    pub platform_gemini_key: Option<String>,

    /// 32-byte hex secret for AES-256-GCM encryption of stored provider keys.
    pub encryption_secret: Option<String>,

    pub storage_url: Option<String>,
    pub storage_service_key: Option<String>,

    #[serde(default = "default_kie_api_base")]
    pub kie_api_base: String,

    #[serde(default = "default_gemini_api_base")]
    pub gemini_api_base: String,

    #[serde(default = "default_kling_api_base")]
    pub kling_api_base: String,

    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_kie_api_base() -> String {
    "https://api.kie.ai/api/v1".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_kling_api_base() -> String {
    "https://api.klingai.com/v1".to_string()
}

fn default_rate_limit_max_requests() -> u32 {
    10
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// A `.env` file is loaded first when one exists, then the environment
    /// is deserialized field-for-field (`database_url` reads `DATABASE_URL`
    /// and so on).
    ///
    /// # Errors
    ///
    /// Fails if `DATABASE_URL` is absent or any present value cannot be
    /// parsed into its field's type.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()
    }
}
