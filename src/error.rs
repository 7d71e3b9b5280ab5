//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//!
//! User-facing messages are the product's Indonesian copy. Internal details
//! (provider responses, SQL errors, decryption failures) are logged
//! server-side and never included in the response body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::encryption::EncryptionError;

/// Errors from the external AI provider and object-storage HTTP calls.
///
/// These never reach the client directly; they are wrapped into
/// [`AppError::Provider`] and reported as a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Job creation succeeded at the HTTP level but no job identifier could
    /// be extracted from any of the known response shapes.
    #[error("provider did not return a job ID in the response")]
    MissingJobId,

    /// The prompt-assist model returned no usable text.
    #[error("prompt-assist model returned an empty or invalid response")]
    EmptyResponse,

    /// The prompt-assist model was asked for JSON but returned something
    /// that could not be parsed as JSON.
    #[error("failed to parse model response as JSON: {0}")]
    InvalidJson(String),

    /// An image download returned a non-2xx status code.
    #[error("failed to download image ({status})")]
    Download { status: u16 },
}

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Missing or expired session tokens
/// - **Entitlement Errors**: No credits left, or no BYOK key configured
/// - **Resource Errors**: Requested resources not found (or not owned by caller)
/// - **Validation Errors**: Invalid request data
/// - **Upstream Errors**: Provider, storage and configuration failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No bearer token was presented.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Autentikasi diperlukan.")]
    Unauthorized,

    /// The presented session token is unknown or expired.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Token tidak valid atau sudah kedaluwarsa.")]
    InvalidToken,

    /// The user exceeded the per-user request budget.
    ///
    /// Returns HTTP 429 Too Many Requests. The job is never created.
    #[error("Terlalu banyak permintaan. Coba lagi dalam 1 menit.")]
    RateLimited,

    /// Free-tier user has no image credits left.
    ///
    /// Returns HTTP 403 Forbidden with an upgrade hint.
    #[error("Kredit habis! Upgrade ke BYOK.")]
    OutOfCredits,

    /// BYOK key management requires the lifetime BYOK tier.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Upgrade ke BYOK Lifetime dulu.")]
    ByokRequired,

    /// Paid-tier user has no stored key for the image provider.
    ///
    /// Returns HTTP 400 Bad Request so the client can prompt for setup.
    #[error("Setup API key dulu di Settings.")]
    MissingApiKey,

    /// No Gemini key could be resolved for the character flow.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("API key Gemini diperlukan untuk generate karakter. Setup di Settings.")]
    MissingPromptAssistKey,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Generation does not exist or does not belong to the caller.
    ///
    /// Returns HTTP 404 Not Found. Existence of other users' jobs is never
    /// revealed.
    #[error("Generasi tidak ditemukan.")]
    GenerationNotFound,

    /// Character does not exist, is not owned by the caller, and is not a
    /// platform preset.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Karakter tidak ditemukan.")]
    CharacterNotFound,

    /// A required secret or platform key is not configured.
    ///
    /// Returns HTTP 500 with a generic message. The missing variable name is
    /// logged server-side only.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The upstream provider returned an unusable response or exhausted its
    /// retry budget.
    ///
    /// Returns HTTP 500 with a generic message.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Encrypting or decrypting a stored BYOK key failed.
    ///
    /// Returns HTTP 500 with a generic message. Decryption fails closed, so
    /// this also covers tampered ciphertext.
    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    /// Uploading the generated image to object storage failed.
    ///
    /// Returns HTTP 500.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::Unauthorized | AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.to_string(),
            ),
            AppError::OutOfCredits => {
                (StatusCode::FORBIDDEN, "out_of_credits", self.to_string())
            }
            AppError::ByokRequired => {
                (StatusCode::FORBIDDEN, "byok_required", self.to_string())
            }
            AppError::MissingApiKey | AppError::MissingPromptAssistKey => {
                (StatusCode::BAD_REQUEST, "missing_api_key", self.to_string())
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::GenerationNotFound | AppError::CharacterNotFound => {
                (StatusCode::NOT_FOUND, "not_found", self.to_string())
            }
            AppError::Configuration(ref detail) => {
                tracing::error!("Configuration error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    "Konfigurasi server bermasalah. Hubungi admin.".to_string(),
                )
            }
            AppError::Provider(ref err) => {
                tracing::error!("Provider error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "provider_error",
                    "Terjadi kesalahan saat memproses generasi.".to_string(),
                )
            }
            AppError::Encryption(ref err) => {
                tracing::error!("Encryption error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Terjadi kesalahan. Coba lagi.".to_string(),
                )
            }
            AppError::Storage(ref detail) => {
                tracing::error!("Storage error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "Gagal menyimpan gambar.".to_string(),
                )
            }
            AppError::Database(ref err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Terjadi kesalahan. Coba lagi.".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}
