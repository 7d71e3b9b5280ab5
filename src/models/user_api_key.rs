//! BYOK provider key types.
//!
//! Paid-tier users store their own provider API keys. Keys are encrypted at
//! rest (see `encryption`) and there is at most one key per (user, provider)
//! pair; saving again replaces the previous key.

use serde::{Deserialize, Serialize};

/// The closed set of providers a user may store a key for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Image generation
    KieAi,
    /// Prompt assistance (identity descriptions, product analysis)
    Gemini,
    /// Video generation (key storage only; generation is not implemented)
    Kling,
}

impl Provider {
    /// Stable identifier used in the `user_api_keys.provider` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::KieAi => "kie_ai",
            Provider::Gemini => "gemini",
            Provider::Kling => "kling",
        }
    }
}

/// Request body for saving a provider key.
#[derive(Debug, Deserialize)]
pub struct SaveKeyRequest {
    pub provider: Provider,
    pub key: String,
}

/// Request body for deleting a provider key.
#[derive(Debug, Deserialize)]
pub struct DeleteKeyRequest {
    pub provider: Provider,
}

/// Response body for key save/delete operations.
#[derive(Debug, Serialize)]
pub struct SaveKeyResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request body for validating a key against the provider without storing it.
#[derive(Debug, Deserialize)]
pub struct ValidateKeyRequest {
    pub provider: Provider,
    pub key: String,
}

/// Result of a live key validation probe.
#[derive(Debug, Serialize)]
pub struct KeyValidationResponse {
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
