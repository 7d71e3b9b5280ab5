//! Character models and the character-pack request/response types.
//!
//! A character is created from a structured configuration form plus six
//! AI-generated reference shots. The six shot archetypes are fixed; each is
//! produced by a specific provider model and described by its own camera and
//! framing template.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The six fixed shot archetypes generated for every character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotType {
    /// The character's defining close-up portrait (also the hero image)
    HeroPortrait,
    /// Three-quarter profile view
    #[serde(rename = "profile_3_4")]
    Profile34,
    /// Mid-conversation framing for UGC thumbnails
    Talking,
    /// Head-to-feet outfit shot
    FullBody,
    /// Macro shot proving realistic skin texture
    SkinDetail,
    /// Character holding or using a product
    ProductInteraction,
}

/// All shot types in generation order.
pub const SHOT_TYPES: [ShotType; 6] = [
    ShotType::HeroPortrait,
    ShotType::Profile34,
    ShotType::Talking,
    ShotType::FullBody,
    ShotType::SkinDetail,
    ShotType::ProductInteraction,
];

impl ShotType {
    /// Stable identifier used in storage paths and shot metadata keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShotType::HeroPortrait => "hero_portrait",
            ShotType::Profile34 => "profile_3_4",
            ShotType::Talking => "talking",
            ShotType::FullBody => "full_body",
            ShotType::SkinDetail => "skin_detail",
            ShotType::ProductInteraction => "product_interaction",
        }
    }
}

/// Character configuration submitted by the builder form.
///
/// Values are the form's option keys (Indonesian slugs like `sawo_matang`);
/// they are mapped to English prompt fragments before reaching the
/// prompt-assist model. Only `gender` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterConfig {
    pub gender: String,

    #[serde(default)]
    pub age_range: Option<String>,

    #[serde(default)]
    pub skin_tone: Option<String>,

    #[serde(default)]
    pub face_shape: Option<String>,

    #[serde(default)]
    pub eye_color: Option<String>,

    #[serde(default)]
    pub hair_style: Option<String>,

    #[serde(default)]
    pub hair_color: Option<String>,

    #[serde(default)]
    pub expression: Option<String>,

    #[serde(default)]
    pub outfit: Option<String>,

    #[serde(default)]
    pub skin_condition: Option<String>,

    #[serde(default)]
    pub custom_notes: Option<String>,
}

/// Represents a character record from the database.
///
/// # Database Table
///
/// Maps to the `characters` table. `config` carries the identity prompt,
/// per-shot metadata and reference image URLs as JSON; `is_preset` marks
/// platform-owned characters that every user may generate with.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Character {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub gender: String,
    pub age_range: Option<String>,
    pub style: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub config: serde_json::Value,
    pub hero_image_url: Option<String>,
    pub is_preset: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for the synchronous character-pack endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCharacterRequest {
    pub character_config: CharacterConfig,
    pub name: String,

    /// Optional one-off Gemini key; overrides stored/platform keys for this
    /// request only
    #[serde(default)]
    pub gemini_api_key: Option<String>,
}

/// One successfully generated shot, as recorded in character metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ShotResult {
    pub shot_type: ShotType,
    pub url: String,
    pub model: String,
    pub prompt: String,
}

/// One shot that could not be produced, with the reason.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedShot {
    pub shot_type: ShotType,
    pub error: String,
}

/// Summary of a shot in the HTTP response.
#[derive(Debug, Serialize)]
pub struct ShotSummary {
    #[serde(rename = "type")]
    pub shot_type: ShotType,
    pub url: String,
}

/// Response body for the character-pack endpoint.
///
/// The batch is reported as completed whenever every shot reached a terminal
/// outcome; `failed_shots` lists the ones that did not produce an image.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCharacterResponse {
    pub character_id: Uuid,
    pub shots: Vec<ShotSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_shots: Option<Vec<FailedShot>>,

    pub used_byok: bool,
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shot_type_serializes_to_snake_case() {
        let json = serde_json::to_string(&ShotType::Profile34).unwrap();
        assert_eq!(json, "\"profile_3_4\"");

        let parsed: ShotType = serde_json::from_str("\"product_interaction\"").unwrap();
        assert_eq!(parsed, ShotType::ProductInteraction);
    }

    #[test]
    fn shot_type_as_str_matches_serde_names() {
        for shot in SHOT_TYPES {
            let json = serde_json::to_string(&shot).unwrap();
            assert_eq!(json, format!("\"{}\"", shot.as_str()));
        }
    }
}
