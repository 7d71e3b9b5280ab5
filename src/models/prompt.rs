//! UGC prompt-builder request/response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scene parameters for the UGC prompt. Every field has a sensible default
/// so the client may omit the whole object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    #[serde(default = "default_setting")]
    pub setting: String,

    #[serde(default = "default_mood")]
    pub mood: String,

    #[serde(default = "default_lighting")]
    pub lighting: String,

    #[serde(default)]
    pub props: Vec<String>,

    #[serde(default = "default_camera_angle")]
    pub camera_angle: String,
}

fn default_setting() -> String {
    "clean minimal indoor setting".to_string()
}

fn default_mood() -> String {
    "confident".to_string()
}

fn default_lighting() -> String {
    "soft natural light".to_string()
}

fn default_camera_angle() -> String {
    "eye level".to_string()
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            setting: default_setting(),
            mood: default_mood(),
            lighting: default_lighting(),
            props: Vec::new(),
            camera_angle: default_camera_angle(),
        }
    }
}

/// Structured product description extracted from a product photo by the
/// prompt-assist model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysis {
    pub product_name: String,
    pub category: String,

    #[serde(default)]
    pub colors: Vec<String>,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub target_audience: String,

    #[serde(default)]
    pub suggested_scenes: Vec<String>,
}

/// Request body for the prompt-builder endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPromptRequest {
    pub product_image_url: String,
    pub character_id: Uuid,

    #[serde(default)]
    pub scene: Option<SceneConfig>,
}

/// Response body: the assembled prompt plus the analysis it was built from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPromptResponse {
    pub prompt: String,
    pub product_analysis: ProductAnalysis,
}
