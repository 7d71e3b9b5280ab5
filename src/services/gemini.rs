//! Gemini prompt-assist client.
//!
//! The prompt-assist model does three jobs:
//! - rewrite structured character-form values into one polished identity
//!   paragraph (the shared input of all six character shots)
//! - analyze a product photo into structured JSON
//! - compose the final UGC-style generation prompt
//!
//! Form values arrive as the builder's Indonesian option keys and are mapped
//! to English prompt fragments before being sent to the model.

use crate::error::ProviderError;
use crate::models::character::CharacterConfig;
use crate::models::prompt::{ProductAnalysis, SceneConfig};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

const GEMINI_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn map_skin_tone(value: &str) -> &str {
    match value {
        "putih" => "fair light Southeast Asian skin with cool undertones",
        "kuning_langsat" => "light warm golden-tan Southeast Asian skin",
        "sawo_matang" => "medium warm brown Southeast Asian skin with golden undertones",
        "coklat" => "rich deep brown Southeast Asian skin with warm tones",
        "gelap" => "deep dark brown Southeast Asian skin with warm mahogany undertones",
        other => other,
    }
}

fn map_hair_style(value: &str) -> &str {
    match value {
        "hijab_modern" => "modern hijab neatly wrapped with soft natural draping",
        "hijab_pashmina" => "pashmina hijab draped loosely with elegant folds",
        "hijab_sport" => "sporty hijab tightly wrapped for active look",
        "lurus_panjang" => "long straight hair falling naturally past shoulders",
        "lurus_sebahu" => "straight shoulder-length hair with clean ends",
        "bob_pendek" => "short bob haircut framing the face neatly",
        "bergelombang" => "soft wavy hair with natural body and movement",
        "keriting" => "curly hair with defined bouncy curls",
        "ponytail" => "hair pulled back in a neat ponytail",
        "sanggul" => "traditional bun hairstyle neatly pinned",
        "buzz_cut" => "very short buzz cut close to the scalp",
        "crew_cut" => "clean crew cut tapered on the sides",
        "undercut" => "modern undercut with longer top and shaved sides",
        "pompadour" => "classic pompadour swept back with volume",
        "messy_textured" => "textured messy hairstyle with casual tousled look",
        "side_part" => "neatly combed side part with clean lines",
        "man_bun" => "longer hair tied in a man bun",
        "fade" => "gradual fade haircut blending short to long",
        other => other,
    }
}

fn map_expression(value: &str) -> &str {
    match value {
        "hangat_ramah" => "warm genuine smile, friendly approachable eyes",
        "senyum_tipis" => "subtle soft smile with calm composed expression",
        "percaya_diri" => "confident self-assured look with steady gaze",
        "serius_fokus" => "serious focused expression with determined eyes",
        "ceria_energik" => "cheerful energetic expression with bright sparkling eyes",
        "natural_santai" => "natural relaxed expression with easygoing demeanor",
        "misterius" => "mysterious intriguing expression with slight enigmatic gaze",
        "terkejut_senang" => "pleasantly surprised expression with eyes slightly widened",
        other => other,
    }
}

fn map_face_shape(value: &str) -> &str {
    match value {
        "oval" => "oval face shape with balanced proportions",
        "bulat" => "round face shape with soft full cheeks",
        "kotak" => "square face shape with defined jawline",
        "hati" => "heart-shaped face tapering to a pointed chin",
        "panjang" => "long face shape with elongated proportions",
        "segitiga" => "triangular face shape wider at the jaw",
        other => other,
    }
}

fn map_eye_color(value: &str) -> &str {
    match value {
        "Coklat tua" => "deep dark brown eyes",
        "Coklat madu" => "warm honey brown eyes",
        "Hitam" => "dark black eyes",
        "Hazel" => "hazel eyes with brown-green tones",
        other => other,
    }
}

/// Flatten the character form into comma-separated English fragments.
fn identity_fragments(config: &CharacterConfig) -> String {
    let gender_desc = if config.gender == "female" { "woman" } else { "man" };

    let lead = match config.age_range.as_deref() {
        Some(age) if !age.is_empty() => format!("A {age} Indonesian {gender_desc}"),
        _ => format!("An Indonesian {gender_desc}"),
    };

    let mut fragments = vec![lead];
    if let Some(tone) = config.skin_tone.as_deref() {
        fragments.push(format!("with {}", map_skin_tone(tone)));
    }
    if let Some(shape) = config.face_shape.as_deref() {
        fragments.push(format!("and {}", map_face_shape(shape)));
    }
    if let Some(eyes) = config.eye_color.as_deref() {
        fragments.push(format!("with {}", map_eye_color(eyes)));
    }
    if let Some(hair) = config.hair_style.as_deref() {
        fragments.push(format!("wearing {}", map_hair_style(hair)));
    }
    if let Some(color) = config.hair_color.as_deref() {
        fragments.push(format!("in {color} color"));
    }
    if let Some(expression) = config.expression.as_deref() {
        fragments.push(format!("showing {}", map_expression(expression)));
    }
    if let Some(outfit) = config.outfit.as_deref() {
        fragments.push(format!("dressed in {outfit} style clothing"));
    }
    if let Some(condition) = config.skin_condition.as_deref() {
        fragments.push(format!("with {condition} skin condition"));
    }
    if let Some(notes) = config.custom_notes.as_deref() {
        if !notes.is_empty() {
            fragments.push(notes.to_string());
        }
    }

    fragments.join(", ")
}

/// Pull a JSON object out of a model response that may wrap it in a code
/// fence or surrounding prose.
fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, ProviderError> {
    // Fenced block first: ```json ... ```
    if let Some(start) = raw.find("```") {
        let after = &raw[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            if let Ok(parsed) = serde_json::from_str(after[..end].trim()) {
                return Ok(parsed);
            }
        }
    }

    // Outermost braces next.
    if let (Some(open), Some(close)) = (raw.find('{'), raw.rfind('}')) {
        if open < close {
            if let Ok(parsed) = serde_json::from_str(&raw[open..=close]) {
                return Ok(parsed);
            }
        }
    }

    // Last resort: the whole response.
    serde_json::from_str(raw.trim()).map_err(|_| {
        let preview: String = raw.chars().take(300).collect();
        ProviderError::InvalidJson(preview)
    })
}

/// HTTP client for the Gemini generateContent API.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url,
        }
    }

    /// One generateContent call, returning the first candidate's text.
    ///
    /// When `image_url` is given, the image is fetched and inlined as
    /// base64 so the model can see it.
    async fn generate(
        &self,
        api_key: &str,
        system_prompt: &str,
        user_text: &str,
        image_url: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut user_parts = Vec::new();

        if let Some(url) = image_url {
            let response = self.http.get(url).send().await?;
            if !response.status().is_success() {
                return Err(ProviderError::Download {
                    status: response.status().as_u16(),
                });
            }
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("image/jpeg")
                .to_string();
            let bytes = response.bytes().await?;

            user_parts.push(json!({
                "inlineData": {
                    "mimeType": content_type,
                    "data": BASE64.encode(&bytes),
                }
            }));
        }

        user_parts.push(json!({"text": user_text}));

        let body = json!({
            "systemInstruction": {
                "role": "user",
                "parts": [{"text": system_prompt}],
            },
            "contents": [{"role": "user", "parts": user_parts}],
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 2048,
                "responseMimeType": "text/plain",
            },
        });

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, GEMINI_MODEL, api_key
        );
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let data: Value = response.json().await?;
        data.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .ok_or(ProviderError::EmptyResponse)
    }

    /// Turn the character form into one polished identity paragraph.
    pub async fn build_identity_prompt(
        &self,
        config: &CharacterConfig,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let fragments = identity_fragments(config);

        let system_prompt = "You are an expert portrait description writer for AI image generation. \
             Take the character details provided and assemble them into a single polished, \
             natural-sounding identity description paragraph in English. \
             The paragraph should flow naturally and be optimized for AI image generation prompts. \
             Do NOT use JSON. Return ONLY the paragraph text.";

        let user_prompt = format!(
            "Rewrite these character details into a single cohesive identity paragraph:\n\n{fragments}"
        );

        self.generate(api_key, system_prompt, &user_prompt, None).await
    }

    /// Analyze a product photo into structured data for UGC prompts.
    pub async fn analyze_product(
        &self,
        image_url: &str,
        api_key: &str,
    ) -> Result<ProductAnalysis, ProviderError> {
        let system_prompt = "You are a product analyst for UGC content creation. \
             Analyze this product image and return structured data in JSON format. \
             Focus on details useful for creating realistic marketing photos.";

        let user_prompt = "Analyze this product image and return a JSON object with exactly these fields:\n\
             - \"productName\": string (the product name or best guess)\n\
             - \"category\": string (e.g., \"skincare\", \"fashion\", \"food\", \"tech\", \"beauty\")\n\
             - \"colors\": string[] (dominant colors visible)\n\
             - \"features\": string[] (key product features or selling points)\n\
             - \"targetAudience\": string (who this product is for)\n\
             - \"suggestedScenes\": string[] (3-5 scene suggestions for UGC photos)\n\n\
             Return ONLY valid JSON, no extra text.";

        let raw = self
            .generate(api_key, system_prompt, user_prompt, Some(image_url))
            .await?;
        extract_json(&raw)
    }

    /// Compose the final UGC-style generation prompt.
    pub async fn build_ugc_prompt(
        &self,
        analysis: &ProductAnalysis,
        identity_prompt: &str,
        scene: &SceneConfig,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let system_prompt = "You are an expert UGC (User Generated Content) prompt engineer for AI image generation. \
             Create prompts that produce hyper-realistic, candid, authentic UGC-style photos. \
             The result should look like a real person took it with their phone for social media — \
             NOT a stock photo, NOT a studio portrait. \
             Include the product naturally in the scene. \
             Return ONLY the prompt text, no explanations.";

        let user_prompt = format!(
            "Create a detailed UGC-style image generation prompt combining these elements:\n\n\
             CHARACTER IDENTITY:\n{identity}\n\n\
             PRODUCT:\n\
             - Name: {name}\n\
             - Category: {category}\n\
             - Colors: {colors}\n\
             - Features: {features}\n\n\
             SCENE:\n\
             - Setting: {setting}\n\
             - Mood: {mood}\n\
             - Lighting: {lighting}\n\
             - Props: {props}\n\
             - Camera angle: {camera_angle}\n\n\
             Requirements:\n\
             - Hyper-realistic, candid UGC aesthetic\n\
             - Product appears naturally in the scene (being used, held, or displayed)\n\
             - Southeast Asian context and setting\n\
             - Natural, unposed feel\n\
             - Detailed skin texture and lighting descriptions",
            identity = identity_prompt,
            name = analysis.product_name,
            category = analysis.category,
            colors = analysis.colors.join(", "),
            features = analysis.features.join(", "),
            setting = scene.setting,
            mood = scene.mood,
            lighting = scene.lighting,
            props = scene.props.join(", "),
            camera_angle = scene.camera_angle,
        );

        self.generate(api_key, system_prompt, &user_prompt, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_config() -> CharacterConfig {
        CharacterConfig {
            gender: "female".to_string(),
            age_range: Some("25-34".to_string()),
            skin_tone: Some("sawo_matang".to_string()),
            face_shape: Some("oval".to_string()),
            eye_color: Some("Coklat tua".to_string()),
            hair_style: Some("hijab_modern".to_string()),
            hair_color: None,
            expression: Some("hangat_ramah".to_string()),
            outfit: Some("casual".to_string()),
            skin_condition: None,
            custom_notes: None,
        }
    }

    #[test]
    fn fragments_map_form_keys_to_english() {
        let fragments = identity_fragments(&sample_config());

        assert!(fragments.starts_with("A 25-34 Indonesian woman"));
        assert!(fragments.contains("medium warm brown Southeast Asian skin"));
        assert!(fragments.contains("oval face shape"));
        assert!(fragments.contains("deep dark brown eyes"));
        assert!(fragments.contains("modern hijab"));
        assert!(fragments.contains("warm genuine smile"));
        assert!(fragments.contains("dressed in casual style clothing"));
    }

    #[test]
    fn unknown_form_values_pass_through() {
        let mut config = sample_config();
        config.skin_tone = Some("alabaster".to_string());
        let fragments = identity_fragments(&config);
        assert!(fragments.contains("with alabaster"));
    }

    #[test]
    fn missing_age_range_still_reads_naturally() {
        let mut config = sample_config();
        config.gender = "male".to_string();
        config.age_range = None;
        let fragments = identity_fragments(&config);
        assert!(fragments.starts_with("An Indonesian man"));
    }

    #[test]
    fn extract_json_handles_fences_prose_and_plain() {
        #[derive(serde::Deserialize, PartialEq, Debug)]
        struct Probe {
            ok: bool,
        }

        let fenced = "Here you go:\n```json\n{\"ok\": true}\n```";
        assert_eq!(extract_json::<Probe>(fenced).unwrap(), Probe { ok: true });

        let prose = "The analysis is {\"ok\": true} as requested.";
        assert_eq!(extract_json::<Probe>(prose).unwrap(), Probe { ok: true });

        let plain = " {\"ok\": false} ";
        assert_eq!(extract_json::<Probe>(plain).unwrap(), Probe { ok: false });

        assert!(matches!(
            extract_json::<Probe>("no json here"),
            Err(ProviderError::InvalidJson(_))
        ));
    }

    #[tokio::test]
    async fn generate_returns_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/models/{GEMINI_MODEL}:generateContent")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"parts": [{"text": "  A vivid identity paragraph.  "}]}
                }]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri());
        let text = client
            .build_identity_prompt(&sample_config(), "key")
            .await
            .unwrap();
        assert_eq!(text, "A vivid identity paragraph.");
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/models/{GEMINI_MODEL}:generateContent")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri());
        let result = client.build_identity_prompt(&sample_config(), "key").await;
        assert!(matches!(result, Err(ProviderError::EmptyResponse)));
    }
}
