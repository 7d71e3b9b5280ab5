//! Prompt templates for character shot generation.
//!
//! Pure string composition, no I/O. Every character shot prompt is built
//! from the same blocks: a realism preamble, the shot's camera spec, the
//! character's identity paragraph, the shot's framing template, then the
//! shared lighting / skin / quality blocks and the negative prompt.

use crate::models::character::ShotType;

pub const REALISM_BASE: &str = "Ultra-realistic photographic portrait, commercial photography, \
     real-world studio photography, cinematic realism, lifelike details, \
     true-to-life textures.";

pub const LIGHTING_BLOCK: &str = "Professional studio lighting setup: soft key light from 45 degrees \
     creating gentle modeling on the face, fill light reducing harsh shadows, \
     subtle rim light separating subject from background. \
     Warm neutral tones that complement Southeast Asian skin.";

pub const SKIN_BLOCK: &str = "Skin rendered with ultra-realistic detail: visible soft pores, \
     natural micro-texture, subtle skin imperfections that add authenticity. \
     Natural makeup look — 'rapi tapi natural' philosophy: foundation blends \
     seamlessly with real skin, subtle blush on cheeks, natural lip tint, \
     light mascara enhancing lashes without looking overdone. \
     Skin has natural sheen, not overly matte or glossy. \
     Fine vellus hair visible in close-up shots. \
     No airbrushed perfection — real human skin with character.";

pub const QUALITY_BLOCK: &str = "8K resolution, ultra-high detail, photographic realism, \
     sharp focus on subject, natural depth of field, \
     professional color grading, high dynamic range, \
     shot on high-end mirrorless camera, RAW quality output.";

pub const NEGATIVE_BLOCK: &str = "No cartoon, no anime, no CGI, no 3D render, no illustration, \
     no painting, no digital art, no watercolor, no sketch, \
     no deformed features, no extra limbs, no distorted face, \
     no blurry, no low resolution, no oversaturated, \
     no plastic skin, no airbrushed, no uncanny valley, \
     no stock photo pose, no stiff expression.";

/// Lens and aperture for one shot type.
pub struct CameraSpec {
    pub lens: &'static str,
    pub aperture: &'static str,
}

pub fn camera_spec(shot: ShotType) -> CameraSpec {
    match shot {
        ShotType::HeroPortrait => CameraSpec {
            lens: "85mm prime lens",
            aperture: "f/1.8",
        },
        ShotType::Profile34 => CameraSpec {
            lens: "50mm prime lens",
            aperture: "f/2.0",
        },
        ShotType::Talking => CameraSpec {
            lens: "35mm wide-angle lens",
            aperture: "f/2.8",
        },
        ShotType::FullBody => CameraSpec {
            lens: "24-70mm zoom lens at 50mm",
            aperture: "f/4.0",
        },
        ShotType::SkinDetail => CameraSpec {
            lens: "100mm macro lens",
            aperture: "f/2.8",
        },
        ShotType::ProductInteraction => CameraSpec {
            lens: "50mm prime lens",
            aperture: "f/2.2",
        },
    }
}

/// Framing template for one shot type.
pub struct ShotConfig {
    pub framing: &'static str,
    pub gaze: &'static str,
    pub expression: &'static str,
    pub background: &'static str,
    pub instructions: &'static str,
}

pub fn shot_config(shot: ShotType) -> ShotConfig {
    match shot {
        ShotType::HeroPortrait => ShotConfig {
            framing: "Close-up headshot, head and shoulders visible, centered composition",
            gaze: "Direct eye contact with the camera, engaging and confident",
            expression: "Warm, approachable smile with natural ease",
            background: "Clean, softly blurred neutral background with subtle gradient",
            instructions: "This is the hero image — the character's defining portrait. \
                 Capture their personality and essence. Face should be perfectly lit \
                 with catchlights visible in the eyes. Skin texture clearly visible.",
        },
        ShotType::Profile34 => ShotConfig {
            framing: "Three-quarter view, face turned 30-45 degrees from camera, head to chest",
            gaze: "Eyes looking slightly past camera or toward a natural focal point",
            expression: "Thoughtful, natural resting expression with slight softness",
            background: "Soft out-of-focus environment suggesting a lifestyle setting",
            instructions: "Show the character's profile and jawline definition. \
                 Lighting should sculpt the face with gentle shadows on the far side. \
                 Natural, editorial feel — like a candid moment captured.",
        },
        ShotType::Talking => ShotConfig {
            framing: "Medium shot from chest up, slightly wide to suggest conversation space",
            gaze: "Looking directly at camera as if mid-conversation with the viewer",
            expression: "Animated, mid-speech with natural mouth position, engaged eyes",
            background: "Casual indoor or cafe-like setting, softly blurred",
            instructions: "Capture the character as if they're talking to camera for a UGC video \
                 thumbnail. Hands may be slightly visible gesturing. Natural, unposed energy. \
                 Slight motion blur acceptable on hands for authenticity.",
        },
        ShotType::FullBody => ShotConfig {
            framing: "Full body shot from head to feet, standing or in natural pose",
            gaze: "Natural gaze direction, can be looking at camera or to the side",
            expression: "Confident, relaxed posture with natural body language",
            background: "Environmental context — outdoor street, studio, or lifestyle location",
            instructions: "Show the complete outfit and body proportions. \
                 Natural stance — not a fashion runway pose. \
                 Feet grounded, natural weight distribution. \
                 Full outfit visible and styled consistently with character identity.",
        },
        ShotType::SkinDetail => ShotConfig {
            framing: "Extreme close-up on face, focusing on skin texture from cheek to forehead",
            gaze: "Eyes partially visible, focus is on skin surface",
            expression: "Neutral, relaxed face to show natural skin state",
            background: "Completely blurred, irrelevant — all attention on skin",
            instructions: "Macro-style shot showcasing the character's skin texture in detail. \
                 Individual pores visible, natural skin sheen, any freckles or marks. \
                 This shot proves the character has realistic skin — crucial for UGC credibility. \
                 Soft directional light to reveal texture without harsh shadows.",
        },
        ShotType::ProductInteraction => ShotConfig {
            framing: "Medium close-up, character holding or interacting with a product",
            gaze: "Looking at the product or at camera while holding the product",
            expression: "Genuine interest, natural reaction as if discovering the product",
            background: "Clean lifestyle setting appropriate for the product category",
            instructions: "Character naturally interacting with a product — holding, applying, or \
                 using it. Hands should look natural with the product. \
                 The product should be clearly visible but the focus remains on the character. \
                 Authentic UGC feel — like a real review or recommendation moment.",
        },
    }
}

/// Compose the final prompt for one character shot.
pub fn assemble_character_prompt(identity_prompt: &str, shot: ShotType) -> String {
    let camera = camera_spec(shot);
    let config = shot_config(shot);

    let camera_line = format!("Shot with {} at {}.", camera.lens, camera.aperture);

    let shot_block = [
        format!("Framing: {}.", config.framing),
        format!("Gaze: {}.", config.gaze),
        format!("Expression: {}.", config.expression),
        format!("Background: {}.", config.background),
        config.instructions.to_string(),
    ]
    .join(" ");

    [
        REALISM_BASE.to_string(),
        camera_line,
        identity_prompt.to_string(),
        shot_block,
        LIGHTING_BLOCK.to_string(),
        SKIN_BLOCK.to_string(),
        QUALITY_BLOCK.to_string(),
        format!("Negative prompt: {NEGATIVE_BLOCK}"),
    ]
    .join("\n\n")
}

/// The shared negative prompt passed to every generation job.
pub fn negative_prompt() -> &'static str {
    NEGATIVE_BLOCK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::character::SHOT_TYPES;

    #[test]
    fn assembled_prompt_contains_every_block() {
        let identity = "A 25-34 Indonesian woman with warm golden-tan skin";
        let prompt = assemble_character_prompt(identity, ShotType::HeroPortrait);

        assert!(prompt.contains(REALISM_BASE));
        assert!(prompt.contains(identity));
        assert!(prompt.contains("85mm prime lens"));
        assert!(prompt.contains("f/1.8"));
        assert!(prompt.contains("hero image"));
        assert!(prompt.contains(LIGHTING_BLOCK));
        assert!(prompt.contains("Negative prompt:"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let a = assemble_character_prompt("identity", ShotType::FullBody);
        let b = assemble_character_prompt("identity", ShotType::FullBody);
        assert_eq!(a, b);
    }

    #[test]
    fn each_shot_has_a_distinct_camera_and_framing() {
        let mut prompts: Vec<String> = SHOT_TYPES
            .iter()
            .map(|shot| assemble_character_prompt("identity", *shot))
            .collect();
        prompts.dedup();
        assert_eq!(prompts.len(), SHOT_TYPES.len());
    }
}
