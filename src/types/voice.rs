//! Named voice presets.

use serde::Serialize;

use super::request::VoiceParams;

/// A named set of voice parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceProfile {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(flatten)]
    pub params: VoiceParams,
}

const fn preset(
    name: &'static str,
    description: &'static str,
    expressiveness: f32,
    guidance_weight: f32,
    temperature: f32,
) -> VoiceProfile {
    VoiceProfile {
        name,
        description,
        params: VoiceParams {
            expressiveness,
            guidance_weight,
            temperature,
            speed_factor: 1.0,
        },
    }
}

/// Built-in presets, `default` first.
pub static VOICE_PROFILES: &[VoiceProfile] = &[
    preset("default", "Standard neutral voice", 0.5, 0.5, 0.7),
    preset("professional", "Professional business voice", 0.3, 0.7, 0.5),
    preset("friendly", "Warm and friendly voice", 0.6, 0.4, 0.7),
    preset("enthusiastic", "Energetic and excited voice", 0.8, 0.3, 0.8),
    preset("narrator", "Documentary-style narrator", 0.4, 0.6, 0.6),
];

impl VoiceProfile {
    /// Look up a preset by name (case-insensitive).
    pub fn find(name: &str) -> Option<&'static VoiceProfile> {
        VOICE_PROFILES
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// All preset names, in declaration order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        VOICE_PROFILES.iter().map(|p| p.name)
    }
}
