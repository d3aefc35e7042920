//! Model variants and lazy model loading.

pub mod pool;

pub use pool::ModelPool;

use serde::Serialize;

use crate::types::DEFAULT_LANGUAGE;

/// Which model a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// English-only model, used for `"en"`.
    English,
    /// Multilingual model, used for every other language.
    Multilingual,
}

impl ModelVariant {
    pub fn for_language(language: &str) -> Self {
        if language == DEFAULT_LANGUAGE {
            ModelVariant::English
        } else {
            ModelVariant::Multilingual
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::English => "english",
            ModelVariant::Multilingual => "multilingual",
        }
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which variants currently have a loaded model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadedModels {
    pub english: bool,
    pub multilingual: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_english_uses_english_model() {
        assert_eq!(ModelVariant::for_language("en"), ModelVariant::English);
        assert_eq!(ModelVariant::for_language("fr"), ModelVariant::Multilingual);
    }

    #[test]
    fn variant_serializes_lowercase() {
        let json = serde_json::to_string(&ModelVariant::Multilingual).unwrap();
        assert_eq!(json, "\"multilingual\"");
    }
}
