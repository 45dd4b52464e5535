use serde::{ Deserialize, Serialize };
use std::fs;
use std::path::Path;

use super::ConfigError;

const BUILTIN_MODELS: [(&str, &str); 6] = [
    ("Mistral 7B Instruct", "mistralai/Mistral-7B-Instruct-v0.2"),
    ("Zephyr 7B Beta", "HuggingFaceH4/zephyr-7b-beta"),
    ("OpenChat 3.5", "openchat/openchat-3.5-1210"),
    ("Phi-2", "microsoft/phi-2"),
    ("TinyLlama Chat", "TinyLlama/TinyLlama-1.1B-Chat-v1.0"),
    ("Nous Hermes 2 Mistral", "NousResearch/Nous-Hermes-2-Mistral-7B-DPO"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub name: String,
    pub id: String,
}

/// Ordered set of selectable provider models. The first entry is the default.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: Vec<ModelOption>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: BUILTIN_MODELS.iter()
                .map(|(name, id)| ModelOption {
                    name: name.to_string(),
                    id: id.to_string(),
                })
                .collect(),
        }
    }
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelOption>) -> Result<Self, ConfigError> {
        if models.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if let Some(bad) = models.iter().find(|m| m.id.trim().is_empty()) {
            return Err(ConfigError::InvalidCatalog(format!("model '{}' has an empty id", bad.name)));
        }
        Ok(Self { models })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::CatalogIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let models: Vec<ModelOption> = serde_json
            ::from_str(json)
            .map_err(|e| ConfigError::InvalidCatalog(e.to_string()))?;
        Self::new(models)
    }

    pub fn models(&self) -> &[ModelOption] {
        &self.models
    }

    pub fn default_model(&self) -> &ModelOption {
        &self.models[0]
    }

    /// Looks a model up by provider id first, then by display name (case-insensitive).
    pub fn resolve(&self, key: &str) -> Option<&ModelOption> {
        let key = key.trim();
        self.models
            .iter()
            .find(|m| m.id == key)
            .or_else(|| self.models.iter().find(|m| m.name.eq_ignore_ascii_case(key)))
    }
}
