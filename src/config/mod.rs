pub mod models;
pub mod prompt;

use crate::cli::Args;
use log::info;
use std::fmt;
use std::time::Duration;
use url::Url;

use self::models::ModelCatalog;
use self::prompt::Domain;

pub const DEFAULT_PROVIDER_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing provider credential: set HF_TOKEN or pass --hf-token")]
    MissingCredential,
    #[error("Failed to read model catalog '{path}': {source}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid model catalog: {0}")]
    InvalidCatalog(String),
    #[error("Model catalog is empty")]
    EmptyCatalog,
    #[error("Unknown model '{0}'")]
    UnknownModel(String),
    #[error("{0}")]
    InvalidDomain(#[from] prompt::ParseDomainError),
    #[error("Invalid provider URL '{url}': {reason}")]
    InvalidProviderUrl {
        url: String,
        reason: String,
    },
    #[error("Request timeout must be greater than zero")]
    InvalidTimeout,
}

/// Bearer secret for the inference provider. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Provider connection settings shared by every session.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: Url,
    pub credential: Credential,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(base_url: &str, credential: Credential, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        let base_url = parse_base_url(base_url)?;
        Ok(Self { base_url, credential, timeout })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub catalog: ModelCatalog,
    pub default_model: String,
    pub default_domain: Domain,
    pub assistant_name: String,
}

impl AppConfig {
    /// Resolves startup configuration. Any failure here is fatal: the server never
    /// accepts a session without a usable credential and model catalog.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let credential = Credential::new(args.hf_token.clone().unwrap_or_default())?;
        let provider = ProviderConfig::new(
            &args.provider_base_url,
            credential,
            Duration::from_secs(args.request_timeout_secs)
        )?;

        let catalog = match &args.models_path {
            Some(path) => {
                info!("Loading model catalog from: {}", path);
                ModelCatalog::load(path)?
            }
            None => ModelCatalog::default(),
        };

        let default_model = match &args.model {
            Some(key) =>
                catalog
                    .resolve(key)
                    .ok_or_else(|| ConfigError::UnknownModel(key.clone()))?
                    .id.clone(),
            None => catalog.default_model().id.clone(),
        };

        let default_domain: Domain = args.domain.parse()?;

        let assistant_name = match args.assistant_name.trim() {
            "" => prompt::DEFAULT_ASSISTANT_NAME.to_string(),
            name => name.to_string(),
        };

        Ok(Self {
            provider,
            catalog,
            default_model,
            default_domain,
            assistant_name,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidProviderUrl {
        url: raw.to_string(),
        reason,
    };
    // A trailing slash keeps `Url::join` from replacing the last path segment.
    let normalized = format!("{}/", raw.trim().trim_end_matches('/'));
    let url = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(hf_token: &str) -> Args {
        Args { hf_token: Some(hf_token.to_string()), ..Args::for_tests() }
    }

    #[test]
    fn missing_credential_is_fatal() {
        let err = AppConfig::from_args(&args("   ")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));

        let err = AppConfig::from_args(&Args::for_tests()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));
    }

    #[test]
    fn resolves_defaults_from_builtin_catalog() {
        let config = AppConfig::from_args(&Args { domain: "gym".into(), ..args("hf_abc") }).unwrap();
        assert_eq!(config.default_model, "mistralai/Mistral-7B-Instruct-v0.2");
        assert_eq!(config.default_domain, Domain::Gym);
        assert_eq!(config.assistant_name, "Athenex");
        assert_eq!(config.provider.timeout, Duration::from_secs(60));
        assert_eq!(config.provider.credential.expose(), "hf_abc");
    }

    #[test]
    fn model_can_be_selected_by_display_name() {
        let config = AppConfig::from_args(&Args { model: Some("Phi-2".into()), ..args("hf_abc") }).unwrap();
        assert_eq!(config.default_model, "microsoft/phi-2");

        let err = AppConfig::from_args(
            &Args { model: Some("nope/nope".into()), ..args("hf_abc") }
        ).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = AppConfig::from_args(&Args { request_timeout_secs: 0, ..args("hf_abc") }).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout));
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let url = parse_base_url("http://localhost:8080/proxy").unwrap();
        assert_eq!(url.join("models/org/m").unwrap().as_str(), "http://localhost:8080/proxy/models/org/m");
        assert!(parse_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("hf_secret").unwrap();
        assert_eq!(format!("{:?}", credential), "Credential(***)");
    }
}
