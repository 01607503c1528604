//! Everything between a [`PlanRequest`](crate::model::PlanRequest) and a
//! validated [`DayPlan`](crate::model::DayPlan).

pub mod backend;
pub mod gateway;
pub mod gemini;
pub mod normalize;
pub mod offline;
pub mod openai;
pub mod prompt;
pub mod references;
pub mod schema;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backend::{BackendError, GenerativeBackend};
pub use gateway::{GeneratorGateway, RetryPolicy};
pub use gemini::{DEFAULT_GEMINI_MODEL, GeminiBackend};
pub use offline::OfflineBackend;
pub use openai::{DEFAULT_OPENAI_MODEL, OpenAiBackend};

/// Which backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[default]
    Gemini,
    Offline,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
            Self::Gemini => DEFAULT_GEMINI_MODEL,
            Self::Offline => "canned",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Offline => "offline",
        })
    }
}

impl FromStr for Provider {
    type Err = GeneratorConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "offline" | "mock" => Ok(Self::Offline),
            other => Err(GeneratorConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum GeneratorConfigError {
    #[error("unknown generator provider {0:?} (expected openai, gemini, or offline)")]
    UnknownProvider(String),

    #[error("no API key configured for provider {0}")]
    MissingApiKey(Provider),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Resolved generator settings. `model: None` means the provider default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub provider: Provider,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl GeneratorSettings {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Build the backend these settings describe.
    pub fn build_backend(&self) -> Result<Arc<dyn GenerativeBackend>, GeneratorConfigError> {
        if self.provider == Provider::Offline {
            return Ok(Arc::new(OfflineBackend));
        }
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GeneratorConfigError::MissingApiKey(self.provider))?;
        let backend: Arc<dyn GenerativeBackend> = match self.provider {
            Provider::OpenAi => Arc::new(OpenAiBackend::new(api_key, self.model())?),
            Provider::Gemini => Arc::new(GeminiBackend::new(api_key, self.model())?),
            Provider::Offline => Arc::new(OfflineBackend),
        };
        Ok(backend)
    }

    /// Gateway with the default prompt and retry policy.
    pub fn build_gateway(&self) -> Result<GeneratorGateway, GeneratorConfigError> {
        Ok(GeneratorGateway::new(self.build_backend()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" gemini ".parse::<Provider>().unwrap(), Provider::Gemini);
        assert_eq!("mock".parse::<Provider>().unwrap(), Provider::Offline);
        assert!("claude".parse::<Provider>().is_err());
    }

    #[test]
    fn provider_serde_names() {
        assert_eq!(serde_json::to_string(&Provider::OpenAi).unwrap(), "\"openai\"");
        let p: Provider = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(p, Provider::Offline);
    }

    #[test]
    fn model_defaults_per_provider() {
        let settings = GeneratorSettings {
            provider: Provider::OpenAi,
            ..Default::default()
        };
        assert_eq!(settings.model(), "gpt-4o-mini");
        assert_eq!(GeneratorSettings::default().model(), "gemini-2.5-flash");

        let settings = GeneratorSettings {
            model: Some("gemini-2.5-pro".into()),
            ..Default::default()
        };
        assert_eq!(settings.model(), "gemini-2.5-pro");
    }

    #[test]
    fn networked_provider_requires_api_key() {
        let settings = GeneratorSettings {
            provider: Provider::Gemini,
            api_key: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            settings.build_backend(),
            Err(GeneratorConfigError::MissingApiKey(Provider::Gemini))
        ));
    }

    #[test]
    fn offline_needs_no_key() {
        let settings = GeneratorSettings {
            provider: Provider::Offline,
            ..Default::default()
        };
        let backend = settings.build_backend().unwrap();
        assert_eq!(backend.name(), "offline");
    }

    #[test]
    fn keyed_backends_build() {
        let settings = GeneratorSettings {
            provider: Provider::OpenAi,
            model: None,
            api_key: Some("sk-test".into()),
        };
        let backend = settings.build_backend().unwrap();
        assert_eq!(backend.name(), "openai");
        assert_eq!(backend.model(), "gpt-4o-mini");
    }
}
