//! Gateway factory for creating gateway instances from configuration.
//!
//! This module provides functionality to create a gateway based on configuration,
//! handling API key loading from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use lumen_abstraction::{GatewayError, GenerationSettings, ModelGateway};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::gemini::{
    API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_JUDGE_MODEL, DEFAULT_TEXT_MODEL,
};
use crate::{GeminiGateway, MockGateway};

/// Default transport timeout for backend calls, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Backend type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Google Gemini REST API.
    #[default]
    Gemini,
    /// In-process scripted gateway; no network access.
    Mock,
}

impl FromStr for BackendType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => {
                error!(backend = %other, "Unrecognized backend type");
                Err(GatewayError::Configuration(format!("Unrecognized backend type: {}", other)))
            }
        }
    }
}

/// Gateway configuration.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Which backend to build.
    pub backend: BackendType,
    /// Optional API key (if not provided, will be loaded from `GEMINI_API_KEY`).
    pub api_key: Option<String>,
    /// REST API root.
    pub base_url: String,
    /// Model used for prompt expansion.
    pub text_model: String,
    /// Model used for image synthesis.
    pub image_model: String,
    /// Model used for the judge stage.
    pub judge_model: String,
    /// Fixed seed sent with every call.
    pub seed: i64,
    /// Temperature for text and image calls.
    pub temperature: f32,
    /// Transport timeout; `None` leaves the client without one.
    pub request_timeout_secs: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            judge_model: DEFAULT_JUDGE_MODEL.to_string(),
            seed: GenerationSettings::DEFAULT_SEED,
            temperature: GenerationSettings::DEFAULT_TEMPERATURE,
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("backend", &self.backend)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("judge_model", &self.judge_model)
            .field("seed", &self.seed)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl GatewayConfig {
    /// Creates a configuration for the given backend with default models.
    #[must_use]
    pub fn new(backend: BackendType) -> Self {
        Self { backend, ..Self::default() }
    }

    /// Sets the API key for this configuration.
    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the REST API root for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

/// Factory for creating gateway instances.
pub struct GatewayFactory;

impl GatewayFactory {
    /// Creates a gateway from the given configuration, reading `GEMINI_API_KEY`
    /// from the process environment when the configuration has no key.
    ///
    /// # Errors
    /// Returns `GatewayError::Configuration` if the credential is missing or the
    /// HTTP client cannot be built.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn create(config: &GatewayConfig) -> Result<Arc<dyn ModelGateway>, GatewayError> {
        Self::create_with_env(config, |key| env::var(key).ok())
    }

    /// Creates a gateway, resolving environment variables through `lookup`.
    ///
    /// # Errors
    /// Same as [`GatewayFactory::create`].
    pub fn create_with_env<F>(
        config: &GatewayConfig,
        lookup: F,
    ) -> Result<Arc<dyn ModelGateway>, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!(
            backend = ?config.backend,
            text_model = %config.text_model,
            image_model = %config.image_model,
            judge_model = %config.judge_model,
            "Creating gateway instance"
        );

        match config.backend {
            BackendType::Mock => Ok(Arc::new(MockGateway::new("mock".to_string()))),
            BackendType::Gemini => {
                let api_key = Self::resolve_api_key(config, lookup)?;
                let mut gateway = GeminiGateway::with_api_key(api_key)
                    .with_base_url(config.base_url.as_str())
                    .with_models(
                        config.text_model.as_str(),
                        config.image_model.as_str(),
                        config.judge_model.as_str(),
                    )
                    .with_sampling(config.seed, config.temperature);

                if let Some(secs) = config.request_timeout_secs {
                    gateway = gateway.with_timeout(Duration::from_secs(secs))?;
                }

                Ok(Arc::new(gateway))
            }
        }
    }

    fn resolve_api_key<F>(config: &GatewayConfig, lookup: F) -> Result<String, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| {
                error!("No Gemini API key configured");
                GatewayError::Configuration(format!(
                    "{API_KEY_ENV} is not set and no api_key is configured"
                ))
            })
    }
}
