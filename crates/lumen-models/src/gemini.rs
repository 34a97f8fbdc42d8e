//! Google Gemini gateway implementation.
//!
//! This module provides an implementation of the `ModelGateway` trait for the
//! Gemini `generateContent` REST endpoint.

use std::env;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lumen_abstraction::{
    GatewayError, GenerationSettings, ImageGeneration, ImageVerdict, ModelGateway, TextGeneration,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Default REST base URL for the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model for prompt expansion.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
/// Default model for image synthesis.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
/// Default model for the judge stage.
pub const DEFAULT_JUDGE_MODEL: &str = "gemini-2.5-flash";
/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Google Gemini gateway.
#[derive(Clone)]
pub struct GeminiGateway {
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Gemini API.
    base_url: String,
    text_model: String,
    image_model: String,
    judge_model: String,
    seed: i64,
    temperature: f32,
    /// HTTP client for making requests.
    client: Client,
}

impl fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("judge_model", &self.judge_model)
            .field("seed", &self.seed)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiGateway {
    /// Creates a new `GeminiGateway` with the API key from `GEMINI_API_KEY`.
    ///
    /// # Errors
    /// Returns `GatewayError::Configuration` if the variable is unset or empty.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn new() -> Result<Self, GatewayError> {
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::Configuration(format!("{API_KEY_ENV} environment variable not set"))
            })?;

        Ok(Self::with_api_key(api_key))
    }

    /// Creates a new `GeminiGateway` with an explicit API key and default models.
    #[must_use]
    pub fn with_api_key(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            judge_model: DEFAULT_JUDGE_MODEL.to_string(),
            seed: GenerationSettings::DEFAULT_SEED,
            temperature: GenerationSettings::DEFAULT_TEMPERATURE,
            client: Client::new(),
        }
    }

    /// Points the gateway at a different API root (used by tests against a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the model IDs used for the three operations.
    #[must_use]
    pub fn with_models(
        mut self,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
        judge_model: impl Into<String>,
    ) -> Self {
        self.text_model = text_model.into();
        self.image_model = image_model.into();
        self.judge_model = judge_model.into();
        self
    }

    /// Overrides the fixed seed and temperature.
    #[must_use]
    pub fn with_sampling(mut self, seed: i64, temperature: f32) -> Self {
        self.seed = seed;
        self.temperature = temperature;
        self
    }

    /// Rebuilds the HTTP client with a transport timeout.
    ///
    /// # Errors
    /// Returns `GatewayError::Configuration` if the client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, GatewayError> {
        self.client = Client::builder().timeout(timeout).build().map_err(|e| {
            GatewayError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(self)
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent?key={}", self.base_url, model, self.api_key)
    }

    /// Sends one `generateContent` request and decodes the envelope.
    async fn generate_content(
        &self,
        model: &str,
        request: &GeminiRequest,
    ) -> Result<GeminiResponse, GatewayError> {
        let response =
            self.client.post(self.endpoint(model)).json(request).send().await.map_err(|e| {
                // reqwest errors carry the URL, which carries the key
                let e = e.without_url();
                error!(model = %model, error = %e, "Failed to send request to Gemini API");
                GatewayError::transport(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                model = %model,
                status = %status,
                error = %error_text,
                "Gemini API returned error status"
            );
            return Err(GatewayError::RemoteService {
                status: Some(status.as_u16()),
                message: error_text,
            });
        }

        response.json::<GeminiResponse>().await.map_err(|e| {
            error!(model = %model, error = %e.without_url(), "Failed to parse Gemini API response");
            GatewayError::RemoteService {
                status: Some(status.as_u16()),
                message: "Failed to parse response body".to_string(),
            }
        })
    }
}

fn require_prompt(prompt: &str) -> Result<(), GatewayError> {
    if prompt.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("prompt must not be empty".to_string()));
    }
    Ok(())
}

/// Instruction sent alongside the image in the judge call.
pub(crate) fn judge_instruction(query: &str) -> String {
    format!(
        r#"You are an image-judging assistant.

Task:
- Compare the USER_QUERY with the IMAGE you are given.
- Decide if the image matches what the user asked for.
- If the core idea is present, mark it as a match.

USER_QUERY:
"{query}"

Output:
Return ONLY a JSON object of the form

{{
"match": true or false
}}
"#
    )
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn generate_text(&self, prompt: &str) -> Result<TextGeneration, GatewayError> {
        require_prompt(prompt)?;
        debug!(model = %self.text_model, prompt_len = prompt.len(), "GeminiGateway generating text");

        let request = GeminiRequest::new(
            vec![GeminiPart::text(prompt)],
            GenerationSettings::text(self.seed, self.temperature).into(),
        );
        let response = self.generate_content(&self.text_model, &request).await?;

        let text = response.text().ok_or_else(|| {
            error!(model = %self.text_model, "No text in Gemini API response");
            GatewayError::EmptyResponse
        })?;

        Ok(TextGeneration { text, token_count: response.total_tokens() })
    }

    async fn synthesize_image(&self, prompt: &str) -> Result<ImageGeneration, GatewayError> {
        require_prompt(prompt)?;
        debug!(model = %self.image_model, prompt_len = prompt.len(), "GeminiGateway synthesizing image");

        let mut config: GeminiGenerationConfig =
            GenerationSettings::image(self.seed, self.temperature).into();
        config.response_modalities = Some(vec!["IMAGE".to_string()]);

        let request = GeminiRequest::new(vec![GeminiPart::text(prompt)], config);
        let response = self.generate_content(&self.image_model, &request).await?;

        let inline = response.first_inline_data().ok_or_else(|| {
            error!(model = %self.image_model, "No inline image data in Gemini API response");
            GatewayError::NoImagePayload
        })?;

        let image_bytes = BASE64.decode(inline.data.as_bytes()).map_err(|e| {
            GatewayError::MalformedPayload(format!("Invalid base64 image data: {}", e))
        })?;
        if image_bytes.is_empty() {
            return Err(GatewayError::NoImagePayload);
        }

        Ok(ImageGeneration {
            image_bytes,
            mime_type: inline.mime_type.clone(),
            token_count: response.total_tokens(),
        })
    }

    async fn judge_image_match(
        &self,
        query: &str,
        image: &[u8],
        mime: &str,
    ) -> Result<ImageVerdict, GatewayError> {
        if image.is_empty() {
            return Err(GatewayError::InvalidRequest("image bytes must not be empty".to_string()));
        }
        debug!(
            model = %self.judge_model,
            image_len = image.len(),
            mime = %mime,
            "GeminiGateway judging image"
        );

        let parts = vec![GeminiPart::inline(mime, image), GeminiPart::text(&judge_instruction(query))];
        let request = GeminiRequest::new(parts, GenerationSettings::judge(self.seed).into());
        let response = self.generate_content(&self.judge_model, &request).await?;

        let text = response.text().ok_or_else(|| {
            error!(model = %self.judge_model, "No verdict text in Gemini API response");
            GatewayError::EmptyResponse
        })?;

        ImageVerdict::from_judge_reply(&text)
    }

    fn backend_id(&self) -> &str {
        "gemini"
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

impl GeminiRequest {
    fn new(parts: Vec<GeminiPart>, generation_config: GeminiGenerationConfig) -> Self {
        Self {
            contents: vec![GeminiContent { role: Some("user".to_string()), parts }],
            generation_config: Some(generation_config),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
    /// Set on reasoning summaries; those parts are not part of the answer.
    #[serde(default, skip_serializing)]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self { text: Some(text.to_string()), ..Self::default() }
    }

    fn inline(mime_type: &str, data: &[u8]) -> Self {
        Self {
            inline_data: Some(GeminiInlineData {
                mime_type: Some(mime_type.to_string()),
                data: BASE64.encode(data),
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(default, alias = "mime_type", skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<GeminiThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

impl From<GenerationSettings> for GeminiGenerationConfig {
    fn from(settings: GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            seed: settings.seed,
            thinking_config: settings
                .thinking_budget
                .map(|thinking_budget| GeminiThinkingConfig { thinking_budget }),
            response_modalities: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_field_names)] // Matches API naming
struct GeminiUsageMetadata {
    #[serde(default)]
    total_token_count: Option<u32>,
}

impl GeminiResponse {
    fn first_parts(&self) -> &[GeminiPart] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated answer text of the first candidate, if non-empty.
    fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter(|part| part.thought != Some(true))
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.trim().is_empty() { None } else { Some(text) }
    }

    fn first_inline_data(&self) -> Option<&GeminiInlineData> {
        self.first_parts()
            .iter()
            .filter_map(|part| part.inline_data.as_ref())
            .find(|inline| !inline.data.is_empty())
    }

    fn total_tokens(&self) -> u32 {
        self.usage_metadata.as_ref().and_then(|meta| meta.total_token_count).unwrap_or(0)
    }
}
