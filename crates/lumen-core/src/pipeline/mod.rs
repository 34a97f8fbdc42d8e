//! Generation pipeline.
//!
//! One run turns a user query into a verified image in three strictly
//! sequential gateway calls:
//!
//! 1. expansion: the text model rewrites the query as an image prompt
//! 2. synthesis: the image model renders that prompt
//! 3. judgement: the text model decides whether the image matches the query
//!
//! Any failure aborts the run. Nothing is retried or cached.

mod error;
mod prompts;
mod query;

use std::sync::Arc;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use lumen_abstraction::{ImageVerdict, ModelGateway, reply};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub use error::PipelineError;
pub use prompts::expansion_instruction;
pub use query::UserQuery;

/// MIME type reported in every response.
pub const RESPONSE_MIME: &str = "image/jpeg";

/// Key the expansion reply must carry.
const IMAGE_PROMPT_KEY: &str = "image_prompt";

/// Tokens consumed per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens used by the expansion call.
    pub text_tokens: u32,
    /// Tokens used by the image call.
    pub image_tokens: u32,
}

/// Output of the expansion stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionResult {
    pub image_prompt: String,
    pub token_count: u32,
}

/// Result of a successful run, serialized as the `/userquery` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResponse {
    /// Standard base64 (with padding) of the generated image bytes.
    pub image_base64: String,
    pub mime: String,
    /// The image prompt produced by the expansion stage.
    pub prompt_text: String,
    pub tokens: TokenUsage,
    pub verification: ImageVerdict,
}

/// Runs the expand, synthesize and judge stages against a model gateway.
pub struct Pipeline {
    gateway: Arc<dyn ModelGateway>,
}

impl Pipeline {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Identifier of the underlying gateway.
    pub fn backend_id(&self) -> &str {
        self.gateway.backend_id()
    }

    /// Runs the full pipeline for `raw_query`.
    ///
    /// # Errors
    /// `Validation` for an empty query (no gateway call is made),
    /// `PromptExpansion` when the expansion reply lacks a usable prompt,
    /// `ImageSynthesis` when the image stage fails, and `Gateway` for any
    /// other gateway or parsing failure.
    pub async fn run(&self, raw_query: &str) -> Result<PipelineResponse, PipelineError> {
        let query = UserQuery::parse(raw_query)?;
        let started = Instant::now();

        let expansion = self.expand(&query).await?;

        let image = self
            .gateway
            .synthesize_image(&expansion.image_prompt)
            .await
            .map_err(PipelineError::ImageSynthesis)?;
        debug!(tokens = image.token_count, bytes = image.image_bytes.len(), "Image synthesized");

        let judge_mime = image.mime_type.as_deref().unwrap_or(RESPONSE_MIME);
        let verification =
            self.gateway.judge_image_match(query.as_str(), &image.image_bytes, judge_mime).await?;
        debug!(matches = verification.matches, "Image judged");

        let tokens =
            TokenUsage { text_tokens: expansion.token_count, image_tokens: image.token_count };

        info!(
            text_tokens = tokens.text_tokens,
            image_tokens = tokens.image_tokens,
            matches = verification.matches,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Pipeline completed"
        );

        Ok(PipelineResponse {
            image_base64: STANDARD.encode(&image.image_bytes),
            mime: RESPONSE_MIME.to_string(),
            prompt_text: expansion.image_prompt,
            tokens,
            verification,
        })
    }

    /// Asks the text model to turn the query into an image prompt.
    async fn expand(&self, query: &UserQuery) -> Result<ExpansionResult, PipelineError> {
        let instruction = expansion_instruction(query.as_str());
        debug!(backend = %self.backend_id(), query_len = query.as_str().len(), "Expanding query");

        let generation = self.gateway.generate_text(&instruction).await?;
        let image_prompt = extract_image_prompt(&generation.text)?;
        debug!(tokens = generation.token_count, prompt_len = image_prompt.len(), "Query expanded");

        Ok(ExpansionResult { image_prompt, token_count: generation.token_count })
    }
}

/// Reads `image_prompt` out of the expansion reply.
fn extract_image_prompt(raw: &str) -> Result<String, PipelineError> {
    let object = reply::parse_json_object(raw)?;
    match object.get(IMAGE_PROMPT_KEY) {
        Some(Value::String(prompt)) if !prompt.trim().is_empty() => Ok(prompt.clone()),
        Some(Value::String(_)) => {
            Err(PipelineError::PromptExpansion(format!("`{IMAGE_PROMPT_KEY}` is empty")))
        }
        Some(_) => {
            Err(PipelineError::PromptExpansion(format!("`{IMAGE_PROMPT_KEY}` is not a string")))
        }
        None => Err(PipelineError::PromptExpansion(format!(
            "expansion reply has no `{IMAGE_PROMPT_KEY}` key"
        ))),
    }
}
