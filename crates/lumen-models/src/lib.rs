//! Gateway implementations for Lumen.
//!
//! This crate provides concrete implementations of the `ModelGateway` trait.
//!
//! # Supported Backends
//!
//! - **Gemini**: Google's Generative Language REST API (API key required)
//! - **Mock**: Scripted in-process gateway for testing and offline development

pub mod factory;
pub mod gemini;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lumen_abstraction::{
    GatewayError, ImageGeneration, ImageVerdict, ModelGateway, TextGeneration,
};
use tracing::debug;

pub use factory::{BackendType, GatewayConfig, GatewayFactory};
pub use gemini::GeminiGateway;

/// A 1x1 transparent PNG, returned by `MockGateway` unless scripted otherwise.
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Number of calls a `MockGateway` has received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayCalls {
    pub text: usize,
    pub image: usize,
    pub judge: usize,
}

impl GatewayCalls {
    /// Total calls across all operations.
    pub const fn total(&self) -> usize {
        self.text + self.image + self.judge
    }
}

type Scripted<T> = Option<Result<T, GatewayError>>;

/// A scripted implementation of the `ModelGateway` trait for testing and demonstration.
///
/// Unscripted operations answer with a fenced expansion reply that echoes the
/// query, a placeholder PNG, and a positive verdict.
#[derive(Debug, Default)]
pub struct MockGateway {
    id: String,
    text: Scripted<String>,
    image: Scripted<Vec<u8>>,
    judge: Scripted<String>,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
    judge_calls: AtomicUsize,
}

impl MockGateway {
    /// Creates a new `MockGateway` with the given ID.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self { id, ..Self::default() }
    }

    /// Scripts the raw reply returned by `generate_text`.
    #[must_use]
    pub fn with_text_reply(mut self, reply: impl Into<String>) -> Self {
        self.text = Some(Ok(reply.into()));
        self
    }

    /// Scripts `generate_text` to fail.
    #[must_use]
    pub fn with_text_error(mut self, error: GatewayError) -> Self {
        self.text = Some(Err(error));
        self
    }

    /// Scripts the bytes returned by `synthesize_image`.
    #[must_use]
    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(Ok(bytes));
        self
    }

    /// Scripts `synthesize_image` to fail.
    #[must_use]
    pub fn with_image_error(mut self, error: GatewayError) -> Self {
        self.image = Some(Err(error));
        self
    }

    /// Scripts the raw judge reply; it is parsed like a real model reply.
    #[must_use]
    pub fn with_judge_reply(mut self, reply: impl Into<String>) -> Self {
        self.judge = Some(Ok(reply.into()));
        self
    }

    /// Scripts `judge_image_match` to fail.
    #[must_use]
    pub fn with_judge_error(mut self, error: GatewayError) -> Self {
        self.judge = Some(Err(error));
        self
    }

    /// Returns how many times each operation has been called.
    pub fn calls(&self) -> GatewayCalls {
        GatewayCalls {
            text: self.text_calls.load(Ordering::SeqCst),
            image: self.image_calls.load(Ordering::SeqCst),
            judge: self.judge_calls.load(Ordering::SeqCst),
        }
    }

    fn default_text_reply(prompt: &str) -> String {
        // The expansion instruction ends with the quoted query.
        let subject = prompt
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .trim_matches('"');
        let image_prompt = format!("A detailed illustration of {subject}, white background");
        format!(
            "```json\n{}\n```",
            serde_json::json!({ "image_prompt": image_prompt })
        )
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn generate_text(&self, prompt: &str) -> Result<TextGeneration, GatewayError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        debug!(gateway_id = %self.id, prompt_len = prompt.len(), "MockGateway generating text");

        if prompt.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("prompt must not be empty".to_string()));
        }

        let text = match &self.text {
            Some(scripted) => scripted.clone()?,
            None => Self::default_text_reply(prompt),
        };
        if text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }

        let token_count = count_tokens(prompt) + count_tokens(&text);
        Ok(TextGeneration { text, token_count })
    }

    async fn synthesize_image(&self, prompt: &str) -> Result<ImageGeneration, GatewayError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        debug!(gateway_id = %self.id, prompt_len = prompt.len(), "MockGateway synthesizing image");

        if prompt.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("prompt must not be empty".to_string()));
        }

        let (image_bytes, mime_type) = match &self.image {
            Some(scripted) => (scripted.clone()?, None),
            None => (PLACEHOLDER_PNG.to_vec(), Some("image/png".to_string())),
        };
        if image_bytes.is_empty() {
            return Err(GatewayError::NoImagePayload);
        }

        Ok(ImageGeneration { image_bytes, mime_type, token_count: count_tokens(prompt) })
    }

    async fn judge_image_match(
        &self,
        query: &str,
        image: &[u8],
        mime: &str,
    ) -> Result<ImageVerdict, GatewayError> {
        self.judge_calls.fetch_add(1, Ordering::SeqCst);
        debug!(
            gateway_id = %self.id,
            query = %query,
            image_len = image.len(),
            mime = %mime,
            "MockGateway judging image"
        );

        if image.is_empty() {
            return Err(GatewayError::InvalidRequest("image bytes must not be empty".to_string()));
        }

        match &self.judge {
            Some(scripted) => ImageVerdict::from_judge_reply(&scripted.clone()?),
            None => Ok(ImageVerdict { matches: true }),
        }
    }

    fn backend_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
#[allow(clippy::cast_possible_truncation)]
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_abstraction::reply::parse_json_object;

    #[tokio::test]
    async fn test_mock_default_text_reply_is_fenced_expansion() {
        let gateway = MockGateway::new("mock".to_string());
        let generation = gateway
            .generate_text("Expand this.\n\nUSER QUERY:\n\"a red apple\"\n")
            .await
            .unwrap();

        assert!(generation.text.starts_with("```json"));
        let object = parse_json_object(&generation.text).unwrap();
        assert_eq!(
            object["image_prompt"],
            serde_json::json!("A detailed illustration of a red apple, white background")
        );
        assert!(generation.token_count > 0);
    }

    #[tokio::test]
    async fn test_mock_default_image_is_png() {
        let gateway = MockGateway::new("mock".to_string());
        let image = gateway.synthesize_image("anything").await.unwrap();
        assert!(image.image_bytes.starts_with(b"\x89PNG"));
        assert_eq!(image.mime_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let gateway = MockGateway::new("mock".to_string());
        let _ = gateway.generate_text("one").await;
        let _ = gateway.generate_text("two").await;
        let _ = gateway.judge_image_match("q", PLACEHOLDER_PNG, "image/png").await;

        assert_eq!(gateway.calls(), GatewayCalls { text: 2, image: 0, judge: 1 });
        assert_eq!(gateway.calls().total(), 3);
    }

    #[tokio::test]
    async fn test_mock_scripted_errors() {
        let gateway = MockGateway::new("mock".to_string())
            .with_image_error(GatewayError::transport("boom"));
        let err = gateway.synthesize_image("prompt").await.unwrap_err();
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_mock_rejects_empty_input() {
        let gateway = MockGateway::new("mock".to_string());
        assert!(matches!(
            gateway.generate_text("  ").await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            gateway.judge_image_match("q", &[], "image/png").await,
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_judge_reply_is_parsed() {
        let gateway = MockGateway::new("mock".to_string()).with_judge_reply("```\n{}\n```");
        let verdict = gateway.judge_image_match("q", PLACEHOLDER_PNG, "image/png").await.unwrap();
        assert!(verdict.matches);
    }

    #[test]
    fn test_count_tokens() {
        assert_eq!(count_tokens("a red  apple"), 3);
        assert_eq!(count_tokens(""), 0);
    }
}
