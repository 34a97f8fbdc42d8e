//! Model gateway abstraction layer for Lumen.
//!
//! This crate defines the capability interface the generation pipeline talks to,
//! the value types that flow through it, and the tolerant reply parser shared by
//! every gateway implementation.

pub mod reply;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an error that can occur when talking to a model backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway could not be built from its configuration (e.g., missing credential).
    #[error("Configuration Error: {0}")]
    Configuration(String),

    /// The caller passed input the gateway refuses to send (e.g., an empty prompt).
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    /// The backend was unreachable, rejected the request, or returned a non-success status.
    #[error("Remote Service Error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    RemoteService {
        /// HTTP status returned by the backend, if a response was received at all.
        status: Option<u16>,
        /// Error detail from the transport or the backend body.
        message: String,
    },

    /// The backend answered successfully but the reply carried no text.
    #[error("Empty Response: model returned no text")]
    EmptyResponse,

    /// The backend answered successfully but the reply carried no inline image data.
    #[error("No Image Payload: model returned no inline image data")]
    NoImagePayload,

    /// The model's reply could not be read as the expected JSON object.
    #[error("Malformed Payload: {0}")]
    MalformedPayload(String),
}

impl GatewayError {
    /// Shorthand for a transport-level failure with no HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::RemoteService { status: None, message: message.into() }
    }

    /// Whether this error originated on the remote side of the boundary.
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteService { .. })
    }

    /// Stable snake_case tag for this error, suitable for API responses.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::RemoteService { .. } => "remote_service_error",
            Self::EmptyResponse => "empty_response",
            Self::NoImagePayload => "no_image_payload",
            Self::MalformedPayload(_) => "malformed_payload",
        }
    }
}

/// Fixed generation settings applied to one kind of model call.
///
/// Every gateway call uses a constant seed (and usually a low temperature) so that
/// repeated calls with the same input tend to be reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Fixed random seed.
    pub seed: Option<i64>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Reasoning budget in tokens; `Some(0)` disables "thinking".
    pub thinking_budget: Option<u32>,
}

impl GenerationSettings {
    /// Seed used for every call unless configured otherwise.
    pub const DEFAULT_SEED: i64 = 42;
    /// Temperature used for text and image calls unless configured otherwise.
    pub const DEFAULT_TEMPERATURE: f32 = 0.1;

    /// Settings for prompt expansion: seeded, low temperature, thinking disabled.
    pub const fn text(seed: i64, temperature: f32) -> Self {
        Self { seed: Some(seed), temperature: Some(temperature), thinking_budget: Some(0) }
    }

    /// Settings for image synthesis: seeded, low temperature.
    pub const fn image(seed: i64, temperature: f32) -> Self {
        Self { seed: Some(seed), temperature: Some(temperature), thinking_budget: None }
    }

    /// Settings for the judge call: seeded only.
    pub const fn judge(seed: i64) -> Self {
        Self { seed: Some(seed), temperature: None, thinking_budget: None }
    }
}

/// Text returned by a text-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextGeneration {
    /// The generated text.
    pub text: String,
    /// Backend-reported total token count for the call.
    pub token_count: u32,
}

/// Image returned by an image-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGeneration {
    /// Raw bytes of the first inline image payload.
    pub image_bytes: Vec<u8>,
    /// MIME type the backend declared for the payload, if any.
    pub mime_type: Option<String>,
    /// Backend-reported total token count for the call.
    pub token_count: u32,
}

/// Verdict of the judge stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVerdict {
    /// Whether the image matches the user's query.
    #[serde(rename = "match")]
    pub matches: bool,
}

impl ImageVerdict {
    /// Builds a verdict from the judge model's raw reply.
    ///
    /// A reply without a `match` key counts as a match. A present key is read
    /// by JSON truthiness, so `false`, `null`, `0`, `""`, `[]` and `{}` all
    /// mean no match.
    ///
    /// # Errors
    /// Returns `GatewayError::MalformedPayload` if the reply is not a JSON object.
    pub fn from_judge_reply(raw: &str) -> Result<Self, GatewayError> {
        let object = reply::parse_json_object(raw)?;
        let matches = object.get("match").is_none_or(reply::is_truthy);
        Ok(Self { matches })
    }
}

/// The capability interface every model backend implements.
///
/// Each operation performs exactly one request/response exchange with the
/// backend. Implementations must not retry and must not cache.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Generates text for the given prompt using deterministic settings.
    ///
    /// # Errors
    /// `InvalidRequest` for an empty prompt, `RemoteService` on transport or
    /// status failures, `EmptyResponse` when the reply holds no text.
    async fn generate_text(&self, prompt: &str) -> Result<TextGeneration, GatewayError>;

    /// Renders the given prompt into an image.
    ///
    /// # Errors
    /// `InvalidRequest` for an empty prompt, `RemoteService` on transport or
    /// status failures, `NoImagePayload` when the reply holds no inline data.
    async fn synthesize_image(&self, prompt: &str) -> Result<ImageGeneration, GatewayError>;

    /// Asks the judge model whether `image` matches `query`.
    ///
    /// # Errors
    /// `InvalidRequest` for empty image bytes, `RemoteService` on transport or
    /// status failures, `EmptyResponse` or `MalformedPayload` when the reply
    /// cannot be read as a verdict.
    async fn judge_image_match(
        &self,
        query: &str,
        image: &[u8],
        mime: &str,
    ) -> Result<ImageVerdict, GatewayError>;

    /// Returns an identifier for the backend, used in logs and health output.
    fn backend_id(&self) -> &str;
}
