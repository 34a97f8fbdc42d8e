use lumen_abstraction::GatewayError;
use thiserror::Error;

/// Failure of one pipeline run. Every variant aborts the request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The user query was rejected before any gateway call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The expansion reply parsed but carried no usable `image_prompt`.
    #[error("Prompt expansion failed: {0}")]
    PromptExpansion(String),

    /// The image stage failed.
    #[error("Image synthesis failed: {0}")]
    ImageSynthesis(#[source] GatewayError),

    /// A gateway or reply-parsing failure in the expansion or judge stage.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl PipelineError {
    /// Stable machine-readable tag for this error.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::PromptExpansion(_) => "prompt_expansion_error",
            Self::ImageSynthesis(_) => "image_synthesis_error",
            Self::Gateway(inner) => inner.kind(),
        }
    }

    /// Whether the root cause is a remote transport or status failure.
    pub const fn is_remote(&self) -> bool {
        match self {
            Self::ImageSynthesis(inner) | Self::Gateway(inner) => inner.is_remote(),
            Self::Validation(_) | Self::PromptExpansion(_) => false,
        }
    }
}
