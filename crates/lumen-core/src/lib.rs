//! Lumen Core - query-to-image generation service.
//!
//! This crate provides the core functionality for Lumen, including:
//! - the generation pipeline (expand, synthesize, judge)
//! - the HTTP server and its request logging
//! - configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use lumen_core::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::error::Result<()> {
//!     let config = Config::load(None)?;
//!     server::run(&config).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;

pub use config::Config;
pub use error::{CoreError, Result};
pub use pipeline::{Pipeline, PipelineError, PipelineResponse, TokenUsage, UserQuery};
pub use server::{AppState, router};
