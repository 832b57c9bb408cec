//! # arag-core
//!
//! Core types and traits shared by the Agentic RAG crates.
//!
//! ## Overview
//!
//! - [`Content`] / [`Part`] - role-tagged messages exchanged with a model
//! - [`Llm`] - a language model that can answer an [`LlmRequest`]
//! - [`Tool`] - a named capability an agent can call
//! - [`AragError`] - the shared error type for model and tool failures
//! - [`RetryPolicy`] - bounded exponential backoff for external calls
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arag_core::{Content, LlmRequest};
//!
//! let request = LlmRequest::new("gemini-2.0-flash-lite", vec![
//!     Content::new("user").with_text("What is an agent loop?"),
//! ]);
//! let response = model.generate_content(request).await?;
//! ```

pub mod content;
pub mod error;
pub mod model;
pub mod retry;
pub mod tool;

pub use content::{Content, Part};
pub use error::{AragError, Result};
pub use model::{FunctionDeclaration, GenerateContentConfig, Llm, LlmRequest, LlmResponse};
pub use retry::RetryPolicy;
pub use tool::Tool;
