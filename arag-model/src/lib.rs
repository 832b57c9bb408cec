//! # arag-model
//!
//! LLM model integrations for the Agentic RAG workspace.
//!
//! - [`GeminiModel`] - Google's Gemini models over the REST `generateContent` API
//! - [`MockLlm`] - scripted model for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arag_model::{GeminiConfig, GeminiModel};
//!
//! let api_key = std::env::var("GEMINI_API_KEY").unwrap();
//! let model = GeminiModel::new(GeminiConfig::new(api_key, "gemini-2.0-flash-lite")).unwrap();
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;
pub mod mock;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiModel};
pub use mock::MockLlm;
