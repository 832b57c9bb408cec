//! # arag-agent
//!
//! The answering side of the Agentic RAG workspace.
//!
//! - [`ReactAgent`] - a bounded loop that alternates model calls and tool calls
//! - [`WikipediaTool`] - general-knowledge lookup
//! - [`AnswerComposer`] - builds the agent once and turns its runs into answers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use arag_agent::{AnswerComposer, WikipediaConfig, WikipediaTool};
//!
//! let wikipedia = Arc::new(WikipediaTool::new(WikipediaConfig::default())?);
//! let composer = AnswerComposer::new(model, retriever, wikipedia);
//! let answer = composer.compose("What is an agent loop?", &[]).await?;
//! ```

pub mod composer;
pub mod react;
pub mod wikipedia;

pub use composer::{AnswerComposer, FALLBACK_ANSWER, SYSTEM_PROMPT};
pub use react::{AgentRun, DEFAULT_MAX_ITERATIONS, ReactAgent, ReactAgentBuilder, StopReason};
pub use wikipedia::{WikipediaConfig, WikipediaTool};
