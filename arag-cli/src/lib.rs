//! # arag-cli
//!
//! Application shell for the Agentic RAG workspace: environment
//! configuration, the assembled [`AgenticRag`] pipeline, the interactive
//! console and the web form front end.

pub mod app;
pub mod config;
pub mod console;
pub mod telemetry;
pub mod web;

pub use app::{AgenticRag, AppError, RagService};
pub use config::{AppConfig, ConfigError, EmbeddingBackend, load_sources};
pub use web::{ServerConfig, WebState, app_router, run_server};
