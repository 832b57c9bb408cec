//! Startup configuration from the environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use arag_core::GenerateContentConfig;
use arag_rag::{RagConfig, RagError};
use thiserror::Error;
use tracing::{info, warn};

/// Sources indexed when no sources file or `--source` flag is given.
pub const DEFAULT_SOURCES: [&str; 2] = [
    "https://lilianweng.github.io/posts/2023-06-23-agent/",
    "https://lilianweng.github.io/posts/2024-04-12-diffusion-video/",
];

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_SOURCES_FILE: &str = "data/urls.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set (GOOGLE_API_KEY is also accepted)")]
    MissingApiKey,

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid { key: &'static str, value: String, reason: String },

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error("Failed to read sources file {}: {source}", .path.display())]
    SourcesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which embedding provider indexes the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingBackend {
    /// Feature hashing, no network or model download.
    #[default]
    Hashing,
    Gemini,
    /// Local ONNX model, requires the `fastembed` feature.
    FastEmbed,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "gemini" => Ok(Self::Gemini),
            "fastembed" => Ok(Self::FastEmbed),
            _ => Err("expected one of: hashing, gemini, fastembed".to_string()),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub rag: RagConfig,
    pub embedding: EmbeddingBackend,
    /// Budget for each external call.
    pub request_timeout: Duration,
    /// Cap on model calls per answer.
    pub max_agent_steps: usize,
    /// Sampling temperature for the answering model; the model default when unset.
    pub temperature: Option<f32>,
    pub sources_file: PathBuf,
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Fails when no API key is available, a numeric setting does not parse,
    /// or the chunking parameters are inconsistent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GEMINI_API_KEY")
            .or_else(|| get("GOOGLE_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let rag = RagConfig::builder()
            .chunk_size(parse(&get, "CHUNK_SIZE", 500)?)
            .chunk_overlap(parse(&get, "CHUNK_OVERLAP", 50)?)
            .top_k(parse(&get, "TOP_K", 4)?)
            .build()?;

        let embedding: EmbeddingBackend = match get("EMBEDDING_PROVIDER") {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                key: "EMBEDDING_PROVIDER",
                value,
                reason,
            })?,
            None => EmbeddingBackend::default(),
        };

        let max_agent_steps = parse(&get, "MAX_AGENT_STEPS", 8)?;
        if max_agent_steps == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_AGENT_STEPS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let temperature = match get("LLM_TEMPERATURE") {
            Some(value) => {
                let parsed: f32 = parse(&get, "LLM_TEMPERATURE", 0.0)?;
                if !(0.0..=2.0).contains(&parsed) {
                    return Err(ConfigError::Invalid {
                        key: "LLM_TEMPERATURE",
                        value,
                        reason: "must be between 0 and 2".into(),
                    });
                }
                Some(parsed)
            }
            None => None,
        };

        Ok(Self {
            api_key,
            model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            rag,
            embedding,
            request_timeout: Duration::from_secs(parse(&get, "REQUEST_TIMEOUT_SECS", 60)?),
            max_agent_steps,
            temperature,
            sources_file: get("SOURCES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCES_FILE)),
        })
    }
}

impl AppConfig {
    /// Per-call model settings, if any were configured.
    pub fn generate_config(&self) -> Option<GenerateContentConfig> {
        self.temperature.map(|temperature| GenerateContentConfig {
            temperature: Some(temperature),
            ..GenerateContentConfig::default()
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// Read one source per line from `path`, skipping blank lines.
///
/// A missing or empty file yields [`DEFAULT_SOURCES`].
pub fn load_sources(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "no sources file, using defaults");
        return Ok(default_sources());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::SourcesFile { path: path.to_path_buf(), source })?;

    let sources: Vec<String> =
        text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect();
    if sources.is_empty() {
        warn!(path = %path.display(), "sources file is empty, using defaults");
        return Ok(default_sources());
    }
    info!(path = %path.display(), count = sources.len(), "loaded sources");
    Ok(sources)
}

pub fn default_sources() -> Vec<String> {
    DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
}
