//! Loading sources (web pages, PDFs, text files) into [`Document`]s.
//!
//! A source string is classified by [`Source::parse`], in this order:
//!
//! 1. `http://` or `https://` prefix: a web page
//! 2. an existing directory: every `*.pdf` file directly inside it
//! 3. `.txt` suffix: a UTF-8 text file
//! 4. `.pdf` suffix: a PDF, one document per page
//!
//! Suffixes are matched case-insensitively. Anything else is
//! [`RagError::UnsupportedSource`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arag_core::RetryPolicy;
use tracing::{debug, info, warn};

use crate::document::{Document, META_PAGE, META_TITLE};
use crate::error::{RagError, Result};

/// A classified ingestion source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    PdfDirectory(PathBuf),
    TextFile(PathBuf),
    PdfFile(PathBuf),
}

impl Source {
    /// Classify a source string.
    ///
    /// Only the directory check touches the filesystem; files are not opened.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let unsupported = || RagError::UnsupportedSource { location: raw.to_string() };

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            url::Url::parse(trimmed).map_err(|_| unsupported())?;
            return Ok(Self::Url(trimmed.to_string()));
        }

        let path = PathBuf::from(trimmed);
        if path.is_dir() {
            return Ok(Self::PdfDirectory(path));
        }
        if has_extension(&path, "txt") {
            return Ok(Self::TextFile(path));
        }
        if has_extension(&path, "pdf") {
            return Ok(Self::PdfFile(path));
        }
        Err(unsupported())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::PdfDirectory(path) | Self::TextFile(path) | Self::PdfFile(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case(wanted))
}

/// Settings for [`DocumentLoader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Per-request timeout for web fetches.
    pub timeout: Duration,
    /// Backoff for transient web failures (timeouts, 429, 5xx).
    pub retry: RetryPolicy,
    /// `User-Agent` header sent with web requests.
    pub user_agent: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            user_agent: concat!("arag/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Loads sources into documents.
///
/// # Example
///
/// ```rust,ignore
/// use arag_rag::{DocumentLoader, LoaderConfig};
///
/// let loader = DocumentLoader::new(LoaderConfig::default())?;
/// let docs = loader.load(&["data/notes.txt".to_string()]).await?;
/// ```
pub struct DocumentLoader {
    client: reqwest::Client,
    config: LoaderConfig,
}

struct FetchFailure {
    error: RagError,
    transient: bool,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl DocumentLoader {
    pub fn new(config: LoaderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Load every source, in order.
    ///
    /// All sources are classified before any is read, so an unsupported
    /// source fails the call without touching the others.
    pub async fn load(&self, sources: &[String]) -> Result<Vec<Document>> {
        let parsed = sources.iter().map(|s| Source::parse(s)).collect::<Result<Vec<_>>>()?;

        let mut documents = Vec::new();
        for source in &parsed {
            let loaded = self.load_source(source).await?;
            info!(source = %source, documents = loaded.len(), "loaded source");
            documents.extend(loaded);
        }
        Ok(documents)
    }

    /// Load a single classified source.
    pub async fn load_source(&self, source: &Source) -> Result<Vec<Document>> {
        match source {
            Source::Url(url) => Ok(vec![self.load_url(url).await?]),
            Source::TextFile(path) => Ok(vec![load_text(path).await?]),
            Source::PdfFile(path) => load_pdf(path).await,
            Source::PdfDirectory(dir) => {
                let mut documents = Vec::new();
                for path in pdf_files_in(dir).await? {
                    documents.extend(load_pdf(&path).await?);
                }
                Ok(documents)
            }
        }
    }

    async fn load_url(&self, url: &str) -> Result<Document> {
        let html = self
            .config
            .retry
            .run("web.fetch", |f: &FetchFailure| f.transient, || self.fetch_once(url))
            .await
            .map_err(|f| f.error)?;
        html_to_document(url, &html)
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        debug!(url, "fetching web page");
        let load_error = |message: String, transient: bool| FetchFailure {
            error: RagError::Load { location: url.to_string(), message },
            transient,
        };
        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchFailure {
                    error: RagError::Timeout { service: "web".into(), after: self.config.timeout },
                    transient: true,
                }
            } else {
                let transient = e.is_connect();
                load_error(e.to_string(), transient)
            }
        };

        let response = self.client.get(url).send().await.map_err(&transport)?;
        let status = response.status();
        if !status.is_success() {
            let transient = status.as_u16() == 429 || status.is_server_error();
            return Err(load_error(format!("HTTP {status}"), transient));
        }
        response.text().await.map_err(&transport)
    }
}

/// Convert an HTML page into a document with Markdown-flavoured text.
pub fn html_to_document(url: &str, html: &str) -> Result<Document> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "head"])
        .build();
    let text = converter.convert(html).map_err(|e| RagError::Load {
        location: url.to_string(),
        message: format!("failed to convert HTML: {e}"),
    })?;

    let mut document = Document::new(url, text.trim(), url);
    if let Some(title) = extract_title(html) {
        document = document.with_metadata(META_TITLE, title);
    }
    Ok(document)
}

/// The text of the first `<title>` element, whitespace-collapsed.
fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let mut from = 0;
    let open = loop {
        let at = from + lower[from..].find("<title")?;
        let next = lower.as_bytes().get(at + "<title".len()).copied()?;
        if next == b'>' || next.is_ascii_whitespace() {
            break at;
        }
        from = at + 1;
    };
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;

    let title = decode_entities(&html[start..end]);
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

async fn load_text(path: &Path) -> Result<Document> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| RagError::Load {
        location: path.display().to_string(),
        message: e.to_string(),
    })?;
    let name = path.display().to_string();
    Ok(Document::new(name.clone(), text, name))
}

async fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let name = path.display().to_string();
    let owned = path.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned))
        .await
        .map_err(|e| RagError::Load { location: name.clone(), message: e.to_string() })?
        .map_err(|e| RagError::Load {
            location: name.clone(),
            message: format!("failed to extract PDF text: {e}"),
        })?;

    let documents = pages
        .iter()
        .enumerate()
        .map(|(page, page_text)| {
            Document::new(format!("{name}#page={page}"), page_text.trim(), name.clone())
                .with_metadata(META_PAGE, page.to_string())
        })
        .collect::<Vec<_>>();
    debug!(path = %name, pages = documents.len(), "extracted PDF");
    Ok(documents)
}

/// PDF files directly inside `dir`, sorted by file name.
async fn pdf_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_error = |e: std::io::Error| RagError::Load {
        location: dir.display().to_string(),
        message: e.to_string(),
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && has_extension(&path, "pdf") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if files.is_empty() {
        warn!(dir = %dir.display(), "directory contains no PDF files");
    }
    Ok(files)
}
