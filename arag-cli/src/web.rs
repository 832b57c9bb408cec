//! Web form front end.
//!
//! `GET /` shows the question form, `POST /ask` answers a question and shows
//! the retrieved passages plus the browser session's recent questions, and
//! `GET /health` reports whether the pipeline initialized.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Form, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::app::{AppError, RagService};

pub const SESSION_COOKIE: &str = "arag_session";
const PREVIEW_CHARS: usize = 300;
const HISTORY_ANSWER_CHARS: usize = 200;
const HISTORY_SHOWN: usize = 3;
const MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8501 }
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    question: String,
    answer: String,
    elapsed: Duration,
    asked_at: DateTime<Utc>,
}

#[derive(Clone)]
enum Backend {
    Ready { service: Arc<dyn RagService>, chunk_count: usize },
    Failed(String),
}

/// Per-browser history, newest last, never longer than `HISTORY_SHOWN`.
#[derive(Debug, Default)]
struct Session {
    entries: VecDeque<HistoryEntry>,
    last_seen: u64,
}

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<String, Session>,
    clock: u64,
}

/// Shared state of the web front end.
#[derive(Clone)]
pub struct WebState {
    backend: Backend,
    sessions: Arc<RwLock<Sessions>>,
    max_sessions: usize,
}

impl WebState {
    pub fn ready(service: Arc<dyn RagService>, chunk_count: usize) -> Self {
        Self::new(Backend::Ready { service, chunk_count })
    }

    /// A front end whose pipeline failed to start. Every page shows `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(Backend::Failed(message.into()))
    }

    fn new(backend: Backend) -> Self {
        Self { backend, sessions: Arc::default(), max_sessions: MAX_SESSIONS }
    }

    /// Number of browser sessions kept before the least recently active one is dropped.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    question: String,
}

pub fn app_router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ask", post(ask))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(state: WebState, config: ServerConfig) -> Result<(), AppError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid host/port: {e}"))
    })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("web front end listening on http://{}", addr);
    axum::serve(listener, app_router(state)).await?;
    Ok(())
}

async fn index(State(state): State<WebState>, headers: HeaderMap) -> Response {
    let (session, is_new) = session_id(&headers);
    let history = state.history(&session).await;
    let page = Page { state: &state, outcome: None, history: &history };
    with_session(Html(page.render()), &session, is_new)
}

async fn ask(
    State(state): State<WebState>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Response {
    let (session, is_new) = session_id(&headers);
    let question = form.question.trim().to_string();

    let outcome = match &state.backend {
        Backend::Ready { service, .. } if !question.is_empty() => {
            let started = Instant::now();
            let result = service.run(&question).await;
            let elapsed = started.elapsed();
            match result {
                Ok(rag_state) => {
                    let answer = rag_state.answer.clone().unwrap_or_default();
                    info!(elapsed_ms = elapsed.as_millis() as u64, "web question answered");
                    state
                        .record(&session, HistoryEntry {
                            question: question.clone(),
                            answer: answer.clone(),
                            elapsed,
                            asked_at: Utc::now(),
                        })
                        .await;
                    let previews = rag_state.docs().iter().map(|c| preview(&c.text)).collect();
                    Some(Outcome::Answered { answer, elapsed, previews })
                }
                Err(err) => {
                    error!(error = %err, "web question failed");
                    Some(Outcome::Failed(err.to_string()))
                }
            }
        }
        _ => None,
    };

    let history = state.history(&session).await;
    let page = Page { state: &state, outcome: outcome.as_ref(), history: &history };
    with_session(Html(page.render()), &session, is_new)
}

async fn health(State(state): State<WebState>) -> impl IntoResponse {
    match &state.backend {
        Backend::Ready { chunk_count, .. } => {
            (StatusCode::OK, Json(json!({ "status": "ok", "chunks": chunk_count })))
        }
        Backend::Failed(message) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "error": message })),
        ),
    }
}

impl WebState {
    /// The session's recent questions, newest first.
    async fn history(&self, session: &str) -> Vec<HistoryEntry> {
        let sessions = self.sessions.read().await;
        sessions
            .by_id
            .get(session)
            .map(|s| s.entries.iter().rev().take(HISTORY_SHOWN).cloned().collect())
            .unwrap_or_default()
    }

    async fn record(&self, session: &str, entry: HistoryEntry) {
        let mut sessions = self.sessions.write().await;
        sessions.clock += 1;
        let now = sessions.clock;

        if !sessions.by_id.contains_key(session) && sessions.by_id.len() >= self.max_sessions {
            let stale =
                sessions.by_id.iter().min_by_key(|(_, s)| s.last_seen).map(|(id, _)| id.clone());
            if let Some(stale) = stale {
                debug!(session = %stale, "dropping least recently active session");
                sessions.by_id.remove(&stale);
            }
        }

        let state = sessions.by_id.entry(session.to_string()).or_default();
        state.last_seen = now;
        state.entries.push_back(entry);
        while state.entries.len() > HISTORY_SHOWN {
            state.entries.pop_front();
        }
    }
}

fn session_id(headers: &HeaderMap) -> (String, bool) {
    let existing = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && Uuid::parse_str(value).is_ok())
        .map(|(_, value)| value.to_string());
    match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    }
}

fn with_session(body: Html<String>, session: &str, is_new: bool) -> Response {
    let mut response = body.into_response();
    if is_new {
        let cookie = format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

enum Outcome {
    Answered { answer: String, elapsed: Duration, previews: Vec<String> },
    Failed(String),
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn preview(text: &str) -> String {
    truncate_chars(text, PREVIEW_CHARS)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

struct Page<'a> {
    state: &'a WebState,
    outcome: Option<&'a Outcome>,
    history: &'a [HistoryEntry],
}

impl Page<'_> {
    fn render(&self) -> String {
        let mut body = String::new();
        body.push_str("<h1>RAG Document Search</h1>\n<p>Ask questions about the loaded documents</p>\n");

        match &self.state.backend {
            Backend::Failed(message) => {
                body.push_str(&format!(
                    "<div class=\"error\">Failed to initialize: {}</div>\n",
                    escape(message)
                ));
            }
            Backend::Ready { chunk_count, .. } => {
                body.push_str(&format!(
                    "<div class=\"ready\">System ready! ({chunk_count} document chunks loaded)</div>\n"
                ));
            }
        }

        body.push_str(concat!(
            "<form method=\"post\" action=\"/ask\">\n",
            "<input type=\"text\" name=\"question\" placeholder=\"What would you like to know?\">\n",
            "<button type=\"submit\">Search</button>\n",
            "</form>\n",
        ));

        match self.outcome {
            Some(Outcome::Answered { answer, elapsed, previews }) => {
                body.push_str(&format!(
                    "<h2>Answer</h2>\n<div class=\"answer\">{}</div>\n",
                    escape(answer)
                ));
                body.push_str("<details><summary>Source Documents</summary>\n");
                for (i, text) in previews.iter().enumerate() {
                    body.push_str(&format!(
                        "<h3>Document {}</h3>\n<pre>{}</pre>\n",
                        i + 1,
                        escape(text)
                    ));
                }
                body.push_str("</details>\n");
                body.push_str(&format!(
                    "<p class=\"latency\">Response time: {:.2} seconds</p>\n",
                    elapsed.as_secs_f64()
                ));
            }
            Some(Outcome::Failed(message)) => {
                body.push_str(&format!("<div class=\"error\">{}</div>\n", escape(message)));
            }
            None => {}
        }

        if !self.history.is_empty() {
            body.push_str("<h2>Recent Searches</h2>\n");
            for entry in self.history {
                body.push_str(&format!(
                    "<div class=\"history\"><p><b>Q:</b> {}</p><p><b>A:</b> {}</p><small>Time: {:.2}s at {}</small></div>\n",
                    escape(&entry.question),
                    escape(&truncate_chars(&entry.answer, HISTORY_ANSWER_CHARS)),
                    entry.elapsed.as_secs_f64(),
                    entry.asked_at.format("%H:%M:%S"),
                ));
            }
        }

        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>RAG Search</title></head>\n<body>\n{body}</body>\n</html>\n"
        )
    }
}
