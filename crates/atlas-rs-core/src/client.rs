//! Network client for the remote answering service.
//!
//! Every ask resolves to an [`Outcome`]: transport failures, server errors and
//! unreadable bodies are classified values, never errors, so the session layer
//! can always render a reply.

use crate::error::{Cancelled, ClientError};
use async_trait::async_trait;
use atlas_rs_config::ClientConfig;
use atlas_rs_protocol::{MatchRecord, ServiceHealth};
use log::{debug, info, warn};
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Note attached to a debug reply for an empty question.
pub const EMPTY_QUESTION_NOTE: &str = "EMPTY_QUESTION";

/// Which endpoint a question is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskMode {
    /// Full answering path.
    Answer,
    /// Retrieval-only path; replies carry matches and never answer text.
    Debug,
}

/// Successful reply, already normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answer {
    pub matches: Vec<MatchRecord>,
    pub answer: String,
    pub elapsed_ms: u64,
    pub note: Option<String>,
    /// Produced by the debug path.
    pub debug: bool,
}

/// Classification of a failed ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Question was empty after trimming; no request was made.
    EmptyQuestion,
    /// Server answered with a non-2xx status.
    HttpError(u16),
    /// Transport failure (DNS, refused or reset connection, timeout).
    Network,
    /// A 2xx response whose body could not be read as a JSON object.
    Malformed,
}

/// Failed ask with an optional human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, detail: Option<String>) -> Self {
        Self { kind, detail }
    }
}

/// Result of a single logical ask.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Answered(Answer),
    Failed(Failure),
}

/// Interface to the remote answering service.
///
/// Implementors provide [`AskClient::request`] for already-trimmed, non-empty
/// questions; the provided `ask` / `debug_ask` methods handle the empty
/// question contract and cancellation.
#[async_trait]
pub trait AskClient: Send + Sync {
    /// Send a non-empty question to the endpoint for `mode`.
    async fn request(&self, mode: AskMode, question: &str) -> Outcome;

    /// Probe the service health endpoint.
    async fn health(&self) -> Result<ServiceHealth, ClientError>;

    /// Ask a question, aborting as soon as `cancel` fires.
    async fn ask(&self, question: &str, cancel: &CancellationToken) -> Result<Outcome, Cancelled> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(Outcome::Failed(Failure::new(
                FailureKind::EmptyQuestion,
                None,
            )));
        }
        run_cancellable(cancel, self.request(AskMode::Answer, question)).await
    }

    /// Retrieval-only ask. An empty question yields an empty debug reply
    /// noted with [`EMPTY_QUESTION_NOTE`] instead of a failure.
    async fn debug_ask(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome, Cancelled> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(Outcome::Answered(Answer {
                note: Some(EMPTY_QUESTION_NOTE.to_string()),
                debug: true,
                ..Answer::default()
            }));
        }
        run_cancellable(cancel, self.request(AskMode::Debug, question)).await
    }
}

async fn run_cancellable<F>(cancel: &CancellationToken, request: F) -> Result<Outcome, Cancelled>
where
    F: std::future::Future<Output = Outcome>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        outcome = request => Ok(outcome),
    }
}

/// reqwest-backed [`AskClient`].
#[derive(Debug, Clone)]
pub struct HttpAskClient {
    http: reqwest::Client,
    base_url: String,
    ask_path: String,
    debug_path: String,
    health_path: String,
}

impl HttpAskClient {
    /// Build a client from the `client` config section.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.normalized_base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;
        info!("http ask client ready (base_url={})", base_url);
        Ok(Self {
            http,
            base_url,
            ask_path: config.ask_path.clone(),
            debug_path: config.debug_path.clone(),
            health_path: config.health_path.clone(),
        })
    }

    /// Build a client for `base_url` with default endpoint paths.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(&ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        })
    }

    /// Normalized service base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AskClient for HttpAskClient {
    async fn request(&self, mode: AskMode, question: &str) -> Outcome {
        let url = match mode {
            AskMode::Answer => self.endpoint(&self.ask_path),
            AskMode::Debug => self.endpoint(&self.debug_path),
        };
        debug!(
            "posting question (url={}, mode={:?}, question_len={})",
            url,
            mode,
            question.len()
        );
        let started = Instant::now();
        let response = match self
            .http
            .post(&url)
            .json(&json!({ "question": question }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("ask request failed (url={}, error={})", url, err);
                return Outcome::Failed(Failure::new(FailureKind::Network, Some(err.to_string())));
            }
        };
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!("reading ask response failed (status={}, error={})", status, err);
                return Outcome::Failed(Failure::new(FailureKind::Network, Some(err.to_string())));
            }
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let outcome = normalize_response(mode, status, &body, elapsed_ms);
        debug!(
            "ask response normalized (status={}, elapsed_ms={}, answered={})",
            status,
            elapsed_ms,
            matches!(outcome, Outcome::Answered(_))
        );
        outcome
    }

    async fn health(&self) -> Result<ServiceHealth, ClientError> {
        let url = self.endpoint(&self.health_path);
        debug!("probing service health (url={})", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response.json::<ServiceHealth>().await?)
    }
}

/// Turn a raw HTTP reply into an [`Outcome`].
///
/// `local_elapsed_ms` is used when the body carries no numeric `elapsed_ms`.
pub fn normalize_response(
    mode: AskMode,
    status: u16,
    body: &str,
    local_elapsed_ms: u64,
) -> Outcome {
    let parsed = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    };

    if !(200..300).contains(&status) {
        let detail = parsed.as_ref().and_then(server_message);
        return Outcome::Failed(Failure::new(FailureKind::HttpError(status), detail));
    }

    let Some(body) = parsed else {
        return Outcome::Failed(Failure::new(
            FailureKind::Malformed,
            Some("response body was not a JSON object".to_string()),
        ));
    };

    let answer = match mode {
        AskMode::Answer => body
            .get("answer")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        AskMode::Debug => String::new(),
    };
    Outcome::Answered(Answer {
        matches: extract_matches(&body),
        answer,
        elapsed_ms: reported_elapsed(&body).unwrap_or(local_elapsed_ms),
        note: body
            .get("note")
            .and_then(Value::as_str)
            .map(str::to_string),
        debug: mode == AskMode::Debug,
    })
}

/// Flatten the first populated result source, preferring `matches` over
/// `context` wrappers.
pub fn extract_matches(body: &Map<String, Value>) -> Vec<MatchRecord> {
    if let Some(Value::Array(entries)) = body.get("matches")
        && !entries.is_empty()
    {
        return entries.iter().filter_map(record_from_value).collect();
    }
    match body.get("context") {
        Some(Value::Array(entries)) => entries.iter().filter_map(unwrap_context).collect(),
        _ => Vec::new(),
    }
}

fn unwrap_context(entry: &Value) -> Option<MatchRecord> {
    let wrapper = entry.as_object()?;
    match wrapper.get("doc") {
        Some(doc) => {
            let mut record = record_from_value(doc)?;
            if record.score.is_none() {
                record.score = wrapper.get("score").and_then(Value::as_f64);
            }
            Some(record)
        }
        None => record_from_value(entry),
    }
}

fn record_from_value(value: &Value) -> Option<MatchRecord> {
    if !value.is_object() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!("skipping unreadable match record (error={})", err);
            None
        }
    }
}

fn reported_elapsed(body: &Map<String, Value>) -> Option<u64> {
    let value = body.get("elapsed_ms")?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| ms.round() as u64)
    })
}

fn server_message(body: &Map<String, Value>) -> Option<String> {
    ["error", "detail"].iter().find_map(|key| match body.get(*key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(Value::Null) | Some(Value::String(_)) | None => None,
        Some(other) => Some(other.to_string()),
    })
}
