//! Session state machine: message history, the in-flight request, and the
//! focused match.
//!
//! The store has two states. `Idle` accepts [`SessionStore::submit`];
//! `Pending` owns exactly one generation-tagged request whose completion is
//! delivered back through the channel returned by [`SessionStore::new`] and
//! applied with [`SessionStore::resolve`]. Completions from a superseded or
//! cancelled generation are dropped.

use crate::client::{AskClient, AskMode, Failure, FailureKind, Outcome};
use crate::error::{Cancelled, SubmitError};
use crate::events::{SessionEvent, SessionSink};
use crate::text;
use atlas_rs_protocol::{Language, MatchRecord, Message, MessageMeta, Role};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const COMPLETION_BUFFER: usize = 8;

/// Snapshot of the conversation exposed to rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub messages: Vec<Message>,
    pub loading: bool,
    pub selected: Option<MatchRecord>,
    pub language: Language,
}

impl Session {
    fn seeded(language: Language) -> Self {
        Self {
            messages: vec![Message::new(
                Role::Assistant,
                text::greeting(language),
                None,
            )],
            loading: false,
            selected: None,
            language,
        }
    }
}

/// Result of a request, tagged with the generation that started it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub generation: u64,
    pub outcome: Outcome,
}

struct PendingRequest {
    generation: u64,
    mode: AskMode,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PendingRequest {
    fn cancel(self) {
        self.token.cancel();
        self.task.abort();
    }
}

/// Owner of the session and its single in-flight request.
pub struct SessionStore {
    session: Session,
    generation: u64,
    pending: Option<PendingRequest>,
    client: Arc<dyn AskClient>,
    completions: mpsc::Sender<Completion>,
    sink: Option<Arc<dyn SessionSink>>,
}

impl SessionStore {
    /// Create a store seeded with a greeting in `language`, plus the receiver
    /// on which request completions arrive.
    pub fn new(
        client: Arc<dyn AskClient>,
        language: Language,
    ) -> (Self, mpsc::Receiver<Completion>) {
        let (completions, receiver) = mpsc::channel(COMPLETION_BUFFER);
        info!("session store created (language={})", language);
        let store = Self {
            session: Session::seeded(language),
            generation: 0,
            pending: None,
            client,
            completions,
            sink: None,
        };
        (store, receiver)
    }

    /// Attach a sink that observes every transition.
    pub fn with_sink(mut self, sink: Arc<dyn SessionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn messages(&self) -> &[Message] {
        &self.session.messages
    }

    pub fn loading(&self) -> bool {
        self.session.loading
    }

    pub fn selected(&self) -> Option<&MatchRecord> {
        self.session.selected.as_ref()
    }

    pub fn language(&self) -> Language {
        self.session.language
    }

    /// Current generation; completions tagged otherwise are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Submit a question through the answering endpoint.
    ///
    /// Returns the generation of the started request.
    pub fn submit(&mut self, question: &str) -> Result<u64, SubmitError> {
        self.start(question, AskMode::Answer)
    }

    /// Submit a question through the retrieval-only debug endpoint.
    pub fn submit_debug(&mut self, question: &str) -> Result<u64, SubmitError> {
        self.start(question, AskMode::Debug)
    }

    fn start(&mut self, question: &str, mode: AskMode) -> Result<u64, SubmitError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.session.loading {
            debug!("submit rejected while pending (generation={})", self.generation);
            return Err(SubmitError::Busy);
        }
        self.cancel_pending();
        self.generation += 1;
        let generation = self.generation;
        self.append(Message::new(Role::User, question, None));

        let token = CancellationToken::new();
        let task = tokio::spawn(run_request(
            self.client.clone(),
            mode,
            question.to_string(),
            token.clone(),
            generation,
            self.completions.clone(),
        ));
        self.pending = Some(PendingRequest {
            generation,
            mode,
            token,
            task,
        });
        self.set_loading(true);
        info!(
            "question submitted (generation={}, mode={:?}, question_len={})",
            generation,
            mode,
            question.len()
        );
        Ok(generation)
    }

    /// Apply a completion. Returns `false` when it was stale and ignored.
    pub fn resolve(&mut self, completion: Completion) -> bool {
        let mode = match &self.pending {
            Some(pending) if pending.generation == completion.generation => pending.mode,
            _ => {
                debug!(
                    "dropping stale completion (generation={}, current={})",
                    completion.generation, self.generation
                );
                return false;
            }
        };
        self.pending = None;

        let mut outcome = completion.outcome;
        if let Outcome::Answered(answer) = &mut outcome {
            answer.debug |= mode == AskMode::Debug;
        }
        let language = self.session.language;
        let message = reply_message(language, outcome);
        let first_match = message.matches().first().cloned();
        info!(
            "request resolved (generation={}, matches={}, error={})",
            completion.generation,
            message.matches().len(),
            message.is_error()
        );
        self.append(message);
        if let Some(record) = first_match {
            self.select_match(record);
        }
        self.set_loading(false);
        true
    }

    /// Focus a match. Valid in any state.
    pub fn select_match(&mut self, record: MatchRecord) {
        debug!("match selected (id={:?})", record.id);
        let id = record.id.clone();
        self.session.selected = Some(record);
        self.emit(SessionEvent::MatchSelected { id });
    }

    /// Cancel any request and reset to a fresh greeting in `language`, or the
    /// current language when `None`.
    pub fn clear(&mut self, language: Option<Language>) {
        self.cancel_pending();
        self.generation += 1;
        let language = language.unwrap_or(self.session.language);
        info!(
            "session cleared (language={}, generation={})",
            language, self.generation
        );
        self.session = Session::seeded(language);
        self.emit(SessionEvent::Cleared { language });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("cancelling pending request (generation={})", pending.generation);
            pending.cancel();
        }
    }

    fn append(&mut self, message: Message) {
        let event = SessionEvent::MessageAppended {
            id: message.id,
            role: message.role,
        };
        self.session.messages.push(message);
        self.emit(event);
    }

    fn set_loading(&mut self, loading: bool) {
        if self.session.loading != loading {
            self.session.loading = loading;
            self.emit(SessionEvent::LoadingChanged { loading });
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Run one request and deliver its completion.
///
/// The client call runs in its own task so a panicking [`AskClient`] still
/// produces a `Network` failure instead of leaving the store pending.
async fn run_request(
    client: Arc<dyn AskClient>,
    mode: AskMode,
    question: String,
    token: CancellationToken,
    generation: u64,
    completions: mpsc::Sender<Completion>,
) {
    let call = tokio::spawn(async move {
        match mode {
            AskMode::Answer => client.ask(&question, &token).await,
            AskMode::Debug => client.debug_ask(&question, &token).await,
        }
    });
    let outcome = match call.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(Cancelled)) => {
            debug!("request cancelled (generation={})", generation);
            return;
        }
        Err(err) if err.is_cancelled() => {
            debug!("request task cancelled (generation={})", generation);
            return;
        }
        Err(err) => {
            warn!("ask client panicked (generation={}, error={})", generation, err);
            Outcome::Failed(Failure::new(
                FailureKind::Network,
                Some("request task panicked".to_string()),
            ))
        }
    };
    if completions
        .send(Completion {
            generation,
            outcome,
        })
        .await
        .is_err()
    {
        debug!("completion receiver closed (generation={})", generation);
    }
}

/// Build the assistant message rendered for an outcome.
pub fn reply_message(language: Language, outcome: Outcome) -> Message {
    match outcome {
        Outcome::Answered(answer) => {
            let content = if !answer.matches.is_empty() {
                text::found_results(language, answer.matches.len())
            } else if !answer.answer.trim().is_empty() {
                answer.answer
            } else {
                text::no_answer(language).to_string()
            };
            let meta = MessageMeta {
                matches: answer.matches,
                elapsed_ms: Some(answer.elapsed_ms),
                note: answer.note,
                debug: answer.debug,
                error: false,
            };
            Message::new(Role::Assistant, content, Some(meta))
        }
        Outcome::Failed(Failure {
            kind: FailureKind::Malformed,
            detail,
        }) => Message::new(
            Role::Assistant,
            text::no_answer(language),
            Some(MessageMeta {
                note: detail,
                ..MessageMeta::default()
            }),
        ),
        Outcome::Failed(Failure { kind, detail }) => {
            let (content, note) = match kind {
                FailureKind::EmptyQuestion => (text::empty_question(language).to_string(), None),
                FailureKind::HttpError(status) => {
                    let reason = detail.unwrap_or_else(|| format!("HTTP_{status}"));
                    (text::server_error(language, &reason), None)
                }
                FailureKind::Network | FailureKind::Malformed => {
                    (text::network_error(language).to_string(), detail)
                }
            };
            Message::new(
                Role::Assistant,
                content,
                Some(MessageMeta {
                    note,
                    error: true,
                    ..MessageMeta::default()
                }),
            )
        }
    }
}
