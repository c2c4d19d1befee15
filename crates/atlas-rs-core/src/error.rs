//! Error types for the core crate.

use crate::input::SlashCommand;
use thiserror::Error;

/// Errors returned by network operations that are not part of the ask
/// contract (client construction and health probes).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL cannot be used.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// Transport or decoding failure reported by the HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(u16),
}

/// Marker returned when a request was cancelled before it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request cancelled")]
pub struct Cancelled;

/// Reasons a session submission was rejected. Rejections never mutate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// A request is already in flight.
    #[error("a request is already in flight")]
    Busy,
    /// The question was empty after trimming.
    #[error("question is empty")]
    Empty,
}

/// Reasons the input controller refused to produce a submission. The buffer is
/// left untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputRejection {
    /// Buffer is empty after trimming.
    #[error("nothing to send")]
    Empty,
    /// A request is pending.
    #[error("waiting for the previous answer")]
    Busy,
    /// Debug submissions are not enabled.
    #[error("debug tools are disabled")]
    DebugDisabled,
    /// No registered command starts with the typed prefix.
    #[error("unknown command: /{0}")]
    UnknownCommand(String),
    /// More than one command starts with the typed prefix.
    #[error("ambiguous command /{input}: {}", describe(candidates))]
    AmbiguousCommand {
        input: String,
        candidates: Vec<SlashCommand>,
    },
}

fn describe(candidates: &[SlashCommand]) -> String {
    candidates
        .iter()
        .map(|command| format!("/{}", command.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by speech recognition backends. The input controller
/// swallows these and only turns the recording indicator off.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// No recognition backend is available on this platform.
    #[error("speech recognition is not supported")]
    Unsupported,
    /// No text-to-speech backend is configured.
    #[error("reading aloud is not supported")]
    SynthesisUnsupported,
    /// The configured recognizer command could not be parsed.
    #[error("invalid speech command: {0}")]
    InvalidCommand(String),
    /// The recognizer process could not be started.
    #[error("failed to start recognizer: {0}")]
    Spawn(#[from] std::io::Error),
}
