//! Speech recognition and read-aloud backends.
//!
//! A recognizer starts a [`RecognitionSession`] that reports transcripts
//! through a [`SpeechEmitter`]. Each session is stamped with the number the
//! input controller assigned to it so late events from a stopped session can
//! be recognised and ignored.
//!
//! A [`Speaker`] reads message text aloud; starting a new utterance silences
//! the previous one.

use crate::error::SpeechError;
use atlas_rs_config::InputConfig;
use atlas_rs_protocol::Language;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Prefix marking an interim transcript line from a recognizer process.
pub const PARTIAL_PREFIX: &str = "[partial] ";
/// Placeholder replaced by the speech locale in recognizer commands.
pub const LANGUAGE_PLACEHOLDER: &str = "{lang}";

/// Transcript progress reported by a recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Non-final hypothesis; shown but never committed.
    Interim(String),
    /// Final segment to append to the input buffer.
    Final(String),
    /// Recognition ended normally (silence timeout, process exit, stop).
    Ended,
    /// Recognition ended with an error.
    Failed(String),
}

/// A [`SpeechEvent`] stamped with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechUpdate {
    pub session: u64,
    pub event: SpeechEvent,
}

/// Handle recognizers use to report events for one session.
#[derive(Debug, Clone)]
pub struct SpeechEmitter {
    session: u64,
    sender: mpsc::UnboundedSender<SpeechUpdate>,
}

impl SpeechEmitter {
    pub fn new(session: u64, sender: mpsc::UnboundedSender<SpeechUpdate>) -> Self {
        Self { session, sender }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn emit(&self, event: SpeechEvent) {
        let _ = self.sender.send(SpeechUpdate {
            session: self.session,
            event,
        });
    }

    pub fn interim(&self, text: impl Into<String>) {
        self.emit(SpeechEvent::Interim(text.into()));
    }

    pub fn final_segment(&self, text: impl Into<String>) {
        self.emit(SpeechEvent::Final(text.into()));
    }

    pub fn ended(&self) {
        self.emit(SpeechEvent::Ended);
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.emit(SpeechEvent::Failed(reason.into()));
    }
}

/// A live recognition session.
pub trait RecognitionSession: Send {
    /// Stop listening. Idempotent.
    fn stop(&mut self);
}

/// Source of recognition sessions.
pub trait SpeechRecognizer: Send + Sync {
    /// Start continuous recognition in `language`.
    fn start(
        &self,
        language: Language,
        emitter: SpeechEmitter,
    ) -> Result<Box<dyn RecognitionSession>, SpeechError>;
}

/// Recognizer used when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn start(
        &self,
        _language: Language,
        _emitter: SpeechEmitter,
    ) -> Result<Box<dyn RecognitionSession>, SpeechError> {
        Err(SpeechError::Unsupported)
    }
}

/// Program and arguments of an external speech command.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SpeechCommand {
    program: String,
    args: Vec<String>,
}

impl SpeechCommand {
    fn parse(command: &str) -> Result<Self, SpeechError> {
        let mut argv = shell_words::split(command)
            .map_err(|err| SpeechError::InvalidCommand(err.to_string()))?
            .into_iter();
        let program = argv
            .next()
            .ok_or_else(|| SpeechError::InvalidCommand("empty command".to_string()))?;
        Ok(Self {
            program,
            args: argv.collect(),
        })
    }

    fn expanded_args(&self, language: Language) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(LANGUAGE_PLACEHOLDER, language.speech_locale()))
            .collect()
    }
}

/// Recognizer that runs an external speech-to-text command.
///
/// The command writes one transcript per stdout line. Lines starting with
/// [`PARTIAL_PREFIX`] are interim hypotheses; other non-empty lines are final
/// segments. Recognition ends when the process exits.
#[derive(Debug, Clone)]
pub struct ProcessRecognizer {
    command: SpeechCommand,
}

impl ProcessRecognizer {
    /// Parse a shell-style command line. `{lang}` in any argument expands to
    /// the speech locale when a session starts.
    pub fn from_command(command: &str) -> Result<Self, SpeechError> {
        Ok(Self {
            command: SpeechCommand::parse(command)?,
        })
    }
}

impl SpeechRecognizer for ProcessRecognizer {
    fn start(
        &self,
        language: Language,
        emitter: SpeechEmitter,
    ) -> Result<Box<dyn RecognitionSession>, SpeechError> {
        let args = self.command.expanded_args(language);
        let mut child = Command::new(&self.command.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SpeechError::Spawn(std::io::Error::other("stdout not captured")))?;
        info!(
            "speech recognizer started (program={}, session={}, locale={})",
            self.command.program,
            emitter.session(),
            language.speech_locale()
        );

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("stopping speech recognizer (session={})", emitter.session());
                        let _ = child.kill().await;
                        emitter.ended();
                        return;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => forward_line(&emitter, &line),
                        Ok(None) => break,
                        Err(err) => {
                            warn!("speech recognizer read failed (error={})", err);
                            let _ = child.kill().await;
                            emitter.failed(err.to_string());
                            return;
                        }
                    }
                }
            }
            match child.wait().await {
                Ok(status) if status.success() => emitter.ended(),
                Ok(status) => emitter.failed(format!("recognizer exited with {status}")),
                Err(err) => emitter.failed(err.to_string()),
            }
        });
        Ok(Box::new(ProcessSession { cancel }))
    }
}

fn forward_line(emitter: &SpeechEmitter, line: &str) {
    if let Some(partial) = line.strip_prefix(PARTIAL_PREFIX) {
        emitter.interim(partial.trim());
        return;
    }
    let line = line.trim();
    if !line.is_empty() {
        emitter.final_segment(line);
    }
}

struct ProcessSession {
    cancel: CancellationToken,
}

impl RecognitionSession for ProcessSession {
    fn stop(&mut self) {
        self.cancel.cancel();
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Pick the recognizer described by the input config.
pub fn recognizer_from_config(config: &InputConfig) -> Arc<dyn SpeechRecognizer> {
    match config.speech_command.as_deref() {
        Some(command) => match ProcessRecognizer::from_command(command) {
            Ok(recognizer) => Arc::new(recognizer),
            Err(err) => {
                warn!("speech command rejected, recording disabled (error={})", err);
                Arc::new(UnsupportedRecognizer)
            }
        },
        None => Arc::new(UnsupportedRecognizer),
    }
}

/// Reads text aloud.
pub trait Speaker: Send + Sync {
    /// Start reading `text` in `language`, silencing any earlier utterance.
    fn speak(&self, text: &str, language: Language) -> Result<(), SpeechError>;
}

/// Speaker used when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSpeaker;

impl Speaker for UnsupportedSpeaker {
    fn speak(&self, _text: &str, _language: Language) -> Result<(), SpeechError> {
        Err(SpeechError::SynthesisUnsupported)
    }
}

/// Speaker that pipes text into an external text-to-speech command.
///
/// The command receives the text on stdin; `{lang}` in its arguments expands
/// to the speech locale.
#[derive(Debug)]
pub struct ProcessSpeaker {
    command: SpeechCommand,
    current: Mutex<Option<CancellationToken>>,
}

impl ProcessSpeaker {
    pub fn from_command(command: &str) -> Result<Self, SpeechError> {
        Ok(Self {
            command: SpeechCommand::parse(command)?,
            current: Mutex::new(None),
        })
    }

    /// Silence the utterance in progress, if any.
    pub fn stop(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
    }
}

impl Speaker for ProcessSpeaker {
    fn speak(&self, text: &str, language: Language) -> Result<(), SpeechError> {
        self.stop();
        let mut child = Command::new(&self.command.program)
            .args(self.command.expanded_args(language))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpeechError::Spawn(std::io::Error::other("stdin not captured")))?;
        info!(
            "reading aloud (program={}, locale={}, chars={})",
            self.command.program,
            language.speech_locale(),
            text.chars().count()
        );

        let token = CancellationToken::new();
        *self.current.lock() = Some(token.clone());
        let text = text.to_string();
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(text.as_bytes()).await {
                warn!("speaker stdin write failed (error={})", err);
            }
            drop(stdin);
            tokio::select! {
                // Dropping the child kills it.
                _ = token.cancelled() => debug!("speaker interrupted"),
                status = child.wait() => match status {
                    Ok(status) if status.success() => debug!("speaker finished"),
                    Ok(status) => warn!("speaker exited with {}", status),
                    Err(err) => warn!("speaker wait failed (error={})", err),
                },
            }
        });
        Ok(())
    }
}

impl Drop for ProcessSpeaker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pick the speaker described by the input config.
pub fn speaker_from_config(config: &InputConfig) -> Arc<dyn Speaker> {
    match config.speak_command.as_deref() {
        Some(command) => match ProcessSpeaker::from_command(command) {
            Ok(speaker) => Arc::new(speaker),
            Err(err) => {
                warn!("speak command rejected, reading aloud disabled (error={})", err);
                Arc::new(UnsupportedSpeaker)
            }
        },
        None => Arc::new(UnsupportedSpeaker),
    }
}
