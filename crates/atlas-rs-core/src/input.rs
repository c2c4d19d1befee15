//! Text entry, slash commands, and speech capture unified into submissions.

use crate::error::InputRejection;
use crate::speech::{RecognitionSession, SpeechEmitter, SpeechEvent, SpeechRecognizer, SpeechUpdate};
use atlas_rs_protocol::Language;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Marker that starts a slash command.
pub const COMMAND_MARKER: char = '/';

/// Registered slash commands, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlashCommand {
    Clear,
    Help,
    LangPrimary,
    LangSecondary,
    FindDoctor,
    Summarize,
}

impl SlashCommand {
    pub const ALL: [SlashCommand; 6] = [
        SlashCommand::Clear,
        SlashCommand::Help,
        SlashCommand::LangPrimary,
        SlashCommand::LangSecondary,
        SlashCommand::FindDoctor,
        SlashCommand::Summarize,
    ];

    /// Name typed after the marker.
    pub fn name(self) -> &'static str {
        match self {
            SlashCommand::Clear => "clear",
            SlashCommand::Help => "help",
            SlashCommand::LangPrimary => "lang-en",
            SlashCommand::LangSecondary => "lang-ar",
            SlashCommand::FindDoctor => "find-doctor",
            SlashCommand::Summarize => "summarize",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Clear => "Clear the conversation",
            SlashCommand::Help => "Show keys and commands",
            SlashCommand::LangPrimary => "Switch to English",
            SlashCommand::LangSecondary => "Switch to Arabic",
            SlashCommand::FindDoctor => "Search for a doctor by specialty or name",
            SlashCommand::Summarize => "Summarize the conversation so far",
        }
    }

    /// `/clear` is executed by the controller's owner directly against the
    /// session; the rest are interpreted by the rendering collaborator.
    pub fn is_local(self) -> bool {
        matches!(self, SlashCommand::Clear)
    }
}

/// Commands whose names start with `prefix`, in registry order.
pub fn commands_matching(prefix: &str) -> Vec<SlashCommand> {
    SlashCommand::ALL
        .into_iter()
        .filter(|command| command.name().starts_with(prefix))
        .collect()
}

/// Resolve a typed command name: an exact name wins, otherwise a prefix must
/// match exactly one command.
pub fn resolve_command(typed: &str) -> Result<SlashCommand, InputRejection> {
    if let Some(command) = SlashCommand::ALL
        .into_iter()
        .find(|command| command.name() == typed)
    {
        return Ok(command);
    }
    let candidates = commands_matching(typed);
    match candidates.as_slice() {
        [command] => Ok(*command),
        [] => Err(InputRejection::UnknownCommand(typed.to_string())),
        _ => Err(InputRejection::AmbiguousCommand {
            input: typed.to_string(),
            candidates,
        }),
    }
}

/// A parsed slash command with the text that followed its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: SlashCommand,
    pub args: String,
}

/// A discrete submission produced from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Plain question, submitted verbatim.
    Text(String),
    /// Slash command.
    Command(CommandInvocation),
    /// Question routed through the debug endpoint.
    Debug(String),
}

/// Request to submit the buffer after recognition ended.
///
/// Redeem it with [`InputController::take_auto_submission`] once `delay` has
/// passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSend {
    pub delay: Duration,
    pub ticket: u64,
}

/// Behavior switches for an [`InputController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputOptions {
    /// Allows [`InputController::submit_debug`].
    pub debug_enabled: bool,
    /// Submit automatically when recognition ends.
    pub auto_send: bool,
    /// Delay before an automatic submission.
    pub settle: Duration,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            debug_enabled: false,
            auto_send: false,
            settle: Duration::from_millis(400),
        }
    }
}

/// Owns the text buffer and the one live recognition session.
pub struct InputController {
    buffer: String,
    interim: Option<String>,
    recording: bool,
    language: Language,
    options: InputOptions,
    recognizer: Arc<dyn SpeechRecognizer>,
    live: Option<Box<dyn RecognitionSession>>,
    speech_session: u64,
    speech_sender: mpsc::UnboundedSender<SpeechUpdate>,
}

impl InputController {
    /// Create a controller plus the receiver speech updates arrive on; feed
    /// them back through [`InputController::handle_speech`].
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        language: Language,
        options: InputOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SpeechUpdate>) {
        let (speech_sender, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            buffer: String::new(),
            interim: None,
            recording: false,
            language,
            options,
            recognizer,
            live: None,
            speech_session: 0,
            speech_sender,
        };
        (controller, receiver)
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn set_buffer(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    pub fn insert_char(&mut self, ch: char) {
        self.buffer.push(ch);
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Interim transcript being displayed, if any.
    pub fn interim(&self) -> Option<&str> {
        self.interim.as_deref()
    }

    pub fn recording(&self) -> bool {
        self.recording
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn debug_enabled(&self) -> bool {
        self.options.debug_enabled
    }

    /// Whether the buffer currently starts a slash command.
    pub fn is_command(&self) -> bool {
        self.buffer.trim_start().starts_with(COMMAND_MARKER)
    }

    /// Commands matching the partially typed command name, for a palette.
    pub fn command_candidates(&self) -> Vec<SlashCommand> {
        match self.typed_command() {
            Some((name, _)) => commands_matching(name),
            None => Vec::new(),
        }
    }

    fn typed_command(&self) -> Option<(&str, &str)> {
        let rest = self.buffer.trim().strip_prefix(COMMAND_MARKER)?;
        Some(match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        })
    }

    /// Turn the buffer into a submission. The buffer is cleared only on
    /// success.
    pub fn submit(&mut self, loading: bool) -> Result<Submission, InputRejection> {
        let text = self.buffer.trim();
        if text.is_empty() {
            return Err(InputRejection::Empty);
        }
        if loading {
            return Err(InputRejection::Busy);
        }
        let submission = match self.typed_command() {
            Some((name, args)) => Submission::Command(CommandInvocation {
                command: resolve_command(name)?,
                args: args.to_string(),
            }),
            None => Submission::Text(text.to_string()),
        };
        debug!("input submitted (kind={})", submission_kind(&submission));
        self.buffer.clear();
        Ok(submission)
    }

    /// Send the buffer through the debug path.
    pub fn submit_debug(&mut self, loading: bool) -> Result<Submission, InputRejection> {
        if !self.options.debug_enabled {
            return Err(InputRejection::DebugDisabled);
        }
        let text = self.buffer.trim();
        if text.is_empty() {
            return Err(InputRejection::Empty);
        }
        if loading {
            return Err(InputRejection::Busy);
        }
        let submission = Submission::Debug(text.to_string());
        self.buffer.clear();
        Ok(submission)
    }

    /// Start or stop recording. Stopping ends recognition immediately and may
    /// request an automatic submission.
    pub fn toggle_recording(&mut self) -> Option<AutoSend> {
        if self.recording {
            self.stop_live();
            return self.recognition_ended();
        }
        self.speech_session += 1;
        let emitter = SpeechEmitter::new(self.speech_session, self.speech_sender.clone());
        match self.recognizer.start(self.language, emitter) {
            Ok(session) => {
                info!(
                    "recording started (session={}, language={})",
                    self.speech_session, self.language
                );
                self.live = Some(session);
                self.recording = true;
            }
            Err(err) => {
                warn!("speech recognition unavailable (error={})", err);
                self.recording = false;
            }
        }
        None
    }

    /// Apply a recognizer update. Updates from stopped sessions are ignored.
    pub fn handle_speech(&mut self, update: SpeechUpdate) -> Option<AutoSend> {
        if update.session != self.speech_session || !self.recording {
            debug!(
                "ignoring stale speech update (session={}, current={})",
                update.session, self.speech_session
            );
            return None;
        }
        match update.event {
            SpeechEvent::Interim(text) => {
                self.interim = Some(text).filter(|text| !text.trim().is_empty());
                None
            }
            SpeechEvent::Final(segment) => {
                self.append_segment(&segment);
                self.interim = None;
                None
            }
            SpeechEvent::Ended => {
                self.live = None;
                self.recognition_ended()
            }
            SpeechEvent::Failed(reason) => {
                warn!("speech recognition failed (reason={})", reason);
                self.live = None;
                self.recognition_ended()
            }
        }
    }

    /// Redeem an [`AutoSend`]; ignored if recording restarted since.
    pub fn take_auto_submission(
        &mut self,
        ticket: u64,
        loading: bool,
    ) -> Option<Result<Submission, InputRejection>> {
        if ticket != self.speech_session || self.recording {
            return None;
        }
        Some(self.submit(loading))
    }

    /// Switch the recognition language, ending any live session.
    pub fn set_language(&mut self, language: Language) {
        if self.recording {
            self.stop_live();
            self.recording = false;
            self.interim = None;
        }
        self.language = language;
    }

    fn append_segment(&mut self, segment: &str) {
        let segment = segment.trim();
        if segment.is_empty() {
            return;
        }
        if !self.buffer.trim().is_empty() && !self.buffer.ends_with(' ') {
            self.buffer.push(' ');
        }
        self.buffer.push_str(segment);
    }

    fn recognition_ended(&mut self) -> Option<AutoSend> {
        info!("recording ended (session={})", self.speech_session);
        self.recording = false;
        self.interim = None;
        // Stopped sessions must not deliver anything further.
        self.speech_session += 1;
        self.options.auto_send.then_some(AutoSend {
            delay: self.options.settle,
            ticket: self.speech_session,
        })
    }

    fn stop_live(&mut self) {
        if let Some(mut session) = self.live.take() {
            session.stop();
        }
    }
}

impl Drop for InputController {
    fn drop(&mut self) {
        self.stop_live();
    }
}

fn submission_kind(submission: &Submission) -> &'static str {
    match submission {
        Submission::Text(_) => "text",
        Submission::Command(_) => "command",
        Submission::Debug(_) => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::UnsupportedRecognizer;
    use pretty_assertions::assert_eq;

    fn controller(options: InputOptions) -> InputController {
        InputController::new(Arc::new(UnsupportedRecognizer), Language::Primary, options).0
    }

    /// Verify that plain text is submitted verbatim and clears the buffer.
    #[test]
    fn plain_text_submission() {
        let mut input = controller(InputOptions::default());
        input.set_buffer("hello");
        assert_eq!(input.submit(false), Ok(Submission::Text("hello".to_string())));
        assert_eq!(input.buffer(), "");
    }

    /// Verify that an unambiguous prefix resolves to its command.
    #[test]
    fn unambiguous_prefix_resolves() {
        let mut input = controller(InputOptions::default());
        input.set_buffer("/cle");
        assert_eq!(
            input.submit(false),
            Ok(Submission::Command(CommandInvocation {
                command: SlashCommand::Clear,
                args: String::new(),
            }))
        );
        assert_eq!(input.buffer(), "");
    }

    /// Verify that arguments after the command name are preserved.
    #[test]
    fn command_arguments_are_kept() {
        let mut input = controller(InputOptions::default());
        input.set_buffer("/find cardiology  ");
        assert_eq!(
            input.submit(false),
            Ok(Submission::Command(CommandInvocation {
                command: SlashCommand::FindDoctor,
                args: "cardiology".to_string(),
            }))
        );
    }

    /// Verify that ambiguous and unknown commands keep the buffer.
    #[test]
    fn ambiguous_and_unknown_commands_are_rejected() {
        let mut input = controller(InputOptions::default());
        input.set_buffer("/lang");
        assert_eq!(
            input.submit(false),
            Err(InputRejection::AmbiguousCommand {
                input: "lang".to_string(),
                candidates: vec![SlashCommand::LangPrimary, SlashCommand::LangSecondary],
            })
        );
        assert_eq!(input.buffer(), "/lang");

        input.set_buffer("/weather");
        assert_eq!(
            input.submit(false),
            Err(InputRejection::UnknownCommand("weather".to_string()))
        );
        assert_eq!(input.buffer(), "/weather");
    }

    /// Verify that submission is blocked while loading or when empty.
    #[test]
    fn submission_guards() {
        let mut input = controller(InputOptions::default());
        input.set_buffer("   ");
        assert_eq!(input.submit(false), Err(InputRejection::Empty));
        input.set_buffer("question");
        assert_eq!(input.submit(true), Err(InputRejection::Busy));
        assert_eq!(input.buffer(), "question");
    }

    /// Verify that the debug path requires the capability flag.
    #[test]
    fn debug_submission_requires_flag() {
        let mut input = controller(InputOptions::default());
        input.set_buffer("cardio");
        assert_eq!(input.submit_debug(false), Err(InputRejection::DebugDisabled));

        let mut input = controller(InputOptions {
            debug_enabled: true,
            ..InputOptions::default()
        });
        input.set_buffer(" cardio ");
        assert_eq!(
            input.submit_debug(false),
            Ok(Submission::Debug("cardio".to_string()))
        );
    }

    /// Verify that an unsupported recognizer leaves the indicator off.
    #[test]
    fn unsupported_recording_stays_off() {
        let mut input = controller(InputOptions::default());
        assert_eq!(input.toggle_recording(), None);
        assert!(!input.recording());
    }

    /// Verify palette candidates for a partial command.
    #[test]
    fn command_candidates_follow_prefix() {
        let mut input = controller(InputOptions::default());
        input.set_buffer("/s");
        assert_eq!(input.command_candidates(), vec![SlashCommand::Summarize]);
        input.set_buffer("/");
        assert_eq!(input.command_candidates().len(), SlashCommand::ALL.len());
        input.set_buffer("plain");
        assert!(input.command_candidates().is_empty());
    }
}
