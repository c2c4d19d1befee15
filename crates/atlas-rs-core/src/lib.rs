//! Conversation orchestration for the Atlas assistant client.
//!
//! This crate owns the network client, the session state machine, the scroll
//! follow controller, and the input controller (text, slash commands and
//! speech) consumed by the terminal UI.

pub mod client;
pub mod error;
pub mod events;
pub mod input;
pub mod scroll;
pub mod session;
pub mod speech;
mod text;

pub use client::{
    Answer, AskClient, AskMode, EMPTY_QUESTION_NOTE, Failure, FailureKind, HttpAskClient, Outcome,
};
pub use error::{Cancelled, ClientError, InputRejection, SpeechError, SubmitError};
pub use events::{EventBus, SessionEvent, SessionSink};
pub use input::{
    AutoSend, CommandInvocation, InputController, InputOptions, SlashCommand, Submission,
};
pub use scroll::{ScrollAction, ScrollController};
pub use session::{Completion, Session, SessionStore};
pub use speech::{
    ProcessRecognizer, ProcessSpeaker, RecognitionSession, Speaker, SpeechEmitter, SpeechEvent,
    SpeechRecognizer, SpeechUpdate, UnsupportedRecognizer, UnsupportedSpeaker,
    recognizer_from_config, speaker_from_config,
};
