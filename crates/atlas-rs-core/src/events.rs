//! Session change notifications for rendering collaborators.

use atlas_rs_protocol::{Language, MessageId, RecordId, Role};
use log::debug;
use tokio::sync::broadcast;

/// A state change emitted by [`crate::SessionStore`] after each transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message was appended to the transcript.
    MessageAppended { id: MessageId, role: Role },
    /// The loading flag flipped.
    LoadingChanged { loading: bool },
    /// The focused match changed.
    MatchSelected { id: Option<RecordId> },
    /// The session was reset with a fresh greeting.
    Cleared { language: Language },
}

/// Receiver of session events.
pub trait SessionSink: Send + Sync {
    /// Deliver an event. Must not block.
    fn emit(&self, event: SessionEvent);
}

/// Broadcast-backed session event bus.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel buffer size.
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        debug!("session event bus initialized (buffer={})", buffer);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl SessionSink for EventBus {
    fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}
