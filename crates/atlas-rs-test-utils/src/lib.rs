//! Test helpers shared across Atlas crates.

pub mod ask;
pub mod events;
pub mod speech;

pub use ask::{
    GatedAskClient, PanickingAskClient, ScriptedAskClient, StallingAskClient, answer_with_matches,
};
pub use events::RecordingSink;
pub use speech::{RecordingSpeaker, ScriptedRecognizer, StartedSession};
