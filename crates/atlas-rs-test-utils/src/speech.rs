use atlas_rs_core::{RecognitionSession, Speaker, SpeechEmitter, SpeechError, SpeechRecognizer};
use atlas_rs_protocol::Language;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A session started by [`ScriptedRecognizer`].
#[derive(Debug, Clone)]
pub struct StartedSession {
    pub language: Language,
    pub emitter: SpeechEmitter,
    stopped: Arc<AtomicBool>,
}

impl StartedSession {
    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

struct ScriptedSession {
    stopped: Arc<AtomicBool>,
}

impl RecognitionSession for ScriptedSession {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Recognizer whose sessions are driven by the test through their emitters.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRecognizer {
    sessions: Arc<Mutex<Vec<StartedSession>>>,
    unavailable: bool,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognizer that refuses to start, like an unsupported platform.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn sessions(&self) -> Vec<StartedSession> {
        self.sessions.lock().clone()
    }

    /// Most recently started session.
    pub fn last(&self) -> Option<StartedSession> {
        self.sessions.lock().last().cloned()
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(
        &self,
        language: Language,
        emitter: SpeechEmitter,
    ) -> Result<Box<dyn RecognitionSession>, SpeechError> {
        if self.unavailable {
            return Err(SpeechError::Unsupported);
        }
        let stopped = Arc::new(AtomicBool::new(false));
        self.sessions.lock().push(StartedSession {
            language,
            emitter,
            stopped: stopped.clone(),
        });
        Ok(Box::new(ScriptedSession { stopped }))
    }
}

/// Records every utterance instead of playing it.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<(String, Language)>>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<(String, Language)> {
        self.spoken.lock().clone()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, text: &str, language: Language) -> Result<(), SpeechError> {
        self.spoken.lock().push((text.to_string(), language));
        Ok(())
    }
}
