//! Input controller speech capture tests.

use atlas_rs_core::{
    InputController, InputOptions, ProcessRecognizer, ProcessSpeaker, Speaker, SpeechEvent,
    SpeechRecognizer, SpeechUpdate, Submission,
};
use atlas_rs_protocol::Language;
use atlas_rs_test_utils::ScriptedRecognizer;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

fn auto_send_options() -> InputOptions {
    InputOptions {
        auto_send: true,
        settle: Duration::from_millis(10),
        ..InputOptions::default()
    }
}

async fn next_update(receiver: &mut UnboundedReceiver<SpeechUpdate>) -> SpeechUpdate {
    timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("update in time")
        .expect("update")
}

/// Final segments are space-joined onto the buffer; interim text is only shown.
#[tokio::test]
async fn final_segments_append_to_buffer() {
    let recognizer = ScriptedRecognizer::new();
    let (mut input, mut updates) = InputController::new(
        Arc::new(recognizer.clone()),
        Language::Secondary,
        InputOptions::default(),
    );
    input.set_buffer("Find");
    assert_eq!(input.toggle_recording(), None);
    assert!(input.recording());

    let session = recognizer.last().expect("session");
    assert_eq!(session.language, Language::Secondary);

    session.emitter.interim("me a");
    let update = next_update(&mut updates).await;
    assert_eq!(input.handle_speech(update), None);
    assert_eq!(input.interim(), Some("me a"));
    assert_eq!(input.buffer(), "Find");

    session.emitter.final_segment("me a cardiologist");
    let update = next_update(&mut updates).await;
    input.handle_speech(update);
    assert_eq!(input.buffer(), "Find me a cardiologist");
    assert_eq!(input.interim(), None);
}

/// Recognition ending with auto-send requests a delayed submission.
#[tokio::test]
async fn recognition_end_triggers_auto_send() {
    let recognizer = ScriptedRecognizer::new();
    let (mut input, mut updates) =
        InputController::new(Arc::new(recognizer.clone()), Language::Primary, auto_send_options());
    input.toggle_recording();
    let session = recognizer.last().expect("session");
    session.emitter.final_segment("hello");
    session.emitter.ended();

    input.handle_speech(next_update(&mut updates).await);
    let auto = input
        .handle_speech(next_update(&mut updates).await)
        .expect("auto send");
    assert_eq!(auto.delay, Duration::from_millis(10));
    assert!(!input.recording());

    assert_eq!(
        input.take_auto_submission(auto.ticket, false),
        Some(Ok(Submission::Text("hello".to_string())))
    );
}

/// Explicit stop ends recognition, stops the backend, and ignores late events.
#[tokio::test]
async fn explicit_stop_ignores_late_events() {
    let recognizer = ScriptedRecognizer::new();
    let (mut input, mut updates) =
        InputController::new(Arc::new(recognizer.clone()), Language::Primary, auto_send_options());
    input.toggle_recording();
    let session = recognizer.last().expect("session");

    let auto = input.toggle_recording().expect("auto send on stop");
    assert!(session.stopped());
    assert!(!input.recording());

    session.emitter.final_segment("too late");
    assert_eq!(input.handle_speech(next_update(&mut updates).await), None);
    assert_eq!(input.buffer(), "");
    // Nothing buffered, so the automatic submission is rejected as empty.
    assert!(matches!(
        input.take_auto_submission(auto.ticket, false),
        Some(Err(_))
    ));
}

/// A restarted recording invalidates an earlier auto-send ticket.
#[tokio::test]
async fn restarted_recording_invalidates_ticket() {
    let recognizer = ScriptedRecognizer::new();
    let (mut input, _updates) =
        InputController::new(Arc::new(recognizer.clone()), Language::Primary, auto_send_options());
    input.toggle_recording();
    let auto = input.toggle_recording().expect("auto");
    input.set_buffer("question");
    input.toggle_recording();
    assert_eq!(input.take_auto_submission(auto.ticket, false), None);
    assert_eq!(input.buffer(), "question");
}

/// Recognizer failures only switch the indicator off.
#[tokio::test]
async fn failures_turn_indicator_off() {
    let recognizer = ScriptedRecognizer::new();
    let (mut input, mut updates) = InputController::new(
        Arc::new(recognizer.clone()),
        Language::Primary,
        InputOptions::default(),
    );
    input.toggle_recording();
    recognizer.last().expect("session").emitter.failed("microphone busy");
    assert_eq!(input.handle_speech(next_update(&mut updates).await), None);
    assert!(!input.recording());

    let unavailable = ScriptedRecognizer::unavailable();
    let (mut input, _updates) =
        InputController::new(Arc::new(unavailable), Language::Primary, InputOptions::default());
    assert_eq!(input.toggle_recording(), None);
    assert!(!input.recording());
}

/// Switching language stops the live session; the next one uses the new locale.
#[tokio::test]
async fn language_change_stops_recognition() {
    let recognizer = ScriptedRecognizer::new();
    let (mut input, _updates) = InputController::new(
        Arc::new(recognizer.clone()),
        Language::Primary,
        InputOptions::default(),
    );
    input.toggle_recording();
    input.set_language(Language::Secondary);
    assert!(recognizer.last().expect("first").stopped());
    assert!(!input.recording());

    input.toggle_recording();
    assert_eq!(recognizer.sessions().len(), 2);
    assert_eq!(recognizer.last().expect("second").language, Language::Secondary);
}

/// Dropping the controller stops its live session.
#[tokio::test]
async fn drop_stops_recognition() {
    let recognizer = ScriptedRecognizer::new();
    let (mut input, _updates) = InputController::new(
        Arc::new(recognizer.clone()),
        Language::Primary,
        InputOptions::default(),
    );
    input.toggle_recording();
    drop(input);
    assert!(recognizer.last().expect("session").stopped());
}

/// The process recognizer streams partial and final lines, then ends.
#[cfg(unix)]
#[tokio::test]
async fn process_recognizer_reads_stdout() {
    let recognizer = ProcessRecognizer::from_command(
        "sh -c 'echo \"[partial] find\"; echo \"find a doctor in {lang}\"'",
    )
    .expect("command");
    let (mut input, mut updates) =
        InputController::new(Arc::new(recognizer), Language::Primary, InputOptions::default());
    input.toggle_recording();
    assert!(input.recording());

    let mut events = Vec::new();
    loop {
        let update = next_update(&mut updates).await;
        events.push(update.event.clone());
        input.handle_speech(update);
        if !input.recording() {
            break;
        }
    }
    assert_eq!(
        events,
        vec![
            SpeechEvent::Interim("find".to_string()),
            SpeechEvent::Final("find a doctor in en-US".to_string()),
            SpeechEvent::Ended,
        ]
    );
    assert_eq!(input.buffer(), "find a doctor in en-US");
}

/// A missing recognizer binary fails to start.
#[tokio::test]
async fn process_recognizer_missing_binary() {
    let recognizer =
        ProcessRecognizer::from_command("atlas-definitely-missing-stt --lang {lang}").expect("cmd");
    let (sender, _receiver) = tokio::sync::mpsc::unbounded_channel();
    let result = recognizer.start(
        Language::Primary,
        atlas_rs_core::SpeechEmitter::new(1, sender),
    );
    assert!(result.is_err());
}

/// The speaker command gets the text on stdin and the locale in its args.
#[cfg(unix)]
#[tokio::test]
async fn process_speaker_pipes_text() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = temp.path().join("spoken.txt");
    let command = format!(
        "sh -c 'printf \"%s|\" \"$0\" > \"$1.tmp\"; cat >> \"$1.tmp\"; mv \"$1.tmp\" \"$1\"' {{lang}} {}",
        out.display()
    );
    let speaker = ProcessSpeaker::from_command(&command).expect("command");
    speaker.speak("Found 2 result(s).", Language::Secondary).expect("speak");

    let spoken = timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(text) = std::fs::read_to_string(&out) {
                return text;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("speaker finished");
    assert_eq!(spoken, "ar-SA|Found 2 result(s).");
}
