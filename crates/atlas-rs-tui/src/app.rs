//! Application state for the Atlas TUI.

use crate::clipboard::{Clipboard, SystemClipboard};
use atlas_rs_core::{
    AutoSend, CommandInvocation, Completion, InputController, InputRejection, ScrollController,
    SessionEvent, SessionStore, SlashCommand, Speaker, SpeechUpdate, Submission, SubmitError,
    UnsupportedSpeaker,
};
use atlas_rs_protocol::{Language, MatchRecord, Message, MessageId, Role, ServiceHealth};
use chrono::Local;
use log::{debug, info, warn};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::sync::Arc;

const NOT_SPECIFIED: &str = "Not specified";
const NO_BIO: &str = "No bio available.";
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
/// Ticks the "copied" marker stays on a message.
const COPIED_TICKS: usize = 8;

/// Result of the startup health probe.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthState {
    /// Probe still running.
    Checking,
    /// Service answered the probe.
    Reported(ServiceHealth),
    /// Probe failed.
    Unreachable(String),
}

/// Top-level application state for the TUI.
pub struct App {
    /// Conversation state machine.
    pub store: SessionStore,
    /// Text buffer and speech capture.
    pub input: InputController,
    /// Chat viewport follow state.
    pub scroll: ScrollController,
    /// Service health shown in the header.
    pub health: HealthState,
    /// Remote service base URL shown in the header.
    pub base_url: String,
    /// Suggested questions bound to Alt+1.. .
    pub suggestions: Vec<String>,
    /// Status line text.
    pub status: String,
    /// Whether the help overlay is open.
    pub show_help: bool,
    /// Index of the focused match across the whole transcript.
    pub match_cursor: Option<usize>,
    clipboard: Box<dyn Clipboard>,
    speaker: Arc<dyn Speaker>,
    copied: Option<(MessageId, usize)>,
    ticks: usize,
}

impl App {
    pub fn new(
        store: SessionStore,
        input: InputController,
        scroll: ScrollController,
        base_url: String,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            store,
            input,
            scroll,
            health: HealthState::Checking,
            base_url,
            suggestions,
            status: "idle".to_string(),
            show_help: false,
            match_cursor: None,
            clipboard: Box::new(SystemClipboard::default()),
            speaker: Arc::new(UnsupportedSpeaker),
            copied: None,
            ticks: 0,
        }
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_speaker(mut self, speaker: Arc<dyn Speaker>) -> Self {
        self.speaker = speaker;
        self
    }

    pub fn language(&self) -> Language {
        self.store.language()
    }

    /// Update the status line text.
    pub fn push_status(&mut self, status: impl Into<String>) {
        let status = status.into();
        debug!("status updated (status={})", status);
        self.status = status;
    }

    pub fn set_health(&mut self, result: Result<ServiceHealth, String>) {
        self.health = match result {
            Ok(health) => {
                info!(
                    "service health (ok={}, index_built={}, docs={})",
                    health.ok, health.index_built, health.docs_count
                );
                HealthState::Reported(health)
            }
            Err(err) => {
                self.push_status(format!("health check failed: {err}"));
                HealthState::Unreachable(err)
            }
        };
    }

    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if self
            .copied
            .is_some_and(|(_, at)| self.ticks.wrapping_sub(at) >= COPIED_TICKS)
        {
            self.copied = None;
        }
    }

    /// React to a session transition.
    pub fn apply_session_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::MessageAppended { .. } => {
                self.scroll.note_append();
            }
            SessionEvent::LoadingChanged { loading } => {
                self.push_status(if *loading { "waiting" } else { "idle" });
            }
            SessionEvent::Cleared { language } => {
                self.scroll.reset();
                self.match_cursor = None;
                self.push_status(format!("cleared ({language})"));
            }
            SessionEvent::MatchSelected { .. } => {}
        }
    }

    /// Apply a request completion and focus the first new match.
    pub fn resolve(&mut self, completion: Completion) {
        if !self.store.resolve(completion) {
            return;
        }
        let fresh = self
            .store
            .messages()
            .last()
            .map_or(0, |message| message.matches().len());
        if fresh > 0 {
            self.match_cursor = Some(self.match_count() - fresh);
        }
    }

    /// Submit a question to the answering endpoint.
    pub fn ask(&mut self, question: &str) {
        let result = self.store.submit(question);
        self.after_submit(result);
    }

    fn ask_debug(&mut self, question: &str) {
        let result = self.store.submit_debug(question);
        self.after_submit(result);
    }

    /// Follow the conversation only when a request actually started.
    fn after_submit(&mut self, result: Result<u64, SubmitError>) {
        match result {
            Ok(_) => self.scroll.jump_to_latest(),
            Err(SubmitError::Empty) => {}
            Err(err) => self.push_status(err.to_string()),
        }
    }

    /// Message the copy and read-aloud actions apply to: the one holding the
    /// focused match, else the latest assistant reply.
    pub fn action_target(&self) -> Option<&Message> {
        let messages = self.store.messages();
        if let Some(cursor) = self.match_cursor {
            let mut seen = 0;
            for message in messages {
                seen += message.matches().len();
                if cursor < seen {
                    return Some(message);
                }
            }
        }
        messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
    }

    /// Copy the target message to the clipboard (Ctrl+Y).
    pub fn copy_message(&mut self) {
        let Some((id, content)) = self
            .action_target()
            .map(|message| (message.id, message.content.clone()))
        else {
            return;
        };
        match self.clipboard.set_text(&content) {
            Ok(()) => {
                self.copied = Some((id, self.ticks));
                self.push_status("copied");
            }
            Err(err) => {
                warn!("copy failed (error={:#})", err);
                self.push_status(format!("copy failed: {err}"));
            }
        }
    }

    /// Read the target message aloud in the session language (Ctrl+S).
    pub fn speak_message(&mut self) {
        let Some(content) = self
            .action_target()
            .map(|message| message.content.clone())
        else {
            return;
        };
        match self.speaker.speak(&content, self.language()) {
            Ok(()) => self.push_status("reading aloud"),
            Err(err) => self.push_status(err.to_string()),
        }
    }

    /// Submit the input buffer (Enter).
    pub fn submit_buffer(&mut self) {
        let result = self.input.submit(self.store.loading());
        self.apply_submission(result);
    }

    /// Submit the input buffer through the debug endpoint.
    pub fn submit_debug_buffer(&mut self) {
        let result = self.input.submit_debug(self.store.loading());
        self.apply_submission(result);
    }

    /// Submit the suggestion at `index`, if configured.
    pub fn submit_suggestion(&mut self, index: usize) {
        if let Some(question) = self.suggestions.get(index).cloned() {
            debug!("suggestion submitted (index={})", index);
            self.ask(&question);
        }
    }

    /// Reset the conversation in the current language.
    pub fn clear(&mut self) {
        self.store.clear(None);
        self.input.clear_buffer();
    }

    pub fn toggle_recording(&mut self) -> Option<AutoSend> {
        let was_recording = self.input.recording();
        let auto_send = self.input.toggle_recording();
        if !was_recording && !self.input.recording() {
            self.push_status("speech recognition unavailable");
        } else if self.input.recording() {
            self.push_status("recording");
        } else {
            self.push_status("recording stopped");
        }
        auto_send
    }

    pub fn handle_speech(&mut self, update: SpeechUpdate) -> Option<AutoSend> {
        let was_recording = self.input.recording();
        let auto_send = self.input.handle_speech(update);
        if was_recording && !self.input.recording() {
            self.push_status("recording stopped");
        }
        auto_send
    }

    /// Redeem an automatic submission once its settling delay passed.
    pub fn redeem_auto_send(&mut self, ticket: u64) {
        if let Some(result) = self.input.take_auto_submission(ticket, self.store.loading()) {
            self.apply_submission(result);
        }
    }

    fn apply_submission(&mut self, result: Result<Submission, InputRejection>) {
        match result {
            Ok(Submission::Text(question)) => self.ask(&question),
            Ok(Submission::Debug(question)) => self.ask_debug(&question),
            Ok(Submission::Command(invocation)) => self.run_command(invocation),
            Err(InputRejection::Empty) => {}
            Err(rejection) => self.push_status(rejection.to_string()),
        }
    }

    fn run_command(&mut self, invocation: CommandInvocation) {
        info!("running command (name={})", invocation.command.name());
        match invocation.command {
            SlashCommand::Clear => self.clear(),
            SlashCommand::Help => self.show_help = true,
            SlashCommand::LangPrimary => self.switch_language(Language::Primary),
            SlashCommand::LangSecondary => self.switch_language(Language::Secondary),
            SlashCommand::FindDoctor | SlashCommand::Summarize => {
                if let Some(question) = forwarded_question(&invocation) {
                    self.ask(&question);
                }
            }
        }
    }

    fn switch_language(&mut self, language: Language) {
        self.store.clear(Some(language));
        self.input.set_language(language);
    }

    /// Total number of matches across the transcript.
    pub fn match_count(&self) -> usize {
        self.store
            .messages()
            .iter()
            .map(|message| message.matches().len())
            .sum()
    }

    fn match_at(&self, index: usize) -> Option<&MatchRecord> {
        self.store
            .messages()
            .iter()
            .flat_map(|message| message.matches())
            .nth(index)
    }

    /// Focus the next match (Tab), wrapping around.
    pub fn select_next_match(&mut self) {
        let count = self.match_count();
        if count == 0 {
            return;
        }
        let next = self.match_cursor.map_or(0, |cursor| (cursor + 1) % count);
        self.focus_match(next);
    }

    /// Focus the previous match (Shift+Tab), wrapping around.
    pub fn select_prev_match(&mut self) {
        let count = self.match_count();
        if count == 0 {
            return;
        }
        let prev = self
            .match_cursor
            .map_or(count - 1, |cursor| (cursor + count - 1) % count);
        self.focus_match(prev);
    }

    fn focus_match(&mut self, index: usize) {
        if let Some(record) = self.match_at(index).cloned() {
            self.match_cursor = Some(index);
            self.store.select_match(record);
        }
    }

    /// Render chat messages into styled lines for the UI.
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let language = self.language();
        let messages = self.store.messages();
        let mut lines = Vec::new();
        let mut match_index = 0;

        for (idx, message) in messages.iter().enumerate() {
            let starts_group = idx == 0 || messages[idx - 1].role != message.role;
            if starts_group {
                if idx > 0 {
                    lines.push(Line::from(Span::raw("")));
                }
                lines.push(Line::from(role_badge(message.role)));
            }

            let content_style = if message.is_error() {
                Style::default().fg(error_color())
            } else {
                Style::default().fg(text_color())
            };
            for line in message.content.lines() {
                lines.push(Line::from(Span::styled(format!(" {line}"), content_style)));
            }

            for (position, record) in message.matches().iter().enumerate() {
                let focused = self.match_cursor == Some(match_index);
                lines.push(match_line(record, position + 1, focused, language));
                match_index += 1;
            }

            if let Some(note) = message.meta.as_ref().and_then(|meta| meta.note.as_deref()) {
                lines.push(Line::from(Span::styled(
                    format!(" note: {note}"),
                    Style::default()
                        .fg(muted_color())
                        .add_modifier(Modifier::ITALIC),
                )));
            }
            let copied = self.copied.is_some_and(|(id, _)| id == message.id);
            lines.push(meta_line(message, copied));
        }

        if self.store.loading() {
            if messages.last().is_some_and(|last| last.role != Role::Assistant) {
                lines.push(Line::from(Span::raw("")));
                lines.push(Line::from(role_badge(Role::Assistant)));
            }
            let frame = SPINNER[self.ticks % SPINNER.len()];
            lines.push(Line::from(Span::styled(
                format!(" {frame} thinking..."),
                Style::default().fg(muted_color()),
            )));
        }

        // Trailing padding so the last message always scrolls fully into view.
        lines.push(Line::from(Span::raw("")));
        lines
    }

    /// Lines describing the focused match, when there is one.
    pub fn detail_lines(&self) -> Option<Vec<Line<'static>>> {
        let record = self.store.selected()?;
        let language = self.language();
        let label = Style::default().fg(muted_color());
        let value = Style::default().fg(text_color());
        let field = |name: &str, text: Option<&str>| {
            Line::from(vec![
                Span::styled(format!(" {name} "), label),
                Span::styled(text.unwrap_or(NOT_SPECIFIED).to_string(), value),
            ])
        };

        let mut lines = vec![
            Line::from(Span::styled(
                format!(" {}", record.display_name(language)),
                Style::default()
                    .fg(accent_color())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::raw("")),
            field("Specialty", record.specialty.as_deref()),
            field("Availability", record.availability.as_deref()),
        ];
        if let Some(score) = record.score_fraction() {
            lines.push(field("Score", Some(&format_score(score))));
        }
        if let Some(contact) = record.contact() {
            lines.push(field("Phone", Some(contact)));
        }
        lines.push(Line::from(Span::raw("")));
        lines.push(Line::from(Span::styled(
            format!(" {}", record.bio().unwrap_or(NO_BIO)),
            value,
        )));
        Some(lines)
    }
}

/// Question sent for a forwarded slash command.
pub fn forwarded_question(invocation: &CommandInvocation) -> Option<String> {
    let args = invocation.args.trim();
    match invocation.command {
        SlashCommand::FindDoctor if args.is_empty() => Some("Find me a doctor".to_string()),
        SlashCommand::FindDoctor => Some(format!("Find me a doctor: {args}")),
        SlashCommand::Summarize if args.is_empty() => {
            Some("Summarize our conversation so far".to_string())
        }
        SlashCommand::Summarize => Some(format!("Summarize our conversation so far: {args}")),
        _ => None,
    }
}

fn role_badge(role: Role) -> Span<'static> {
    let (label, background) = match role {
        Role::User => (" you ", Color::Rgb(107, 161, 230)),
        Role::Assistant => (" atlas ", Color::Rgb(238, 121, 72)),
    };
    Span::styled(
        label,
        Style::default()
            .fg(Color::Rgb(10, 10, 10))
            .bg(background)
            .add_modifier(Modifier::BOLD),
    )
}

fn match_line(
    record: &MatchRecord,
    position: usize,
    focused: bool,
    language: Language,
) -> Line<'static> {
    let marker = if focused { ">" } else { " " };
    let name_style = if focused {
        Style::default()
            .fg(accent_color())
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(text_color())
    };
    let mut spans = vec![
        Span::styled(format!(" {marker} {position}. "), name_style),
        Span::styled(record.display_name(language), name_style),
    ];
    if let Some(specialty) = record.specialty.as_deref() {
        spans.push(Span::styled(
            format!("  {specialty}"),
            Style::default().fg(muted_color()),
        ));
    }
    if let Some(score) = record.score_fraction() {
        spans.push(Span::styled(
            format!("  {}", format_score(score)),
            Style::default().fg(success_color()),
        ));
    }
    Line::from(spans)
}

fn meta_line(message: &Message, copied: bool) -> Line<'static> {
    let muted = Style::default().fg(muted_color());
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let mut spans = vec![Span::styled(format!(" {time}"), muted)];
    if let Some(meta) = &message.meta {
        if let Some(elapsed) = meta.elapsed_ms {
            spans.push(Span::styled(format!("  {elapsed} ms"), muted));
        }
        if meta.debug {
            spans.push(Span::styled(
                "  debug",
                Style::default()
                    .fg(Color::Rgb(229, 192, 123))
                    .add_modifier(Modifier::BOLD),
            ));
        }
    }
    if copied {
        spans.push(Span::styled("  copied", Style::default().fg(success_color())));
    }
    Line::from(spans)
}

fn format_score(score: f64) -> String {
    format!("{:.0}%", score * 100.0)
}

fn text_color() -> Color {
    Color::Rgb(238, 238, 238)
}

fn muted_color() -> Color {
    Color::Rgb(128, 128, 128)
}

fn accent_color() -> Color {
    Color::Rgb(236, 91, 43)
}

fn success_color() -> Color {
    Color::Rgb(120, 220, 140)
}

fn error_color() -> Color {
    Color::Rgb(255, 110, 110)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_rs_core::{Answer, InputOptions, Outcome};
    use atlas_rs_test_utils::{
        GatedAskClient, RecordingSpeaker, ScriptedAskClient, ScriptedRecognizer,
        answer_with_matches,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn build_app(client: ScriptedAskClient) -> (App, mpsc::Receiver<Completion>) {
        let (store, completions) = SessionStore::new(Arc::new(client), Language::Primary);
        let (input, _speech) = InputController::new(
            Arc::new(ScriptedRecognizer::new()),
            Language::Primary,
            InputOptions {
                debug_enabled: true,
                ..InputOptions::default()
            },
        );
        let app = App::new(
            store,
            input,
            ScrollController::new(1),
            "http://localhost:5001".to_string(),
            vec!["Find me a cardiologist".to_string()],
        );
        (app, completions)
    }

    #[derive(Clone, Default)]
    struct SharedClipboard(Arc<Mutex<Vec<String>>>);

    impl Clipboard for SharedClipboard {
        fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
            self.0.lock().push(text.to_string());
            Ok(())
        }
    }

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    /// Verify that the seeded greeting renders under one assistant badge.
    #[test]
    fn renders_greeting() {
        let (app, _completions) = build_app(ScriptedAskClient::default());
        let lines = plain(&app.render_lines());
        assert_eq!(lines[0], " atlas ");
        assert_eq!(lines[1], " Hello! How can I help you today?");
        assert!(lines[2].starts_with(' '));
        assert!(app.detail_lines().is_none());
    }

    /// Verify grouping, match rows, the loading placeholder, and focus.
    #[tokio::test]
    async fn renders_resolved_matches() {
        let (mut app, mut completions) =
            build_app(ScriptedAskClient::new(vec![answer_with_matches(&["Dr. A", "Dr. B"])]));
        app.input.set_buffer("find me a cardiologist");
        app.submit_buffer();
        assert!(app.store.loading());
        let pending = plain(&app.render_lines());
        assert!(pending.iter().any(|line| line.contains("thinking...")));

        let completion = completions.recv().await.expect("completion");
        app.resolve(completion);
        assert!(!app.store.loading());
        assert_eq!(app.match_cursor, Some(0));

        let lines = plain(&app.render_lines());
        let badges = lines
            .iter()
            .filter(|line| line.as_str() == " atlas " || line.as_str() == " you ")
            .count();
        assert_eq!(badges, 3);
        assert!(lines.contains(&" Found 2 result(s).".to_string()));
        assert!(lines.contains(&" > 1. Dr. A".to_string()));
        assert!(lines.contains(&"   2. Dr. B".to_string()));
        assert!(lines.iter().any(|line| line.contains("1 ms")));
    }

    /// Verify Tab navigation wraps and updates the selected match.
    #[tokio::test]
    async fn tab_cycles_through_matches() {
        let (mut app, mut completions) =
            build_app(ScriptedAskClient::new(vec![answer_with_matches(&["Dr. A", "Dr. B"])]));
        app.ask("cardiologist");
        let completion = completions.recv().await.expect("completion");
        app.resolve(completion);

        app.select_next_match();
        assert_eq!(app.match_cursor, Some(1));
        assert_eq!(
            app.store.selected().map(|record| record.display_name(Language::Primary)),
            Some("Dr. B".to_string())
        );
        app.select_next_match();
        assert_eq!(app.match_cursor, Some(0));
        app.select_prev_match();
        assert_eq!(app.match_cursor, Some(1));
    }

    /// Verify the detail panel fallbacks.
    #[tokio::test]
    async fn detail_panel_falls_back() {
        let (mut app, mut completions) =
            build_app(ScriptedAskClient::new(vec![answer_with_matches(&["Dr. A"])]));
        app.ask("anyone");
        let completion = completions.recv().await.expect("completion");
        app.resolve(completion);

        let detail = plain(&app.detail_lines().expect("detail"));
        assert_eq!(detail[0], " Dr. A");
        assert!(detail.contains(&" Specialty Not specified".to_string()));
        assert!(detail.contains(&" Availability Not specified".to_string()));
        assert_eq!(detail.last().map(String::as_str), Some(" No bio available."));
    }

    /// Verify that debug submissions are tagged in the transcript.
    #[tokio::test]
    async fn debug_submission_is_tagged() {
        let client = ScriptedAskClient::default();
        let (mut app, mut completions) = build_app(client.clone());
        app.input.set_buffer("cardio");
        app.submit_debug_buffer();
        let completion = completions.recv().await.expect("completion");
        app.resolve(completion);

        assert_eq!(client.requests().len(), 1);
        let lines = plain(&app.render_lines());
        assert!(lines.iter().any(|line| line.ends_with("debug")));
    }

    /// Verify local and forwarded slash commands.
    #[tokio::test]
    async fn slash_commands_dispatch() {
        let client = ScriptedAskClient::default();
        let (mut app, _completions) = build_app(client.clone());

        app.input.set_buffer("/he");
        app.submit_buffer();
        assert!(app.show_help);

        app.input.set_buffer("/lang-ar");
        app.submit_buffer();
        assert_eq!(app.language(), Language::Secondary);
        assert_eq!(app.input.language(), Language::Secondary);
        assert_eq!(app.store.messages().len(), 1);

        app.input.set_buffer("/lang");
        app.submit_buffer();
        assert!(app.status.contains("ambiguous"));
        assert_eq!(app.input.buffer(), "/lang");

        app.input.set_buffer("/find-doctor pediatrics");
        app.submit_buffer();
        assert!(app.store.loading());
        assert_eq!(
            app.store.messages().last().map(|message| message.content.as_str()),
            Some("Find me a doctor: pediatrics")
        );
        assert_eq!(client.requests().len(), 1);
    }

    /// Verify suggestions go straight to the session.
    #[tokio::test]
    async fn suggestion_submits_question() {
        let client = ScriptedAskClient::default();
        let (mut app, _completions) = build_app(client);
        app.submit_suggestion(0);
        assert_eq!(
            app.store.messages().last().map(|message| message.content.as_str()),
            Some("Find me a cardiologist")
        );
        app.submit_suggestion(5);
        assert_eq!(app.store.messages().len(), 2);
    }

    /// Verify forwarded question templates.
    #[test]
    fn forwarded_questions() {
        let invocation = |command, args: &str| CommandInvocation {
            command,
            args: args.to_string(),
        };
        assert_eq!(
            forwarded_question(&invocation(SlashCommand::FindDoctor, "")),
            Some("Find me a doctor".to_string())
        );
        assert_eq!(
            forwarded_question(&invocation(SlashCommand::Summarize, " ")),
            Some("Summarize our conversation so far".to_string())
        );
        assert_eq!(forwarded_question(&invocation(SlashCommand::Clear, "")), None);
    }

    /// Verify clear events reset scroll and focus.
    #[test]
    fn cleared_event_resets_view_state() {
        let (mut app, _completions) = build_app(ScriptedAskClient::default());
        app.scroll.update_bounds(30);
        app.scroll.scroll_up(10);
        app.apply_session_event(&SessionEvent::MessageAppended {
            id: uuid_like(),
            role: Role::Assistant,
        });
        assert_eq!(app.scroll.missed_count(), 1);
        app.match_cursor = Some(2);

        app.apply_session_event(&SessionEvent::Cleared {
            language: Language::Primary,
        });
        assert_eq!(app.scroll.missed_count(), 0);
        assert_eq!(app.match_cursor, None);
    }

    fn uuid_like() -> atlas_rs_protocol::MessageId {
        Message::new(Role::User, "x", None).id
    }

    /// Verify copy and read-aloud target the focused reply.
    #[tokio::test]
    async fn copy_and_speak_focused_reply() {
        let (app, mut completions) = build_app(ScriptedAskClient::new(vec![
            answer_with_matches(&["Dr. A"]),
            Outcome::Answered(Answer {
                answer: "Mornings only.".to_string(),
                ..Answer::default()
            }),
        ]));
        let clipboard = SharedClipboard::default();
        let speaker = RecordingSpeaker::new();
        let mut app = app
            .with_clipboard(Box::new(clipboard.clone()))
            .with_speaker(Arc::new(speaker.clone()));

        app.copy_message();
        assert_eq!(
            clipboard.0.lock().clone(),
            vec!["Hello! How can I help you today?".to_string()]
        );

        app.ask("cardiologist");
        app.resolve(completions.recv().await.expect("completion"));
        app.ask("when?");
        app.resolve(completions.recv().await.expect("completion"));
        assert_eq!(app.match_cursor, Some(0));

        app.copy_message();
        assert_eq!(app.status, "copied");
        assert_eq!(
            clipboard.0.lock().last().map(String::as_str),
            Some("Found 1 result(s).")
        );
        let lines = plain(&app.render_lines());
        assert_eq!(lines.iter().filter(|line| line.ends_with("copied")).count(), 1);
        for _ in 0..COPIED_TICKS {
            app.tick();
        }
        let lines = plain(&app.render_lines());
        assert!(!lines.iter().any(|line| line.ends_with("copied")));

        app.match_cursor = None;
        app.speak_message();
        assert_eq!(
            speaker.spoken(),
            vec![("Mornings only.".to_string(), Language::Primary)]
        );
        assert_eq!(app.status, "reading aloud");
    }

    /// Verify reading aloud without a backend only reports it.
    #[test]
    fn speak_without_backend_reports_status() {
        let (mut app, _completions) = build_app(ScriptedAskClient::default());
        app.speak_message();
        assert_eq!(app.status, "reading aloud is not supported");
    }

    /// Verify a rejected submission leaves the viewport where it was.
    #[tokio::test]
    async fn busy_suggestion_keeps_scroll_position() {
        let (client, _release) = GatedAskClient::new();
        let (store, _completions) = SessionStore::new(Arc::new(client), Language::Primary);
        let (input, _speech) = InputController::new(
            Arc::new(ScriptedRecognizer::new()),
            Language::Primary,
            InputOptions::default(),
        );
        let mut app = App::new(
            store,
            input,
            ScrollController::new(1),
            "http://localhost:5001".to_string(),
            vec!["Find me a cardiologist".to_string()],
        );
        app.submit_suggestion(0);
        assert!(app.store.loading());

        app.scroll.update_bounds(40);
        app.scroll.scroll_up(20);
        let offset = app.scroll.offset();
        assert!(!app.scroll.pinned_to_bottom());

        app.submit_suggestion(0);
        assert_eq!(app.scroll.offset(), offset);
        assert!(!app.scroll.pinned_to_bottom());
        assert_eq!(app.store.messages().len(), 2);
        assert_eq!(app.status, SubmitError::Busy.to_string());
    }
}
