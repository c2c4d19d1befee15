//! Library entry point for the Atlas TUI.
//!
//! Provides a reusable [`run`] function that launches the Ratatui terminal UI
//! against a configured [`AskClient`], speech recognizer and speaker.

mod app;
mod clipboard;
mod event;
mod ui;

use anyhow::anyhow;
use app::App;
use clipboard::SystemClipboard;
use atlas_rs_config::AtlasConfig;
use atlas_rs_core::{
    AskClient, AutoSend, EventBus, InputController, InputOptions, ScrollController, SessionStore,
    Speaker, SpeechRecognizer,
};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEvent,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use event::AppEvent;
use log::{debug, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

const SESSION_EVENT_BUFFER: usize = 64;
const PAGE_LINES: u16 = 5;

/// Launch the Atlas TUI.
///
/// The caller initializes logging before calling `run`; log output should go
/// to stderr or a file so it does not fight the alternate screen.
///
/// # Errors
/// Returns an error if terminal setup or the event loop fails.
pub async fn run(
    config: AtlasConfig,
    client: Arc<dyn AskClient>,
    recognizer: Arc<dyn SpeechRecognizer>,
    speaker: Arc<dyn Speaker>,
) -> anyhow::Result<()> {
    let language = config.session.language;
    let bus = EventBus::new(SESSION_EVENT_BUFFER);
    let mut session_events = bus.subscribe();
    let (store, mut completions) = SessionStore::new(client.clone(), language);
    let store = store.with_sink(Arc::new(bus));
    let (input, mut speech) = InputController::new(
        recognizer,
        language,
        InputOptions {
            debug_enabled: config.client.debug_tools,
            auto_send: config.input.auto_send_speech,
            settle: Duration::from_millis(config.input.speech_settle_ms),
        },
    );
    let mut app = App::new(
        store,
        input,
        ScrollController::new(config.ui.scroll_tolerance),
        config.client.normalized_base_url(),
        config.ui.suggestions.clone(),
    )
    .with_clipboard(Box::new(SystemClipboard::default()))
    .with_speaker(speaker);
    info!(
        "starting tui (base_url={}, language={}, debug_tools={})",
        app.base_url, language, config.client.debug_tools
    );

    let mut terminal = setup_terminal()?;
    let (tx, mut rx) = mpsc::channel(256);
    spawn_input_handler(tx.clone());
    spawn_tick(tx.clone());
    spawn_health_probe(client, tx.clone());

    let result = loop {
        if let Err(err) = terminal.draw(|frame| ui::draw(frame, &mut app)) {
            break Err(err.into());
        }
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    break Err(anyhow!("event channel closed unexpectedly"));
                };
                if handle_app_event(event, &mut app, &tx) {
                    break Ok(());
                }
            }
            Some(completion) = completions.recv() => app.resolve(completion),
            Some(update) = speech.recv() => {
                if let Some(auto_send) = app.handle_speech(update) {
                    schedule_auto_send(auto_send, tx.clone());
                }
            }
            event = session_events.recv() => match event {
                Ok(event) => app.apply_session_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("session events lagged (skipped={})", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break Err(anyhow!("session event bus closed"));
                }
            },
        }
    };

    restore_terminal(&mut terminal)?;
    result
}

/// Dispatch a UI event and return true when the app should exit.
fn handle_app_event(event: AppEvent, app: &mut App, sender: &mpsc::Sender<AppEvent>) -> bool {
    match event {
        AppEvent::Input(key) => handle_input(key, app, sender),
        AppEvent::Scroll(delta) => {
            if delta < 0 {
                app.scroll.scroll_up(delta.unsigned_abs());
            } else if delta > 0 {
                app.scroll.scroll_down(delta.unsigned_abs());
            }
            false
        }
        AppEvent::Health(result) => {
            app.set_health(result);
            false
        }
        AppEvent::AutoSend(ticket) => {
            app.redeem_auto_send(ticket);
            false
        }
        AppEvent::Tick => {
            app.tick();
            false
        }
    }
}

/// Handle keyboard input and dispatch actions.
fn handle_input(key: KeyEvent, app: &mut App, sender: &mpsc::Sender<AppEvent>) -> bool {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    if control && key.code == KeyCode::Char('c') {
        return true;
    }
    if key.code == KeyCode::Esc {
        if app.show_help {
            app.show_help = false;
            return false;
        }
        if app.input.is_command() {
            app.input.clear_buffer();
            return false;
        }
        return true;
    }
    if app.show_help {
        // Any other key dismisses the overlay.
        app.show_help = false;
        return false;
    }

    if key.modifiers.contains(KeyModifiers::ALT)
        && let KeyCode::Char(digit @ '1'..='9') = key.code
    {
        app.submit_suggestion(digit as usize - '1' as usize);
        return false;
    }

    match key.code {
        KeyCode::Char('l') if control => app.clear(),
        KeyCode::Char('d') if control => app.submit_debug_buffer(),
        KeyCode::Char('y') if control => app.copy_message(),
        KeyCode::Char('s') if control => app.speak_message(),
        KeyCode::Char('r') if control => {
            if let Some(auto_send) = app.toggle_recording() {
                schedule_auto_send(auto_send, sender.clone());
            }
        }
        KeyCode::Tab => app.select_next_match(),
        KeyCode::BackTab => app.select_prev_match(),
        KeyCode::PageUp => app.scroll.scroll_up(PAGE_LINES),
        KeyCode::PageDown => app.scroll.scroll_down(PAGE_LINES),
        KeyCode::Up => app.scroll.scroll_up(1),
        KeyCode::Down => app.scroll.scroll_down(1),
        KeyCode::Home => app.scroll.scroll_to_top(),
        KeyCode::End => app.scroll.jump_to_latest(),
        KeyCode::Enter => app.submit_buffer(),
        KeyCode::Backspace => app.input.backspace(),
        KeyCode::Char(ch) if !control => app.input.insert_char(ch),
        _ => {}
    }
    false
}

/// Deliver an [`AppEvent::AutoSend`] once the settling delay has passed.
fn schedule_auto_send(auto_send: AutoSend, sender: mpsc::Sender<AppEvent>) {
    debug!(
        "auto send scheduled (ticket={}, delay_ms={})",
        auto_send.ticket,
        auto_send.delay.as_millis()
    );
    tokio::spawn(async move {
        tokio::time::sleep(auto_send.delay).await;
        let _ = sender.send(AppEvent::AutoSend(auto_send.ticket)).await;
    });
}

/// Probe the service once; failures only reach the status line.
fn spawn_health_probe(client: Arc<dyn AskClient>, sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let result = client.health().await.map_err(|err| err.to_string());
        let _ = sender.send(AppEvent::Health(result)).await;
    });
}

/// Spawn a task to poll for input events.
fn spawn_input_handler(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        const MOUSE_SCROLL_LINES: i16 = 3;
        loop {
            if !matches!(crossterm::event::poll(Duration::from_millis(30)), Ok(true)) {
                continue;
            }
            while matches!(crossterm::event::poll(Duration::from_millis(0)), Ok(true)) {
                let event = match crossterm::event::read() {
                    Ok(event) => event,
                    Err(_) => break,
                };
                let sent = match event {
                    CrosstermEvent::Key(key) => sender.send(AppEvent::Input(key)).await,
                    CrosstermEvent::Mouse(mouse) => {
                        let lines = if mouse.modifiers.contains(KeyModifiers::SHIFT) {
                            MOUSE_SCROLL_LINES.saturating_mul(2)
                        } else {
                            MOUSE_SCROLL_LINES
                        };
                        match mouse.kind {
                            MouseEventKind::ScrollUp => sender.send(AppEvent::Scroll(-lines)).await,
                            MouseEventKind::ScrollDown => sender.send(AppEvent::Scroll(lines)).await,
                            _ => Ok(()),
                        }
                    }
                    _ => Ok(()),
                };
                if sent.is_err() {
                    return;
                }
            }
        }
    });
}

/// Spawn a periodic tick event generator.
fn spawn_tick(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            if sender.send(AppEvent::Tick).await.is_err() {
                return;
            }
        }
    });
}

/// Configure terminal in raw mode with alternate screen.
fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    debug!("setting up terminal");
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal state on exit.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    debug!("restoring terminal");
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
