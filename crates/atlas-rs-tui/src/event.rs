//! TUI event types for input and background tasks.

use atlas_rs_protocol::ServiceHealth;
use crossterm::event::KeyEvent;

/// Application event emitted by input handlers or spawned tasks.
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input event.
    Input(KeyEvent),
    /// Periodic tick event.
    Tick,
    /// Scroll event in the chat view.
    Scroll(i16),
    /// Result of the startup health probe.
    Health(Result<ServiceHealth, String>),
    /// Settling delay after recognition ended has passed.
    AutoSend(u64),
}
