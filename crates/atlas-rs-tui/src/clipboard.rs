//! Clipboard access for the copy action.

use anyhow::Context;
use log::debug;

/// Destination for copied message text.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
}

/// The desktop clipboard.
///
/// The handle is opened on first use and kept so the copied text stays
/// available on platforms where the owning process serves it.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().context("clipboard unavailable")?,
        };
        let written = clipboard.set_text(text.to_string());
        self.inner = Some(clipboard);
        written.context("clipboard write failed")?;
        debug!("copied to clipboard (chars={})", text.chars().count());
        Ok(())
    }
}
