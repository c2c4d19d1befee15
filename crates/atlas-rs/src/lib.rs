//! Public surface for the Atlas assistant client.
//!
//! This crate re-exports the building blocks and provides the helpers the
//! `atlas` binary uses to assemble them, so embedders get the same setup.

/// Re-export for convenience.
pub use atlas_rs_config as config;
pub use atlas_rs_core as core;
/// Re-export for convenience.
pub use atlas_rs_protocol as protocol;
pub use atlas_rs_tui as tui;

use atlas_rs_config::AtlasConfig;
use atlas_rs_protocol::Language;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}

/// Command-line settings applied on top of the layered configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub language: Option<Language>,
    pub debug_tools: bool,
    pub auto_send: bool,
    pub speech_command: Option<String>,
    pub speak_command: Option<String>,
}

impl CliOverrides {
    /// Apply the overrides; flags only ever switch features on.
    pub fn apply(&self, config: &mut AtlasConfig) {
        if let Some(base_url) = &self.base_url {
            config.client.base_url = base_url.trim().to_string();
        }
        if let Some(language) = self.language {
            config.session.language = language;
        }
        if self.debug_tools {
            config.client.debug_tools = true;
        }
        if self.auto_send {
            config.input.auto_send_speech = true;
        }
        if let Some(command) = &self.speech_command {
            config.input.speech_command = Some(command.clone());
        }
        if let Some(command) = &self.speak_command {
            config.input.speak_command = Some(command.clone());
        }
    }
}
