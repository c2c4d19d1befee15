//! Configuration schema for the Atlas client.

use atlas_rs_protocol::Language;
use serde::{Deserialize, Serialize};

/// Default answering service location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";

/// Root config for the Atlas client.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AtlasConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Remote answering service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ask_path")]
    pub ask_path: String,
    #[serde(default = "default_debug_path")]
    pub debug_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Enables the retrieval-only debug submission path.
    #[serde(default)]
    pub debug_tools: bool,
    /// Optional transport timeout. Requests are otherwise bounded only by
    /// cancellation.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ask_path: default_ask_path(),
            debug_path: default_debug_path(),
            health_path: default_health_path(),
            debug_tools: false,
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Base URL with any trailing slashes removed.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_ask_path() -> String {
    "/ask".to_string()
}

fn default_debug_path() -> String {
    "/retrieve".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

/// Session defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub language: Language,
}

/// Text entry and speech capture settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// Submit the buffer automatically when speech recognition ends.
    #[serde(default)]
    pub auto_send_speech: bool,
    /// Delay between recognition end and the automatic submission.
    #[serde(default = "default_speech_settle_ms")]
    pub speech_settle_ms: u64,
    /// External speech-to-text command; `{lang}` expands to the locale.
    #[serde(default)]
    pub speech_command: Option<String>,
    /// External text-to-speech command reading the text from stdin; `{lang}`
    /// expands to the locale.
    #[serde(default)]
    pub speak_command: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            auto_send_speech: false,
            speech_settle_ms: default_speech_settle_ms(),
            speech_command: None,
            speak_command: None,
        }
    }
}

fn default_speech_settle_ms() -> u64 {
    400
}

/// Terminal UI presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    /// Distance from the end, in lines, still treated as pinned to the bottom.
    #[serde(default = "default_scroll_tolerance")]
    pub scroll_tolerance: u16,
    /// Suggested questions offered under the input box.
    #[serde(default = "default_suggestions")]
    pub suggestions: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            scroll_tolerance: default_scroll_tolerance(),
            suggestions: default_suggestions(),
        }
    }
}

fn default_scroll_tolerance() -> u16 {
    1
}

fn default_suggestions() -> Vec<String> {
    vec![
        "Find me a cardiologist".to_string(),
        "Find a pediatrician".to_string(),
        "Which doctor is available Monday?".to_string(),
    ]
}
