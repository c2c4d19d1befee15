//! Tests for layered configuration loading.

use super::*;
use atlas_rs_protocol::Language;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

/// Verify that an empty config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = AtlasConfig::load_from_str("{}").expect("config");
    assert_eq!(config, AtlasConfig::default());
    assert_eq!(config.client.base_url, crate::DEFAULT_BASE_URL);
    assert_eq!(config.client.ask_path, "/ask");
    assert_eq!(config.input.speech_settle_ms, 400);
    assert_eq!(config.ui.suggestions.len(), 3);
}

/// Verify a fully populated file decodes every section.
#[test]
fn parse_full_config() {
    let json5 = r#"{
        // comments are fine in json5
        client: { base_url: "https://atlas.example/", debug_tools: true, request_timeout_secs: 30 },
        session: { language: "ar" },
        input: {
            auto_send_speech: true,
            speech_settle_ms: 250,
            speech_command: "stt --lang {lang}",
            speak_command: "say --voice {lang}",
        },
        ui: { scroll_tolerance: 3, suggestions: ["one"] },
    }"#;
    let config = AtlasConfig::load_from_str(json5).expect("config");
    assert_eq!(config.client.normalized_base_url(), "https://atlas.example");
    assert!(config.client.debug_tools);
    assert_eq!(config.client.request_timeout_secs, Some(30));
    assert_eq!(config.session.language, Language::Secondary);
    assert!(config.input.auto_send_speech);
    assert_eq!(config.input.speech_command.as_deref(), Some("stt --lang {lang}"));
    assert_eq!(config.input.speak_command.as_deref(), Some("say --voice {lang}"));
    assert_eq!(config.ui.suggestions, vec!["one".to_string()]);
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = AtlasConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

/// Reject unsupported language codes.
#[test]
fn rejects_unknown_language() {
    let err = AtlasConfig::load_from_str(r#"{ session: { language: "fr" } }"#).unwrap_err();
    assert!(format!("{err}").contains("session.language"));
}

/// Reject base URLs without an http(s) scheme.
#[test]
fn rejects_base_url_without_scheme() {
    let err = AtlasConfig::load_from_str(r#"{ client: { base_url: "localhost:5001" } }"#)
        .unwrap_err();
    assert!(format!("{err}").contains("client.base_url"));
}

/// Reject endpoint paths that are not absolute.
#[test]
fn rejects_relative_endpoint_path() {
    let err = AtlasConfig::load_from_str(r#"{ client: { ask_path: "ask" } }"#).unwrap_err();
    assert!(format!("{err}").contains("client.ask_path"));
}

/// Reject wrongly typed scalar values.
#[test]
fn rejects_wrong_types() {
    let err = AtlasConfig::load_from_str(r#"{ ui: { scroll_tolerance: -1 } }"#).unwrap_err();
    assert!(format!("{err}").contains("ui.scroll_tolerance"));
    let err = AtlasConfig::load_from_str(r#"{ ui: { suggestions: ["a", 2] } }"#).unwrap_err();
    assert!(format!("{err}").contains("ui.suggestions[1]"));
}

/// Ensure repo config takes precedence over cwd, project and user configs.
#[test]
fn layered_config_prefers_repo_over_cwd() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("user.json5");
    write_json5(
        &user_config,
        r#"{ client: { base_url: "http://user" }, ui: { scroll_tolerance: 9 } }"#,
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        r#"{ client: { base_url: "http://project" } }"#,
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ client: { base_url: "http://cwd" } }"#,
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
        r#"{ client: { base_url: "http://repo" } }"#,
    );

    let mut options = LayeredConfigOptions::new(&cwd).without_environment();
    options.user_config_path = Some(user_config);
    let layered = AtlasConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.client.base_url, "http://repo");
    assert_eq!(layered.config.ui.scroll_tolerance, 9);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Repo,
        ]
    );
}

/// Ensure runtime layers override every file layer.
#[test]
fn runtime_layer_overrides_file_layers() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path().join("work");
    fs::create_dir_all(&cwd).expect("cwd");
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ input: { auto_send_speech: false, speech_settle_ms: 100 } }"#,
    );
    let runtime = temp.path().join("runtime.json5");
    write_json5(&runtime, r#"{ input: { auto_send_speech: true } }"#);

    let mut options = LayeredConfigOptions::new(&cwd)
        .with_runtime_path(&runtime)
        .without_environment();
    options.user_config_path = None;
    let layered = AtlasConfig::load_layered_with_options(options).expect("layered");

    assert!(layered.config.input.auto_send_speech);
    assert_eq!(layered.config.input.speech_settle_ms, 100);
    assert_eq!(
        layered.layers.last().map(|layer| layer.source),
        Some(ConfigLayerSource::Runtime)
    );
}

/// A missing runtime path is an error rather than silently skipped.
#[test]
fn missing_runtime_layer_fails() {
    let temp = TempDir::new().expect("tmp");
    let mut options = LayeredConfigOptions::new(temp.path())
        .with_runtime_path(temp.path().join("absent.json5"))
        .without_environment();
    options.user_config_path = None;
    let err = AtlasConfig::load_layered_with_options(options).unwrap_err();
    match err {
        ConfigError::ReadFailed { path, .. } => assert!(path.ends_with("absent.json5")),
        other => panic!("expected read failure, got {other:?}"),
    }
}

/// Schema errors name the layer they came from.
#[test]
fn layer_errors_include_layer_label() {
    let temp = TempDir::new().expect("tmp");
    write_json5(
        &temp.path().join(DEFAULT_CONFIG_FILE),
        r#"{ client: { debug_tools: "yes" } }"#,
    );
    let mut options = LayeredConfigOptions::new(temp.path()).without_environment();
    options.user_config_path = None;
    let err = AtlasConfig::load_layered_with_options(options).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("client.debug_tools"));
}

/// Environment overrides replace the base URL and debug flag.
#[test]
fn env_overrides_apply() {
    let mut config = AtlasConfig::default();
    let applied = config
        .apply_env_overrides(env_from(&[
            (ENV_API_BASE, " https://remote.example "),
            (ENV_DEBUG_TOOLS, "1"),
        ]))
        .expect("overrides");
    assert!(applied);
    assert_eq!(config.client.base_url, "https://remote.example");
    assert!(config.client.debug_tools);
}

/// Without any variables set nothing changes.
#[test]
fn env_overrides_absent_is_noop() {
    let mut config = AtlasConfig::default();
    let applied = config.apply_env_overrides(env_from(&[])).expect("overrides");
    assert!(!applied);
    assert_eq!(config, AtlasConfig::default());
}

/// Invalid override values are reported instead of ignored.
#[test]
fn env_overrides_reject_invalid_values() {
    let mut config = AtlasConfig::default();
    let err = config
        .apply_env_overrides(env_from(&[(ENV_DEBUG_TOOLS, "maybe")]))
        .unwrap_err();
    assert!(format!("{err}").contains(ENV_DEBUG_TOOLS));

    let mut config = AtlasConfig::default();
    let err = config
        .apply_env_overrides(env_from(&[(ENV_API_BASE, "ftp://nope")]))
        .unwrap_err();
    assert!(format!("{err}").contains("client.base_url"));
}

/// Malformed JSON5 is reported against the layer that carried it.
#[test]
fn parse_errors_name_the_layer() {
    let temp = TempDir::new().expect("tmp");
    write_json5(&temp.path().join(DEFAULT_CONFIG_FILE), "{ client: ");
    let mut options = LayeredConfigOptions::new(temp.path()).without_environment();
    options.user_config_path = None;
    let err = AtlasConfig::load_layered_with_options(options).unwrap_err();
    match err {
        ConfigError::ParseFailed { layer, .. } => assert!(layer.starts_with("cwd(")),
        other => panic!("expected parse failure, got {other:?}"),
    }
}

/// Semantic checks report the offending field path.
#[test]
fn validation_errors_carry_field_paths() {
    let err = AtlasConfig::load_from_str(r#"{ client: { ask_path: "ask" } }"#).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidField { ref path, .. } if path == "client.ask_path"
    ));

    let err = AtlasConfig::load_from_str(r#"{ input: { speech_command: "  " } }"#).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidField { ref path, .. } if path == "input.speech_command"
    ));

    let err = AtlasConfig::load_from_str(r#"{ input: { speak_command: "" } }"#).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidField { ref path, .. } if path == "input.speak_command"
    ));
}

/// Overlay objects merge recursively while scalars and arrays replace.
#[test]
fn merge_replaces_arrays_and_merges_objects() {
    let mut base = serde_json::json!({ "ui": { "suggestions": ["a", "b"], "scroll_tolerance": 2 } });
    let overlay = serde_json::json!({ "ui": { "suggestions": ["c"] } });
    merge::merge_json_values(&mut base, &overlay);
    assert_eq!(
        base,
        serde_json::json!({ "ui": { "suggestions": ["c"], "scroll_tolerance": 2 } })
    );
}
