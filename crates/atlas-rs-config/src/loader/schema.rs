//! Schema validation helpers for Atlas JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(
        map,
        &["$schema", "client", "session", "input", "ui"],
        layer,
        "",
    )?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("client") {
        validate_client(value, layer, "client")?;
    }
    if let Some(value) = map.get("session") {
        validate_session(value, layer, "session")?;
    }
    if let Some(value) = map.get("input") {
        validate_input(value, layer, "input")?;
    }
    if let Some(value) = map.get("ui") {
        validate_ui(value, layer, "ui")?;
    }
    Ok(())
}

/// Validate the "client" block.
fn validate_client(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "base_url",
            "ask_path",
            "debug_path",
            "health_path",
            "debug_tools",
            "request_timeout_secs",
        ],
        layer,
        path,
    )?;
    for key in ["base_url", "ask_path", "debug_path", "health_path"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("debug_tools") {
        expect_bool(value, layer, &join_path(path, "debug_tools"))?;
    }
    if let Some(value) = map.get("request_timeout_secs")
        && !value.is_null()
    {
        expect_u64(value, layer, &join_path(path, "request_timeout_secs"))?;
    }
    Ok(())
}

/// Validate the "session" block.
fn validate_session(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["language"], layer, path)?;
    if let Some(value) = map.get("language") {
        let field = join_path(path, "language");
        let code = value
            .as_str()
            .ok_or_else(|| invalid_field(layer, &field, "expected string"))?;
        if !["en", "ar", "primary", "secondary"].contains(&code) {
            return Err(invalid_field(
                layer,
                &field,
                "expected one of: en, ar, primary, secondary",
            ));
        }
    }
    Ok(())
}

/// Validate the "input" block.
fn validate_input(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["auto_send_speech", "speech_settle_ms", "speech_command", "speak_command"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("auto_send_speech") {
        expect_bool(value, layer, &join_path(path, "auto_send_speech"))?;
    }
    if let Some(value) = map.get("speech_settle_ms") {
        expect_u64(value, layer, &join_path(path, "speech_settle_ms"))?;
    }
    for key in ["speech_command", "speak_command"] {
        if let Some(value) = map.get(key)
            && !value.is_null()
        {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate the "ui" block.
fn validate_ui(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["scroll_tolerance", "suggestions"], layer, path)?;
    if let Some(value) = map.get("scroll_tolerance") {
        expect_u64(value, layer, &join_path(path, "scroll_tolerance"))?;
    }
    if let Some(value) = map.get("suggestions") {
        validate_string_array(value, layer, &join_path(path, "suggestions"))?;
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Value::Array(entries) = value else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    match entries.iter().position(|entry| !entry.is_string()) {
        Some(idx) => Err(invalid_field(
            layer,
            &format!("{path}[{idx}]"),
            "expected string",
        )),
        None => Ok(()),
    }
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::invalid(format!("{layer}:{path}"), message)
}
