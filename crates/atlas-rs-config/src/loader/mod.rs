//! Layered configuration loader.
//!
//! Discovers configuration layers (user/project/cwd/repo/runtime), validates
//! their schema, merges them in precedence order, and applies environment
//! overrides to produce a final `AtlasConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;

#[cfg(test)]
mod tests;

use crate::{AtlasConfig, ConfigError};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "atlas.json5";
/// Default config directory under user or repo roots.
const DEFAULT_CONFIG_DIR: &str = ".atlas";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

/// Environment variable overriding `client.base_url`.
pub const ENV_API_BASE: &str = "ATLAS_API_BASE";
/// Environment variable overriding `client.debug_tools`.
pub const ENV_DEBUG_TOOLS: &str = "ATLAS_DEBUG_TOOLS";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: AtlasConfig,
    /// Metadata for each layer that contributed.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Project root configuration.
    Project,
    /// Current working directory configuration.
    Cwd,
    /// Repo-local configuration.
    Repo,
    /// Runtime overrides passed on the command line.
    Runtime,
    /// Environment variable overrides (highest precedence).
    Environment,
}

/// Metadata about a config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk if the layer is a file.
    pub path: Option<PathBuf>,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve local layers.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.atlas/atlas.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied after file layers.
    pub runtime_paths: Vec<PathBuf>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
    /// Whether `ATLAS_*` environment variables are consulted.
    pub read_environment: bool,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            read_environment: true,
        }
    }

    /// Add a runtime override config path that is applied after file layers.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Skip environment variable overrides.
    pub fn without_environment(mut self) -> Self {
        self.read_environment = false;
        self
    }
}

impl AtlasConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading config from path: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::read(path, err))?;
        let label = path.display().to_string();
        let value: Value =
            json5::from_str(&contents).map_err(|err| ConfigError::parse(label.as_str(), err))?;
        config_from_value(value, &label)
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value =
            json5::from_str(contents).map_err(|err| ConfigError::parse("config", err))?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    ///
    /// Layer precedence (low -> high): user, project, cwd, repo, runtime,
    /// environment.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());
        let mut seen_paths = HashSet::new();

        let mut candidates = Vec::new();
        if let Some(path) = options.user_config_path.clone() {
            candidates.push((ConfigLayerSource::User, path));
        }
        let project_root = utils::find_project_root(&cwd, &options.project_root_markers);
        match project_root.as_ref() {
            Some(root) => {
                debug!("resolved project root: {}", root.display());
                candidates.push((ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE)));
            }
            None => debug!("project root not found; skipping project/repo layers"),
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));
        if let Some(root) = project_root.as_ref() {
            candidates.push((
                ConfigLayerSource::Repo,
                root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
            ));
        }

        for (source, path) in candidates {
            if !seen_paths.insert(utils::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layer_io::load_optional_layer(source, &path)? {
                merge::merge_json_values(&mut merged, &layer.value);
                layers.push(layer.meta);
            }
        }

        for runtime_path in &options.runtime_paths {
            let layer = layer_io::load_required_layer(ConfigLayerSource::Runtime, runtime_path)?;
            debug!("loaded runtime layer (path={})", runtime_path.display());
            merge::merge_json_values(&mut merged, &layer.value);
            layers.push(layer.meta);
        }

        let mut config = config_from_value(merged, "effective")?;
        if options.read_environment
            && config.apply_env_overrides(|key| std::env::var(key).ok())?
        {
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Environment,
                path: None,
            });
        }
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Apply `ATLAS_*` overrides read through `lookup`.
    ///
    /// Returns whether any override was applied.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<bool, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = false;
        if let Some(base_url) = lookup(ENV_API_BASE).filter(|value| !value.trim().is_empty()) {
            debug!("applying {} override", ENV_API_BASE);
            self.client.base_url = base_url.trim().to_string();
            applied = true;
        }
        if let Some(raw) = lookup(ENV_DEBUG_TOOLS) {
            self.client.debug_tools = utils::parse_flag(&raw).ok_or_else(|| {
                ConfigError::invalid(
                    format!("env:{ENV_DEBUG_TOOLS}"),
                    format!("expected boolean flag, got '{raw}'"),
                )
            })?;
            applied = true;
        }
        if applied {
            self.validate()?;
        }
        Ok(applied)
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.client.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "client.base_url",
                format!("expected http(s) URL, got '{base_url}'"),
            ));
        }
        for (path, value) in [
            ("client.ask_path", &self.client.ask_path),
            ("client.debug_path", &self.client.debug_path),
            ("client.health_path", &self.client.health_path),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::invalid(path, "endpoint paths must start with '/'"));
            }
        }
        for (path, command) in [
            ("input.speech_command", &self.input.speech_command),
            ("input.speak_command", &self.input.speak_command),
        ] {
            if command
                .as_deref()
                .is_some_and(|command| command.trim().is_empty())
            {
                return Err(ConfigError::invalid(path, "command must not be blank"));
            }
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<AtlasConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: AtlasConfig =
        serde_json::from_value(value).map_err(|source| ConfigError::DecodeFailed {
            layer: label.to_string(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
