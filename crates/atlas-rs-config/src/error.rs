//! Errors raised while resolving the Atlas client settings.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn config sources into a usable `AtlasConfig`.
///
/// Every variant names where the problem came from: a file path, a layer
/// label such as `cwd(/repo/atlas.json5)`, or a dotted field path.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer file or the working directory could not be read.
    #[error("cannot read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A layer is not valid JSON5.
    #[error("{layer} is not valid json5: {source}")]
    ParseFailed { layer: String, source: json5::Error },
    /// The merged value passed the schema but did not decode into the model.
    #[error("{layer} does not decode into a config: {source}")]
    DecodeFailed {
        layer: String,
        source: serde_json::Error,
    },
    /// A field holds a value the client cannot use.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(layer: impl Into<String>, source: json5::Error) -> Self {
        Self::ParseFailed {
            layer: layer.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            path: path.into(),
            message: message.into(),
        }
    }
}
