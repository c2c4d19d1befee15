//! Configuration models and layered config loading for the Atlas client.
//!
//! Settings are resolved once at startup and never re-read mid-session.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types, loader options, and environment overrides.
pub use loader::{
    ConfigLayer, ConfigLayerSource, ENV_API_BASE, ENV_DEBUG_TOOLS, LayeredConfig,
    LayeredConfigOptions,
};
/// Configuration schema models.
pub use model::*;
