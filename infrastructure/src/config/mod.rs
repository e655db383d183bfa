//! Configuration file loading for thinktank
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `THINKTANK_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./thinktank.toml` or `./.thinktank.toml`
//! 4. Global: `$XDG_CONFIG_HOME/thinktank/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileBeadifierConfig, FileConfig, FileDeliberationConfig,
    FileLoggingConfig, FileModelRef, FileParticipantConfig, FileProviderConfig,
    FileProvidersConfig,
};
pub use loader::ConfigLoader;
