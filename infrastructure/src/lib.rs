//! Infrastructure layer for thinktank
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: streaming provider adapters, the provider registry,
//! configuration file loading, JSONL event logging and spec file output.

pub mod beads;
pub mod config;
pub mod logging;
pub mod providers;

// Re-export commonly used types
pub use beads::{SpecWriteError, write_spec_files};
pub use config::{
    ConfigLoader, ConfigValidationError, FileBeadifierConfig, FileConfig, FileDeliberationConfig,
    FileLoggingConfig, FileParticipantConfig, FileProvidersConfig,
};
pub use logging::JsonlEventLogger;
pub use providers::{CredentialSource, EnvCredentials, FallbackAdapter, ProviderRegistry};
