//! Application layer for thinktank
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{BeadifierConfig, DeliberationConfig};
pub use ports::{
    events::{EventBus, ForgeEvent},
    llm_adapter::{AdapterError, LlmAdapter, StreamHandle},
};
pub use use_cases::beadify::{BeadifyError, BeadifyOutcome, Beadifier, RejectedTask, StopReason};
pub use use_cases::run_deliberation::{DeliberationOutcome, Orchestrator, OrchestratorError};
