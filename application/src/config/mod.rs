//! Application-level configuration.
//!
//! - [`DeliberationConfig`]: orchestrator loop control (refinement cap, threshold, timeouts)
//! - [`BeadifierConfig`]: task extraction limits and sampling

pub mod beadifier_config;
pub mod deliberation_config;

pub use beadifier_config::BeadifierConfig;
pub use deliberation_config::DeliberationConfig;
