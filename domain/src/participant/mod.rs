//! Participants of a deliberation.
//!
//! - [`entities::Participant`]: a human or model-backed debate entity
//! - [`model_config::ModelConfig`]: provider, model and sampling settings

pub mod entities;
pub mod model_config;
