//! Port definitions (interfaces for external dependencies)

pub mod events;
pub mod llm_adapter;
