//! Prompt domain
//!
//! Templates for every round type and for the beadifier's task extraction.

mod template;

pub use template::{BeadPromptTemplate, RoundPromptTemplate};
