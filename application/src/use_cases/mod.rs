//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod beadify;
pub mod run_deliberation;
