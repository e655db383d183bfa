//! Bead domain
//!
//! Atomic tasks extracted from a consensus, the rules that make a task
//! atomic, reply parsing and the tracker/spec-file renderers.

pub mod parsing;
pub mod render;
pub mod task;
pub mod validation;

pub use parsing::{BeadReply, parse_bead_reply};
pub use render::{SpecFile, render_spec_files, render_tracker_commands, slugify};
pub use task::{BeadTask, BeadType, Priority};
pub use validation::{ValidationIssue, is_valid, validate_task};
