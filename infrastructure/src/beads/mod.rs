//! Filesystem output for extracted tasks.

mod spec_writer;

pub use spec_writer::{SpecWriteError, write_spec_files};
