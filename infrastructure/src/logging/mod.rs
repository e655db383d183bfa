//! Logging infrastructure: structured event logging.
//!
//! Provides [`JsonlEventLogger`], a JSONL file writer fed from the
//! orchestrator's broadcast channel.

mod jsonl_logger;

pub use jsonl_logger::JsonlEventLogger;
