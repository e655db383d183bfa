//! Core domain concepts shared across all subdomains.
//!
//! - [`goal::Goal`]: the validated goal a session deliberates on
//! - [`error::DomainError`]: domain-level errors
//! - [`string`]: UTF-8 safe text helpers

pub mod error;
pub mod goal;
pub mod string;
