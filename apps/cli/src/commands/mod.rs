//! Command implementations for the Kiln CLI.

pub mod config;
pub mod job;
pub mod prepare;
pub mod rewrite;
pub mod types;
pub mod unpack;

pub use types::{ConfigCommand, JobCommand, RewriteCommand};
