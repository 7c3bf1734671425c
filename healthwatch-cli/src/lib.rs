//! CLI/config/output/TUI collaborators for the `healthwatch` binary,
//! exposed as a library so integration tests can drive each command
//! in-process instead of spawning the compiled binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod signals;
pub mod tui;
