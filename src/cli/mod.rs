//! CLI module for the fnship deployment tool.
//!
//! This module provides the command-line interface for resolving and
//! deploying changed functions and mirroring the static bucket.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat, WindowArgs};
pub use output::OutputFormatter;
