//! CLI module for the redirectpizza tool.
//!
//! This module provides the command-line interface for managing
//! redirect.pizza redirects from a manifest.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
