//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// redirectpizza - Declarative redirect.pizza redirect manager.
#[derive(Parser, Debug)]
#[command(name = "redirectpizza")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest file.
    #[arg(short, long, global = true, env = "REDIRECTPIZZA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the state file [default: $REDIRECTPIZZA_STATE or the manifest's state.path,
    /// relative to the manifest].
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// API token [default: $REDIRECTPIZZA_API_TOKEN].
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// API base URL override [default: $REDIRECTPIZZA_API_BASE_URL or the manifest's
    /// provider.api_base_url].
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the manifest without contacting the API.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show what apply would change.
    Plan,

    /// Create, update and delete redirects to match the manifest.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Continue on errors.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Re-read tracked redirects and report drift.
    Refresh,

    /// Start tracking an existing remote redirect.
    Import {
        /// Local name, as declared in the manifest.
        name: String,

        /// Remote redirect id.
        id: String,
    },

    /// Show tracked redirects.
    Show {
        /// Only show this redirect.
        name: Option<String>,
    },

    /// Delete tracked redirects.
    Destroy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Only destroy this redirect.
        name: Option<String>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply_flags() {
        let cli = Cli::try_parse_from([
            "redirectpizza",
            "apply",
            "--yes",
            "--continue-on-error",
            "--output",
            "json",
            "--state",
            "custom.json",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.state, Some(PathBuf::from("custom.json")));
        assert!(matches!(
            cli.command,
            Commands::Apply { yes: true, continue_on_error: true }
        ));
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from(["redirectpizza", "import", "blog", "4711"])
            .expect("arguments should parse");

        match cli.command {
            Commands::Import { name, id } => {
                assert_eq!(name, "blog");
                assert_eq!(id, "4711");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_env_backed_settings_are_not_read_by_clap() {
        use clap::CommandFactory;
        let command = Cli::command();
        for id in ["state", "token", "api_base_url"] {
            let arg = command
                .get_arguments()
                .find(|a| a.get_id() == id)
                .expect("argument should exist");
            assert!(arg.get_env().is_none(), "{id} should be resolved after .env loading");
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
