use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{init_command, inspect_command, run_command};

#[derive(Parser, Debug)]
#[command(name = "injectscope")]
#[command(version, about, long_about = None)]
#[command(subcommand_required = true, arg_required_else_help = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug             Enable debug logging\n    INJECTSCOPE_RUNTIME=<cmd>  Override the configured runtime command")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single snippet class and print what it reported
    #[command(visible_alias = "r")]
    Run {
        /// Fully-qualified snippet class
        class: String,

        /// Arguments passed to the snippet
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Print the command line without executing it
        #[arg(short, long)]
        dry_run: bool,

        /// Label shown in progress output
        #[arg(short, long)]
        label: Option<String>,

        /// Config file to use instead of searching upwards from the current directory
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Run the context snippet for every active configured context
    #[command(visible_alias = "i")]
    Inspect {
        /// Config file to use instead of searching upwards from the current directory
        #[arg(short, long)]
        config: Option<String>,

        /// Also validate every module named by a configured context
        #[arg(short, long)]
        modules: bool,
    },
    /// Write a default .injectscope.json
    Init {
        /// Specify the current working directory
        #[arg(long)]
        cwd: Option<String>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

impl Commands {
    /// Execute the command
    pub fn execute(self) -> Result<()> {
        match self {
            Commands::Run {
                class,
                args,
                dry_run,
                label,
                config,
            } => run_command(&class, args, dry_run, label.as_deref(), config.as_deref()),
            Commands::Inspect { config, modules } => inspect_command(config.as_deref(), modules),
            Commands::Init { cwd, force } => init_command(cwd.as_deref(), force),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_keeps_hyphenated_snippet_args() {
        let cli = Cli::try_parse_from([
            "injectscope",
            "run",
            "--dry-run",
            "a.Snippet",
            "--verbose",
            "x",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                class,
                args,
                dry_run,
                ..
            } => {
                assert_eq!(class, "a.Snippet");
                assert_eq!(args, vec!["--verbose", "x"]);
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
