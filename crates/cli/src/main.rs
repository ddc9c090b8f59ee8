use std::path::PathBuf;

use ai_file_organizer::commands::{
    inspect_command, labels_command, organize_command, prompt_command, ConfigSource, OrganizeArgs,
};
use ai_file_organizer::env_lookup;
use ai_file_organizer::logging::init_logger;
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use organizer_core::config::AppConfig;

/// Sort files into folders named after categories picked by a language model.
///
/// This CLI is a thin wrapper around `organizer-core` (exposed in code as
/// `organizer_core`). All substantive logic lives in the library so it can be
/// tested without a network and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "ai-file-organizer",
    version,
    about = "Organize files into categories chosen by a language model",
    long_about = None
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to this file (defaults to LOG_FILE_PATH when set).
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every file in the input folder and move it into
    /// `<output>/<Category>[/<Sub>]/`.
    ///
    /// Settings come from arguments, then the config file, then environment
    /// variables. With `--continuous` the folder is organized again every
    /// `--interval` seconds.
    Organize {
        #[command(flatten)]
        source: ConfigSource,

        #[command(flatten)]
        args: OrganizeArgs,
    },

    /// Show the metadata the organizer extracts from a file.
    Inspect {
        /// File to inspect.
        #[arg(long)]
        path: PathBuf,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Include a SHA-256 digest.
        #[arg(long, default_value_t = false)]
        sha256: bool,
    },

    /// Validate the configured labels and list the answers the model may give.
    Labels {
        #[command(flatten)]
        source: ConfigSource,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the prompt that would be sent to the model for a file.
    Prompt {
        /// File to build the prompt for.
        #[arg(long)]
        path: PathBuf,

        #[command(flatten)]
        source: ConfigSource,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _guard = init_logger(cli.log_level.as_deref(), cli.log_file.as_deref());

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Organize { source, args } => {
            let config = source.resolve(args.overrides(), env_lookup)?;
            organize_command(&config, args.sha256, env_lookup)?;
        }
        Command::Inspect { path, json, sha256 } => inspect_command(&path, json, sha256)?,
        Command::Labels { source, json } => {
            let config = source.resolve(AppConfig::default(), env_lookup)?;
            labels_command(&config, json)?;
        }
        Command::Prompt { path, source } => {
            let config = source.resolve(AppConfig::default(), env_lookup)?;
            prompt_command(&config, &path)?;
        }
    }

    Ok(())
}
