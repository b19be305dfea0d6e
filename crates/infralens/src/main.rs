//! InfraLens CLI - zero-shot triage of infrastructure-maintenance photos.
//!
//! Every photo is sorted into one of three outcomes: unrelated to
//! infrastructure, low confidence, or a maintenance category such as a leak,
//! a crack or exposed wiring.
//!
//! # Usage
//!
//! ```bash
//! # Download the CLIP model once
//! infralens models download
//!
//! # Classify a single photo
//! infralens classify leak.jpg
//!
//! # Classify a directory
//! infralens classify ./reports/ --output results.jsonl --format jsonl
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// InfraLens - zero-shot triage of infrastructure-maintenance photos.
#[derive(Parser, Debug)]
#[command(name = "infralens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify photos as unrelated, low confidence or a maintenance category
    Classify(cli::classify::ClassifyArgs),

    /// Manage the CLIP model files (download, list, verify)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match infralens_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `infralens config path`."
            );
            infralens_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("InfraLens v{}", infralens_core::VERSION);

    match cli.command {
        Commands::Classify(args) => cli::classify::execute(args).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_classify_with_global_flags() {
        let cli = Cli::try_parse_from([
            "infralens",
            "classify",
            "photos/",
            "--format",
            "jsonl",
            "--skip-existing",
            "-o",
            "out.jsonl",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Classify(args) => {
                assert!(args.skip_existing);
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out.jsonl")));
            }
            other => panic!("expected classify, got {other:?}"),
        }
    }
}
