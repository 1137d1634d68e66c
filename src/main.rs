use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "realty-scout",
    version,
    about = "Monitors real estate listings and mails reports of new ones",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the config file setting
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the job on schedule, or once
    Run {
        /// Run a single job and exit
        #[arg(long, default_value = "false")]
        once: bool,
    },

    /// Create the listing database
    InitDb,

    /// Validate the configuration file and print a summary
    CheckConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let run_once = matches!(cli.command, Commands::Run { once: true });
    let config = match commands::load_config(&cli.config, run_once) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(cli.log_format.as_deref().unwrap_or("text"), "info", cli.verbose)?;
            tracing::error!(
                path = %cli.config.display(),
                error = %format!("{e:#}"),
                "Invalid configuration"
            );
            return Err(e);
        }
    };

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!(config = %cli.config.display(), "realty-scout starting");

    match cli.command {
        Commands::Run { .. } => commands::run(config).await?,
        Commands::InitDb => commands::init_db(&config)?,
        Commands::CheckConfig => commands::check_config(&config)?,
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new(format!("realty_scout=debug,{level}"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("realty_scout={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
