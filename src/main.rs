//! EcoOptima - urban-forestry planning assistant
//!
#![doc = "Main entry point for the EcoOptima server and CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ecooptima::cli::{Cli, Commands};
use ecooptima::commands;
use ecooptima::config::{Config, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; the log level lives there, so warnings raised while
    // loading go through a warn-level bootstrap subscriber
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        Config::load(config_path, &cli)
    })?;

    init_tracing(&config.logging, cli.verbose);

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting web server on {}", config.server.bind);
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Analyze { text, workflow } => {
            tracing::info!("Starting one-shot analysis");
            tracing::debug!("Workflow: {}", workflow);
            commands::analyze::run_analyze(config, text, workflow).await?;
            Ok(())
        }
        Commands::Chart {
            input,
            kind,
            output_dir,
        } => {
            tracing::debug!("Rendering chart from {}", input.display());
            commands::chart::run_chart(input, kind.into(), output_dir)?;
            Ok(())
        }
    }
}

/// Subscriber active until the configured one is installed
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("ecooptima=warn"))
        .with_writer(std::io::stderr)
        .finish()
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins; otherwise `--verbose` selects debug and the configured
/// level applies.
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ecooptima={},tower_http={}", level, level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
