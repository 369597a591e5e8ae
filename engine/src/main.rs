// Scout lead research engine
// Main entry point for the scout binary

use clap::Parser;
use scout_engine::cli::{Cli, Command};
use scout_engine::config::Config;
use scout_engine::handlers::{
    error_hint, handle_connectors, handle_context, handle_doctor, handle_plan, handle_purge,
    handle_run, handle_secret, OutputFormat, RunArgs,
};
use scout_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the configured level; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Scout v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    let result = match cli.command {
        Command::Run {
            leads,
            campaign,
            output,
            csv,
            namespace,
            threshold,
            resolver,
            ephemeral,
        } => {
            tracing::info!("Running batch from {}", leads.display());
            let args = RunArgs {
                leads,
                campaign,
                output,
                csv,
                namespace,
                threshold,
                resolver,
                ephemeral,
            };
            handle_run(args, &config, format).await
        }

        Command::Plan { leads, campaign } => {
            tracing::info!("Planning batch from {}", leads.display());
            handle_plan(leads, campaign, &config, format).await
        }

        Command::Context {
            namespace,
            lead,
            company,
        } => handle_context(namespace, lead, company, &config, format).await,

        Command::Purge { namespace } => {
            tracing::info!("Purging namespace '{}'", namespace);
            handle_purge(namespace, &config, format).await
        }

        Command::Connectors => handle_connectors(&config, format).await,

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }

        Command::Secret { action } => handle_secret(action, format).await,
    };

    if let Err(err) = &result {
        if let Some(hint) = error_hint(err) {
            tracing::error!("{}", err);
            eprintln!("Hint: {}", hint);
        }
    }
    result
}
