use clap::{Parser, Subcommand};

mod commands;

use commands::{CatchUpArgs, ParseSymbolArgs, RetryArgs, ServeArgs};
use trade_desk_core::{AppConfig, ConfigLoader};

#[derive(Parser)]
#[command(name = "trade-desk")]
#[command(about = "Budgeted order execution for market report recommendations", long_about = None)]
struct Cli {
    /// Config profile overlay (loads config/Config.{profile}.toml)
    #[arg(long, global = true, env = "TRADE_DESK_PROFILE")]
    profile: Option<String>,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP trigger endpoints
    Serve(ServeArgs),
    /// Purchase the latest market report
    Purchase,
    /// Purchase a report unless it already has recorded orders
    CatchUp(CatchUpArgs),
    /// Retry pending spread orders
    Retry(RetryArgs),
    /// Decode an OCC option symbol
    ParseSymbol(ParseSymbolArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    if let Commands::ParseSymbol(args) = &cli.command {
        return commands::run_parse_symbol(args);
    }

    let config = load_config(cli.profile.as_deref())?;

    match cli.command {
        Commands::Serve(args) => commands::run_serve(config, args).await?,
        Commands::Purchase => commands::run_purchase(config).await?,
        Commands::CatchUp(args) => commands::run_catch_up(config, args).await?,
        Commands::Retry(args) => commands::run_retry(config, args).await?,
        Commands::ParseSymbol(_) => {}
    }

    Ok(())
}

fn load_config(profile: Option<&str>) -> anyhow::Result<AppConfig> {
    let config = match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile)?,
        None => ConfigLoader::load()?,
    };
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}
