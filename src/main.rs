use clap::Parser;
use orderbook_sync::cli::{Cli, Commands};
use orderbook_sync::config::Config;

const DEFAULT_CONFIG: &str = include_str!("../config.toml.example");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(DEFAULT_CONFIG)
                .map_err(|e| anyhow::anyhow!("Invalid default config: {}", e))?
        }
    };
    config.apply_env_overrides();

    // Initialize telemetry
    let _telemetry = orderbook_sync::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(channel = %config.feed.channel, "Starting live book");
            args.execute(&config).await?;
        }
        Commands::Replay(args) => {
            tracing::info!(file = %args.file.display(), "Starting replay");
            args.execute(&config).await?;
        }
        Commands::Config => {
            let mut shown = config.clone();
            if shown.feed.token.is_some() {
                shown.feed.token = Some("********".to_string());
            }
            println!("Current configuration:");
            print!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}
