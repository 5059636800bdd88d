use clap::Parser;
use oco_sentinel::cli::{Cli, Commands};
use oco_sentinel::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    oco_sentinel::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Compute(args) => {
            args.execute(&config).await?;
        }
        Commands::Shape(args) => {
            args.execute().await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Policy: strict={}, risk_fraction={}, sl_pips={}..{}",
                config.policy.strict_protection,
                config.policy.risk_fraction,
                config.policy.min_sl_pips,
                config.policy.max_sl_pips
            );
            println!(
                "  Watchdog: heartbeat={}s, sl_immutable={}, allow_tp_remove={}",
                config.watchdog.heartbeat_secs,
                config.watchdog.sl_immutable,
                config.watchdog.allow_tp_remove
            );
            println!(
                "  Guardian: heartbeat={}s, trail@{}p step={}p giveback={}p, stale_kill={}m",
                config.guardian.heartbeat_secs,
                config.guardian.trail_activation_pips,
                config.guardian.trail_step_pips,
                config.guardian.max_giveback_pips,
                config.guardian.stale_kill_minutes
            );
        }
    }

    Ok(())
}
