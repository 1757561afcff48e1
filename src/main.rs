use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skyblock_planner::config::{Config, DEFAULT_CONFIG_PATH};
use skyblock_planner::estimate::{matching_auctions, matching_bins, Estimator};
use skyblock_planner::fetch::{download_snapshot, HttpPageSource};
use skyblock_planner::loader::SnapshotStore;
use skyblock_planner::shell::{format_coins, Shell};

#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Plan Skyblock purchases with auction house price estimates")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Load this user's list instead of asking
    #[arg(long)]
    user: Option<String>,

    /// Plain output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive purchase list (default)
    Shell,
    /// Download a fresh auction snapshot
    Download,
    /// Print AH and BIN estimates for an item from the stored snapshot
    Estimate { name: String },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    if cli.no_color || !config.use_color {
        colored::control::set_override(false);
    }

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            if let Some(mut shell) = Shell::new(config, cli.user)? {
                shell.run()?;
            }
        }
        Commands::Download => {
            config.require_market_search()?;
            let source = HttpPageSource::new(
                &config.base_url,
                config.api_key.clone(),
                Duration::from_millis(config.page_delay_ms),
            )?;
            let records = download_snapshot(&source)?;
            SnapshotStore::new(&config.data_dir).save(&records)?;
            println!("Stored {} auctions", records.len());
        }
        Commands::Estimate { name } => {
            config.require_market_search()?;
            let records = SnapshotStore::new(&config.data_dir).load()?;
            let auctions = matching_auctions(&records, &name, config.auction_sample).len();
            let bins = matching_bins(&records, &name, config.bin_sample).len();
            let est = Estimator::new(records, config.auction_sample, config.bin_sample);

            println!(
                "AH:  {} (from {} of {} ending-soon auctions)",
                format_coins(est.auction(&name).cost),
                auctions,
                config.auction_sample
            );
            println!(
                "BIN: {} (from {} of {} cheapest listings)",
                format_coins(est.bin(&name).cost),
                bins,
                config.bin_sample
            );
        }
    }

    Ok(())
}
