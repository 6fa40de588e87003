// src/bin/gold_cli.rs
use anyhow::Context;
use clap::{Parser, Subcommand};
use gold_market_analyzer::{AnalyzerConfig, GoldMarketAnalyzer};
use serde::Serialize;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gold-cli")]
#[command(about = "Gold, coin and gold ETF snapshot with bubble analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extra extraction passes after a failed one
    #[arg(long, global = true)]
    retries: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reference prices and coin quotes from the price board
    Prices,
    /// Gold fund roster
    Funds,
    /// Gold ETF bubble analysis
    Etf {
        /// Print a snapshot every SECS seconds, reusing it while fresh
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },
    /// Coins, raw gold and tokens ranked by premium
    Overview {
        /// Print a snapshot every SECS seconds, reusing it while fresh
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = AnalyzerConfig::from_env().context("loading configuration")?;
    if let Some(retries) = cli.retries {
        config.extraction_retries = retries;
    }
    let analyzer = GoldMarketAnalyzer::from_config(config).context("building HTTP clients")?;

    match cli.command {
        Commands::Prices => print_json(analyzer.fetch_price_board().await),
        Commands::Funds => print_json(Some(analyzer.discover_funds().await)),
        Commands::Etf { watch: None } => print_json(analyzer.get_analysis().await),
        Commands::Etf { watch: Some(secs) } => {
            let cache = analyzer.snapshot_cache();
            loop {
                report(analyzer.get_analysis_cached(&cache).await)?;
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
        }
        Commands::Overview { watch: None } => print_json(analyzer.market_overview().await),
        Commands::Overview { watch: Some(secs) } => {
            let cache = analyzer.snapshot_cache();
            loop {
                report(analyzer.market_overview_cached(&cache).await)?;
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
        }
    }
}

/// One-shot output: exit code 2 when there is no data this cycle.
fn print_json<T: Serialize>(result: Option<T>) -> anyhow::Result<()> {
    if !report(result)? {
        std::process::exit(2);
    }
    Ok(())
}

fn report<T: Serialize>(result: Option<T>) -> anyhow::Result<bool> {
    match result {
        Some(value) => {
            let json = serde_json::to_string_pretty(&value).context("serializing result")?;
            println!("{}", json);
            Ok(true)
        }
        None => {
            eprintln!("⚠️  No data this cycle, try again later");
            Ok(false)
        }
    }
}
