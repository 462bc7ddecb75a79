//! Hobart CLI binary.
//!
//! Runs backtests over local price files, paper rebalances against local or
//! Yahoo prices, and prints universe classifications.

use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use hobart::{
    Backtest, CycleOutcome, HobartConfig, PaperAccount, RebalanceReport, Rebalancer,
    allocation_table, summarize,
};
use hobart_data::{
    CsvFundamentals, CsvPriceLoader, PriceProvider, YahooQuoteProvider, gather_history,
};
use hobart_output::{ExportFormat, Exporter};
use hobart_portfolio::{UniverseBucket, UniverseBuckets, UniverseClassifier};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Calendar days of prices fetched to value a paper book.
const QUOTE_LOOKBACK_DAYS: i64 = 10;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: multi-factor equity portfolio engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the strategy over a local price file
    Backtest {
        /// Long-format price CSV (date,ticker,close)
        #[arg(long)]
        prices: PathBuf,

        /// Fundamentals CSV (ticker,market_cap,pe_ratio)
        #[arg(long)]
        fundamentals: PathBuf,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// First simulated day (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last simulated day (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Starting cash
        #[arg(long)]
        capital: Option<f64>,

        /// Write the allocation table here (.csv or .json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run one rebalance cycle against a paper account
    Rebalance {
        /// Tickers in the universe
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Fundamentals CSV (ticker,market_cap,pe_ratio)
        #[arg(long)]
        fundamentals: PathBuf,

        /// Price CSV to use instead of Yahoo Finance
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Cash in the paper account
        #[arg(long, default_value = "1000000")]
        cash: f64,

        /// Rebalance even when the current weights are in bounds
        #[arg(long)]
        force: bool,

        /// Capital to allocate when the account reports none
        #[arg(long)]
        fallback_capital: Option<f64>,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Cycle date (defaults to today, or the last date in --prices)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Classify tickers into constraint buckets
    Universe {
        /// Fundamentals CSV (ticker,market_cap,pe_ratio)
        #[arg(long)]
        fundamentals: PathBuf,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Backtest {
            prices,
            fundamentals,
            config,
            start,
            end,
            capital,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            config.backtest.start = start.or(config.backtest.start);
            config.backtest.end = end.or(config.backtest.end);
            if let Some(capital) = capital {
                config.backtest.initial_capital = capital;
            }
            run_backtest(&prices, &fundamentals, config, output.as_deref())?;
        }
        Commands::Rebalance {
            tickers,
            fundamentals,
            prices,
            cash,
            force,
            fallback_capital,
            config,
            as_of,
        } => {
            let mut config = load_config(config.as_deref())?;
            config.rebalance.force |= force;
            config.rebalance.fallback_capital = fallback_capital.or(config.rebalance.fallback_capital);
            run_rebalance(&tickers, &fundamentals, prices.as_deref(), cash, config, as_of).await?;
        }
        Commands::Universe {
            fundamentals,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            show_universe(&fundamentals, &config)?;
        }
        Commands::Config => {
            println!("{}", HobartConfig::default().to_json()?);
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> hobart::Result<HobartConfig> {
    match path {
        Some(path) => HobartConfig::load(path),
        None => Ok(HobartConfig::default()),
    }
}

fn run_backtest(
    prices: &Path,
    fundamentals: &Path,
    config: HobartConfig,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let history = CsvPriceLoader::open(prices)?.panel();
    let fundamentals = CsvFundamentals::open(fundamentals)?.snapshot().clone();
    println!(
        "Loaded {} tickers over {} trading days",
        history.tickers().len(),
        history.len()
    );

    let backtest = Backtest::new(history, fundamentals, config)?;
    print_buckets(backtest.buckets());

    let run = backtest.run();
    let pb = ProgressBar::new(run.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );

    let mut snapshots = Vec::with_capacity(run.len());
    for snapshot in run {
        pb.set_message(snapshot.date.to_string());
        pb.inc(1);
        snapshots.push(snapshot);
    }
    pb.finish_with_message(format!("Simulated {} days", snapshots.len()));

    let summary = summarize("hobart", &snapshots);
    println!();
    println!("{}", summary.to_ascii_table());

    if let Some(path) = output {
        let table = allocation_table(&snapshots);
        table.export_to_file(path, ExportFormat::from_path(path))?;
        println!("Wrote {} records to {}", table.len(), path.display());
    }

    Ok(())
}

async fn run_rebalance(
    tickers: &[String],
    fundamentals: &Path,
    prices: Option<&Path>,
    cash: f64,
    config: HobartConfig,
    as_of: Option<NaiveDate>,
) -> Result<(), Box<dyn std::error::Error>> {
    let fundamentals = CsvFundamentals::open(fundamentals)?;
    let (provider, as_of): (Box<dyn PriceProvider>, NaiveDate) = match prices {
        Some(path) => {
            let loader = CsvPriceLoader::open(path)?;
            let last = loader.panel().last_date();
            let as_of = as_of
                .or(last)
                .ok_or("price file has no observations")?;
            (Box::new(loader), as_of)
        }
        None => (
            Box::new(YahooQuoteProvider::new()?),
            as_of.unwrap_or_else(|| Utc::now().date_naive()),
        ),
    };

    // the paper book fills at the latest close it can see
    let start = as_of - Duration::days(QUOTE_LOOKBACK_DAYS);
    let (recent, _) = gather_history(provider.as_ref(), tickers, start, as_of).await;
    let account = PaperAccount::new(cash);
    account.set_prices(recent.latest_prices())?;

    let rebalancer = Rebalancer::new(config)?;
    let report = rebalancer
        .run(
            tickers,
            as_of,
            provider.as_ref(),
            &fundamentals,
            &account,
            &account,
        )
        .await?;

    print_report(&report);
    println!("Cash after fills: {:.2}", account.cash()?);
    Ok(())
}

fn show_universe(fundamentals: &Path, config: &HobartConfig) -> Result<(), Box<dyn std::error::Error>> {
    let fundamentals = CsvFundamentals::open(fundamentals)?;
    let classifier = UniverseClassifier::new(config.classifier.clone());
    let buckets = classifier.classify(fundamentals.snapshot());
    print_buckets(&buckets);

    let unclassified: Vec<&str> = fundamentals
        .snapshot()
        .keys()
        .filter(|t| buckets.bucket_of(t).is_none())
        .map(String::as_str)
        .collect();
    if !unclassified.is_empty() {
        println!("  {:<10} {}", "(none)", unclassified.join(", "));
    }
    Ok(())
}

fn print_buckets(buckets: &UniverseBuckets) {
    println!("Universe buckets:");
    for bucket in UniverseBucket::ALL {
        let members = buckets.members(bucket);
        let names: Vec<&str> = members.iter().map(String::as_str).collect();
        println!("  {:<10} {:>3}  {}", bucket.to_string(), members.len(), names.join(", "));
    }
}

fn print_report(report: &RebalanceReport) {
    println!("Rebalance as of {} (capital {:.2})", report.as_of, report.capital);
    match &report.outcome {
        CycleOutcome::InBounds => println!("  Weights in bounds, no orders"),
        CycleOutcome::Rebalanced { orders } => {
            println!("  Rebalanced with {} orders", orders.len());
        }
        CycleOutcome::Skipped(event) => println!("  Cycle skipped: {}", event),
    }

    if let Some(targets) = &report.targets {
        println!("Target weights:");
        for (ticker, weight) in targets.iter() {
            println!("  {:<8} {:>7.2}%", ticker, weight * 100.0);
        }
    }

    if !report.acks.is_empty() {
        println!("Orders:");
        for ack in &report.acks {
            let price = ack.fill_price.map_or_else(|| "-".to_string(), |p| format!("{:.2}", p));
            println!("  {:<10} {:<28} @ {}", ack.id, ack.order.to_string(), price);
        }
    }

    if !report.skipped.is_empty() {
        println!("Skipped:");
        for event in &report.skipped {
            println!("  {}", event);
        }
    }
}
