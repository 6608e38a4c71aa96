//! Uniswap V3 pool arbitrage scanner entry point.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pool_arb::api::{create_router, AppState};
use pool_arb::arbitrage::{run_scan, Opportunity, ScanReport};
use pool_arb::config::Config;
use pool_arb::market::{short_address, Snapshot};
use pool_arb::metrics;
use pool_arb::utils::shutdown_signal;

/// Uniswap V3 pool arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "pool-arb")]
#[command(about = "Detect direct and cycle arbitrage across Uniswap V3 pool snapshots")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan one snapshot file and print the opportunities.
    Scan {
        /// Snapshot JSON file ({ tokens, quotes }).
        #[arg(short, long, env = "SNAPSHOT_PATH")]
        snapshot: PathBuf,

        /// Override slippage tolerance (0.005 = 0.5%).
        #[arg(long)]
        slippage: Option<Decimal>,

        /// Override minimum profit margin (0.001 = 0.1%).
        #[arg(long)]
        margin: Option<Decimal>,

        /// Override the longest cycle searched (3..=6).
        #[arg(long)]
        max_cycle_length: Option<usize>,

        /// Ignore pool fee tiers.
        #[arg(long)]
        fee_naive: bool,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve the scan API with health and metrics endpoints.
    Serve {
        /// HTTP server port (defaults to PORT or 8080).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging on stderr so `scan --json` output stays clean
    let filter = if args.verbose {
        EnvFilter::new("pool_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    match args.command {
        Command::CheckConfig => cmd_check_config(),
        Command::Scan {
            snapshot,
            slippage,
            margin,
            max_cycle_length,
            fee_naive,
            json,
        } => {
            let mut config = load_config()?;
            if let Some(slippage) = slippage {
                config.slippage_tolerance = slippage;
            }
            if let Some(margin) = margin {
                config.min_profit_margin = margin;
            }
            if let Some(length) = max_cycle_length {
                config.max_cycle_length = length;
            }
            if fee_naive {
                config.fee_aware = false;
            }
            cmd_scan(&config, snapshot, json)
        }
        Command::Serve { port } => {
            let mut config = load_config()?;
            if let Some(port) = port {
                config.port = port;
            }
            cmd_serve(config).await
        }
    }
}

/// Load and validate configuration.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("POOL ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Slippage Tolerance: {}", config.slippage_tolerance);
    println!("  Fee Aware: {}", config.fee_aware);
    match &config.gas_token {
        Some(token) => println!("  Gas Cost: {} (smallest units of {})", config.gas_cost, token),
        None => println!("  Gas Cost: {} (display units of the compared token)", config.gas_cost),
    }
    println!("  Max Cycle Length: {}", config.max_cycle_length);
    println!("  Min Profit Margin: {}", config.min_profit_margin);
    println!("  Max Paths Per Root: {}", config.max_paths_per_root);
    println!("  Port: {}", config.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Scan a snapshot file once.
fn cmd_scan(config: &Config, path: PathBuf, json: bool) -> anyhow::Result<()> {
    let snapshot = Snapshot::load(&path)?;
    let registry = snapshot.registry()?;

    info!(
        path = %path.display(),
        tokens = registry.len(),
        quotes = snapshot.quotes.len(),
        "Scanning snapshot"
    );
    let report = run_scan(&registry, &snapshot.quotes, &config.scan_config())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ScanReport) {
    let stats = &report.stats;
    println!("======================================================================");
    println!("SCAN REPORT");
    println!("======================================================================");
    println!(
        "Quotes: {} received, {} accepted, {} rejected",
        stats.quotes_received, stats.quotes_accepted, stats.quotes_rejected
    );
    println!("Graph: {} tokens, {} edges", stats.tokens, stats.edges);
    println!(
        "Searched: {} pairs, {} cycles ({} skipped) in {}ms",
        stats.pairs_scanned, stats.cycle_candidates, stats.candidates_skipped, stats.duration_ms
    );

    for rejection in &report.rejected {
        println!("  rejected #{} {}: {}", rejection.index, rejection.pool, rejection.reason);
    }

    println!("----------------------------------------------------------------------");
    if !report.has_opportunities() {
        println!("No arbitrage opportunities after fees, slippage and gas.");
    }
    for opportunity in report.opportunities() {
        print_opportunity(opportunity);
    }
    println!("======================================================================");
}

fn print_opportunity(opportunity: &Opportunity) {
    println!(
        "[{}] {}  gross {}  net {}  profit {}%",
        opportunity.kind,
        opportunity.tickers.join(" → "),
        opportunity.gross_rate.round_dp(8),
        opportunity.net_rate.round_dp(8),
        opportunity.profit_pct().round_dp(4),
    );
    for leg in &opportunity.legs {
        println!(
            "    {:<4} pool {} fee {}ppm  quoted {}  effective {}",
            leg.role,
            short_address(&leg.pool),
            leg.fee,
            leg.quoted_rate.round_dp(10),
            leg.effective_rate.round_dp(10),
        );
    }
}

/// Serve the HTTP API until shutdown.
async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    let handle = metrics::install_prometheus()?;
    let state = AppState::new(config.scan_config()).with_metrics(handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        max_cycle_length = config.max_cycle_length,
        fee_aware = config.fee_aware,
        "HTTP server listening"
    );

    let router = create_router(state.clone());
    state.set_ready(true);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
