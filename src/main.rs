//! Prediction-market arbitrage engine entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use arbscan::api::{create_router, AppState};
use arbscan::config::Config;
use arbscan::market::{GammaMarketSource, MarketSource};
use arbscan::metrics;
use arbscan::notify::{NotificationDispatcher, WebhookEmailSink};
use arbscan::scan::{InMemoryScanStore, ScanOrchestrator, ScanStore};
use arbscan::scoring::InMemoryFeedbackStore;
use arbscan::trade::{ApiCredential, HttpTradeClient, TradeApi, TradeExecutor, TradeTarget};
use arbscan::utils::shutdown_signal;
use arbscan::watchlist::WatchlistTracker;

/// Prediction-market arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "arbscan")]
#[command(about = "Finds and trades price gaps between equivalent prediction markets")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port for health/status.
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scan scheduler and HTTP server (default).
    Run {
        /// HTTP server port for health/status.
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Run a single scan and print surfaced opportunities.
    Scan,

    /// Place a trade batch.
    Trade {
        /// Trade venue API key.
        #[arg(long, env = "TRADE_API_KEY")]
        key: String,

        /// Total capital for the batch.
        #[arg(long)]
        capital: Decimal,

        /// Targets as market_id=allocation_percent[=label], repeatable.
        /// The label identifies the market in failure reports and
        /// defaults to the market id.
        #[arg(long = "target", required = true)]
        targets: Vec<String>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Verify a trade venue API key.
    VerifyKey {
        /// Trade venue API key.
        #[arg(long, env = "TRADE_API_KEY")]
        key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("arbscan=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Scan) => cmd_scan().await,
        Some(Command::Trade {
            key,
            capital,
            targets,
        }) => cmd_trade(key, capital, targets).await,
        Some(Command::VerifyKey { key }) => cmd_verify_key(key).await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(args.port).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
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

    println!("Market API: {}", config.market_api_url);
    println!("Trade API: {}", config.trade_api_url);
    println!("Profit floor: ${}", config.min_profit_floor);
    println!("Scan interval: {}s", config.scan_interval_secs);
    Ok(())
}

/// Run a single scan and print the surfaced opportunities.
async fn cmd_scan() -> anyhow::Result<()> {
    let config = load_validated_config()?;
    let engine = Engine::new(config);

    let report = engine.orchestrator.run_scan(&engine.config.user_id).await?;

    println!(
        "Scanned {} markets, found {} opportunities ({} high confidence)",
        report.run.markets_scanned,
        report.run.opportunities_found,
        report.run.high_confidence_count
    );
    for pair in &report.pairs {
        println!(
            "  [{}] ${:.2}  {}  <->  {}",
            pair.confidence, pair.expected_profit, pair.market1.question, pair.market2.question
        );
    }
    Ok(())
}

/// Place a trade batch from CLI targets.
async fn cmd_trade(key: String, capital: Decimal, raw_targets: Vec<String>) -> anyhow::Result<()> {
    let config = load_validated_config()?;

    let targets = raw_targets
        .iter()
        .map(|raw| parse_target(raw))
        .collect::<anyhow::Result<Vec<TradeTarget>>>()?;

    let executor = TradeExecutor::new(Arc::new(HttpTradeClient::new(&config)), config);
    let result = executor
        .execute(&ApiCredential::new(key), capital, &targets)
        .await?;

    println!(
        "Executed {}/{} trades ({} skipped)",
        result.trades_executed, result.requested_count, result.skipped
    );
    for err in &result.errors {
        println!("  FAILED: {}", err);
    }
    if result.errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} trades failed", result.errors.len()))
    }
}

/// Verify a trade venue API key.
async fn cmd_verify_key(key: String) -> anyhow::Result<()> {
    let config = load_validated_config()?;
    let venue = HttpTradeClient::new(&config);

    match venue.verify_credential(&ApiCredential::new(key)).await {
        Ok(account) => {
            println!("Key OK: {} (balance {})", account.username, account.balance);
            Ok(())
        }
        Err(e) => {
            println!("Key rejected: {}", e);
            Err(anyhow::anyhow!("Key verification failed"))
        }
    }
}

/// Shared engine wiring for long-running and one-shot commands.
struct Engine {
    config: Config,
    orchestrator: ScanOrchestrator,
    dispatcher: Arc<NotificationDispatcher>,
    watchlist: Arc<WatchlistTracker>,
    scans: Arc<InMemoryScanStore>,
}

impl Engine {
    fn new(config: Config) -> Self {
        let source: Arc<dyn MarketSource> = Arc::new(GammaMarketSource::new(&config));
        let feedback = Arc::new(InMemoryFeedbackStore::new());
        let scans = Arc::new(InMemoryScanStore::new());
        let watchlist = Arc::new(WatchlistTracker::new());

        let mut dispatcher = NotificationDispatcher::new(&config);
        if let (Some(url), Some(to)) = (&config.email_webhook_url, &config.notification_email) {
            dispatcher =
                dispatcher.with_email(Arc::new(WebhookEmailSink::new(url.clone())), to.clone());
        }
        let dispatcher = Arc::new(dispatcher);

        let orchestrator = ScanOrchestrator::new(
            source,
            feedback,
            Arc::clone(&scans) as Arc<dyn ScanStore>,
            Arc::clone(&dispatcher),
            config.clone(),
        )
        .with_watchlist(Arc::clone(&watchlist));

        Self {
            config,
            orchestrator,
            dispatcher,
            watchlist,
            scans,
        }
    }
}

/// Run the scan scheduler and HTTP server.
async fn cmd_run(port: u16) -> anyhow::Result<()> {
    let config = load_validated_config()?;
    info!("Configuration loaded");
    info!("Market API: {}", config.market_api_url);
    info!("Scan interval: {}s", config.scan_interval_secs);

    // Prometheus exporter on its default listener.
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        warn!("Prometheus exporter not started: {}", e);
    }

    let engine = Engine::new(config);

    let app_state = AppState::new(
        engine.config.user_id.clone(),
        Arc::clone(&engine.dispatcher),
        Arc::clone(&engine.watchlist),
        Arc::clone(&engine.scans) as Arc<dyn ScanStore>,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    info!("Starting scan scheduler...");
    let mut ticker =
        tokio::time::interval(Duration::from_secs(engine.config.scan_interval_secs));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.orchestrator.run_scan(&engine.config.user_id).await {
                    Ok(report) => {
                        app_state.set_ready(true);
                        info!(
                            scan_id = %report.run.id,
                            opportunities = report.run.opportunities_found,
                            "Scheduled scan finished"
                        );
                    }
                    Err(e) => {
                        error!("Scheduled scan failed: {}", e);
                        app_state.set_ready(false);
                    }
                }
            }
            _ = shutdown_signal() => {
                info!("Stopping scan scheduler");
                break;
            }
        }
    }

    server.abort();
    Ok(())
}

/// Parse one `--target` value: `market_id=percent[=label]`. The label
/// identifies the market in failure reports; without one the id stands in.
fn parse_target(raw: &str) -> anyhow::Result<TradeTarget> {
    let mut parts = raw.splitn(3, '=');
    let market_id = parts
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| anyhow::anyhow!("target '{raw}' has no market id"))?;
    let percent = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("target '{raw}' is not market_id=percent[=label]"))?;
    let allocation_percent: Decimal = percent
        .parse()
        .map_err(|e| anyhow::anyhow!("bad allocation in '{raw}': {e}"))?;
    let question = parts.next().unwrap_or(market_id);

    Ok(TradeTarget {
        market_id: market_id.to_string(),
        question: question.to_string(),
        allocation_percent,
    })
}

fn load_validated_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!(e)
    })?;
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }
    Ok(config)
}
