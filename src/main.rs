mod app;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yieldwatch::shared::config::{Config, FeedSourceKind};

#[derive(Parser, Debug)]
#[command(version, about = "DeFi yield aggregator with a live push feed and advisory agent")]
struct Args {
    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(long)]
    bind: Option<String>,

    /// Push feed period in seconds (overrides config)
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Push feed record source (overrides config)
    #[arg(long, value_enum)]
    feed_source: Option<FeedSourceKind>,

    /// Disable the push feed scheduler
    #[arg(long)]
    no_broadcast: bool,

    /// Do not replay the last event to new subscribers
    #[arg(long)]
    no_replay: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Priority: CLI args > Config file > Defaults
    let mut cfg = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path))?,
        None => Config::default(),
    };

    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    if let Some(interval) = args.interval_secs {
        cfg.broadcast.interval_secs = interval;
    }
    if let Some(source) = args.feed_source {
        cfg.broadcast.source = source;
    }
    if args.no_broadcast {
        cfg.broadcast.enabled = false;
    }
    if args.no_replay {
        cfg.broadcast.replay_on_connect = false;
    }

    app::run(cfg.with_env_credentials()).await
}
