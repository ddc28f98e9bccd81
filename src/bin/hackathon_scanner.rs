use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use listing_scanner::alerts::{LogNotifier, Notifier};
use listing_scanner::api::{ListingClient, PageSource};
use listing_scanner::commands::CommandListener;
use listing_scanner::config::{AppConfig, CONFIG_PATH};
use listing_scanner::monitor::Monitor;
use listing_scanner::proxy::ProxyRotator;
use listing_scanner::scanner::Scanner;
use listing_scanner::state::SharedState;
use listing_scanner::telegram::TelegramClient;

#[derive(Parser)]
#[command(
    name = "hackathon-scanner",
    about = "Watch the pump.fun listing for newly-flagged hackathon coins"
)]
struct Args {
    /// Path to the TOML config file (optional; defaults apply when missing)
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Override the poll interval in seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Ignore configured proxies and fetch every page directly
    #[arg(long)]
    direct: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)?;
    config.apply_env();
    if let Some(secs) = args.poll_interval {
        config.scan.poll_interval_secs = secs;
    }

    let proxies = if args.direct {
        Vec::new()
    } else {
        config.proxies.resolve()
    };
    let rotator = Arc::new(ProxyRotator::new(proxies));
    let source = Arc::new(ListingClient::new(&config.scan, rotator)?);

    let offsets = config.scan.page_offsets();
    let state = Arc::new(SharedState::new(
        config.telegram.chat_id.clone(),
        source.proxy_count(),
    ));

    info!("Pump.fun Hackathon Scanner");
    info!(
        "Monitoring top {} coins, {} pages of {}, poll every {}s, timeout {}s",
        config.scan.total_items,
        offsets.len(),
        config.scan.effective_page_size(),
        config.scan.poll_interval().as_secs(),
        config.scan.request_timeout().as_secs(),
    );
    if source.proxy_count() > 0 {
        info!("Proxies: {} loaded", source.proxy_count());
    } else {
        info!("Proxies: none (direct mode)");
    }

    let scanner = Scanner::new(source, offsets, state.clone());
    let period = config.scan.poll_interval();

    if config.telegram.is_enabled() {
        let client = TelegramClient::new(&config.telegram)?;
        info!(
            "Telegram: alerts -> {:?}, commands: /chatid /setalert /status /help",
            config.telegram.chat_id
        );
        tokio::spawn(CommandListener::new(client.clone(), state.clone()).run());
        run(Monitor::new(scanner, client, state, period)).await;
    } else {
        warn!("TELEGRAM_BOT_TOKEN not set; alerts go to the log only");
        run(Monitor::new(scanner, LogNotifier, state, period)).await;
    }

    Ok(())
}

async fn run<S: PageSource, N: Notifier>(monitor: Monitor<S, N>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = monitor.run() => {}
    }
}
