//! probe_listing: one-shot check of the listing endpoint.
//!
//! Fetches a single page (direct, or through `--proxy`) and prints:
//! - Route taken and latency
//! - Item and flagged counts
//! - A sample item
//!
//! Useful for checking whether a proxy is alive or whether the upstream
//! changed its response shape.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use listing_scanner::api::ListingClient;
use listing_scanner::config::ScanConfig;
use listing_scanner::proxy::ProxyRotator;
use listing_scanner::types::PageOutcome;

#[derive(Parser)]
#[command(name = "probe_listing", about = "Fetch one listing page and describe it")]
struct Cli {
    /// Page offset
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Page size
    #[arg(long, default_value_t = 48)]
    limit: usize,

    /// Proxy endpoint (host:port or URL); direct when omitted
    #[arg(long)]
    proxy: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let scan = ScanConfig {
        page_size: cli.limit,
        ..Default::default()
    };
    let rotator = Arc::new(ProxyRotator::new(cli.proxy.into_iter().collect()));
    let client = ListingClient::new(&scan, rotator)?;

    println!("=== Probe: listing page ===");
    println!("URL: {}", client.page_url(cli.offset));
    println!();

    let start = Instant::now();
    let outcome = client.fetch(0, cli.offset).await;
    let latency = start.elapsed();

    match outcome {
        PageOutcome::Fetched { items, route, .. } => {
            let flagged = items.iter().filter(|i| i.flagged).count();
            println!("Route: {route:?}");
            println!("Latency: {latency:?}");
            println!("Items: {}", items.len());
            println!("Flagged: {flagged}");
            if let Some(first) = items.first() {
                println!("\nSample item (first):");
                println!("{}", serde_json::to_string_pretty(first)?);
            }
        }
        PageOutcome::Failed { error, .. } => {
            println!("Failed after {latency:?}: {error}");
        }
    }

    Ok(())
}
