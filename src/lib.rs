pub mod alerts;
pub mod api;
pub mod commands;
pub mod config;
pub mod monitor;
pub mod proxy;
pub mod reporter;
pub mod scanner;
pub mod state;
pub mod telegram;
pub mod tracker;
pub mod types;

/// Pump.fun frontend listing endpoint (public, no auth required)
pub const LISTING_API_URL: &str = "https://frontend-api-v3.pump.fun/coins";

/// Public coin page, suffixed with the mint address
pub const COIN_PAGE_BASE: &str = "https://pump.fun/coin";

/// Origin header the listing API expects from browser clients
pub const LISTING_ORIGIN: &str = "https://pump.fun";

/// Telegram Bot API base URL
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
