use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

use crate::LISTING_ORIGIN;
use crate::config::ScanConfig;
use crate::proxy::{ProxyRotator, proxy_url};
use crate::types::{FetchError, Item, PageOutcome, Route};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

/// Anything that can produce one page of listing items.
///
/// Implementations never fail the caller: every outcome, good or bad, is a `PageOutcome`.
pub trait PageSource: Send + Sync + 'static {
    fn fetch_page(&self, page: usize, offset: usize) -> impl Future<Output = PageOutcome> + Send;

    /// Number of egress proxies this source rotates through.
    fn proxy_count(&self) -> usize {
        0
    }
}

/// Fetches listing pages through the proxy pool, falling back to a direct request once.
pub struct ListingClient {
    endpoint: Url,
    page_size: usize,
    sort: String,
    order: String,
    include_nsfw: bool,
    direct: Client,
    /// Pre-built client per proxy endpoint.
    proxied: HashMap<String, Client>,
    rotator: Arc<ProxyRotator>,
}

impl ListingClient {
    pub fn new(scan: &ScanConfig, rotator: Arc<ProxyRotator>) -> Result<Self> {
        let endpoint = Url::parse(&scan.listing_url)
            .with_context(|| format!("invalid listing url {}", scan.listing_url))?;

        let direct = base_builder(scan)
            .no_proxy()
            .build()
            .context("failed to build direct HTTP client")?;

        let mut proxied = HashMap::new();
        for entry in rotator.endpoints() {
            match build_proxied(scan, entry) {
                Ok(client) => {
                    proxied.insert(entry.clone(), client);
                }
                Err(e) => warn!("Proxy {entry} unusable, its slots go direct: {e:#}"),
            }
        }

        Ok(Self {
            endpoint,
            page_size: scan.effective_page_size(),
            sort: scan.sort.clone(),
            order: scan.order.clone(),
            include_nsfw: scan.include_nsfw,
            direct,
            proxied,
            rotator,
        })
    }

    /// Request URL for the page starting at `offset`.
    pub fn page_url(&self, offset: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("sort", &self.sort)
            .append_pair("includeNsfw", if self.include_nsfw { "true" } else { "false" })
            .append_pair("order", &self.order);
        url
    }

    /// Fetch one page. See [`PageSource`].
    pub async fn fetch(&self, page: usize, offset: usize) -> PageOutcome {
        let url = self.page_url(offset);
        let assigned = self
            .rotator
            .next()
            .and_then(|p| self.proxied.get(p).map(|client| (p, client)));

        let (resp, route) = match assigned {
            Some((proxy, client)) => match client.get(url.clone()).send().await {
                Ok(resp) => (resp, Route::Proxy(proxy.to_string())),
                Err(e) => {
                    debug!("Page {page} via {proxy} failed ({e}), retrying direct");
                    match self.direct.get(url).send().await {
                        Ok(resp) => (resp, Route::DirectFallback(proxy.to_string())),
                        Err(e) => return failed(page, offset, FetchError::Transport(e.to_string())),
                    }
                }
            },
            None => match self.direct.get(url).send().await {
                Ok(resp) => (resp, Route::Direct),
                Err(e) => return failed(page, offset, FetchError::Transport(e.to_string())),
            },
        };

        match decode_items(resp).await {
            Ok(items) => PageOutcome::Fetched {
                page,
                offset,
                items,
                route,
            },
            Err(error) => failed(page, offset, error),
        }
    }
}

impl PageSource for ListingClient {
    fn fetch_page(
        &self,
        page: usize,
        offset: usize,
    ) -> impl Future<Output = PageOutcome> + Send {
        self.fetch(page, offset)
    }

    fn proxy_count(&self) -> usize {
        self.rotator.len()
    }
}

fn failed(page: usize, offset: usize, error: FetchError) -> PageOutcome {
    PageOutcome::Failed {
        page,
        offset,
        error,
    }
}

async fn decode_items(resp: Response) -> std::result::Result<Vec<Item>, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = resp
        .bytes()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::ORIGIN, HeaderValue::from_static(LISTING_ORIGIN));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));
    headers
}

fn base_builder(scan: &ScanConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(scan.request_timeout())
        .user_agent(USER_AGENT)
        .default_headers(default_headers())
}

fn build_proxied(scan: &ScanConfig, endpoint: &str) -> Result<Client> {
    let proxy = reqwest::Proxy::all(proxy_url(endpoint))
        .with_context(|| format!("invalid proxy {endpoint}"))?;
    base_builder(scan)
        .proxy(proxy)
        .build()
        .context("failed to build proxied HTTP client")
}
