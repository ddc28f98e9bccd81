use std::sync::Arc;
use std::time::Duration;

use listing_scanner::api::ListingClient;
use listing_scanner::config::ScanConfig;
use listing_scanner::proxy::ProxyRotator;
use listing_scanner::types::{FetchError, PageOutcome, Route};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Nothing listens here, so connections are refused immediately.
const DEAD_ENDPOINT: &str = "127.0.0.1:1";

fn scan_config(listing_url: String) -> ScanConfig {
    ScanConfig {
        listing_url,
        page_size: 2,
        total_items: 4,
        request_timeout_secs: 2,
        ..Default::default()
    }
}

fn client(listing_url: String, proxies: &[&str]) -> ListingClient {
    let rotator = Arc::new(ProxyRotator::new(
        proxies.iter().map(|p| p.to_string()).collect(),
    ));
    ListingClient::new(&scan_config(listing_url), rotator).expect("client")
}

fn two_items() -> serde_json::Value {
    json!([
        {
            "mint": "MintA",
            "name": "Alpha",
            "symbol": "ALP",
            "is_hackathon": true,
            "usd_market_cap": 1500000.0,
            "twitter": "https://x.com/alpha",
            "website": ""
        },
        {
            "mint": "MintB",
            "name": "Beta",
            "symbol": "BET",
            "is_hackathon": false,
            "usd_market_cap": 900.5
        }
    ])
}

#[tokio::test]
async fn direct_fetch_parses_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins"))
        .and(query_param("offset", "2"))
        .and(query_param("limit", "2"))
        .and(query_param("sort", "market_cap"))
        .and(query_param("includeNsfw", "false"))
        .and(query_param("order", "DESC"))
        .and(header("origin", "https://pump.fun"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_items()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(format!("{}/coins", server.uri()), &[]);
    match client.fetch(1, 2).await {
        PageOutcome::Fetched {
            page,
            offset,
            items,
            route,
        } => {
            assert_eq!(page, 1);
            assert_eq!(offset, 2);
            assert_eq!(route, Route::Direct);
            assert_eq!(items.len(), 2);
            assert!(items[0].flagged);
            assert_eq!(items[0].website, None);
            assert!(!items[1].flagged);
        }
        other => panic!("expected items, got {other:?}"),
    }
}

#[tokio::test]
async fn direct_error_status_fails_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(format!("{}/coins", server.uri()), &[]);
    match client.fetch(0, 0).await {
        PageOutcome::Failed {
            error: FetchError::Status(code),
            ..
        } => assert_eq!(code, 429),
        other => panic!("expected status failure, got {other:?}"),
    }
}

#[tokio::test]
async fn proxied_error_status_is_not_retried_direct() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_items()))
        .expect(0)
        .mount(&upstream)
        .await;

    // The proxy answers for the upstream with a 503; that is a status failure,
    // not a transport one, so the direct path must stay untouched.
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&proxy)
        .await;

    let endpoint = proxy.address().to_string();
    let client = client(format!("{}/coins", upstream.uri()), &[&endpoint]);
    match client.fetch(0, 0).await {
        PageOutcome::Failed {
            error: FetchError::Status(code),
            ..
        } => assert_eq!(code, 503),
        other => panic!("expected status failure, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;

    let client = client(format!("{}/coins", server.uri()), &[]);
    assert!(matches!(
        client.fetch(0, 0).await,
        PageOutcome::Failed {
            error: FetchError::Decode(_),
            ..
        }
    ));
}

#[tokio::test]
async fn object_instead_of_list_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "nope" })))
        .mount(&server)
        .await;

    let client = client(format!("{}/coins", server.uri()), &[]);
    assert!(!client.fetch(0, 0).await.is_ok());
}

#[tokio::test]
async fn dead_proxy_falls_back_to_direct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_items()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(format!("{}/coins", server.uri()), &[DEAD_ENDPOINT]);
    match client.fetch(0, 0).await {
        PageOutcome::Fetched { items, route, .. } => {
            assert_eq!(route, Route::DirectFallback(DEAD_ENDPOINT.to_string()));
            assert_eq!(items.len(), 2);
        }
        other => panic!("expected fallback success, got {other:?}"),
    }
}

#[tokio::test]
async fn dead_proxy_and_dead_upstream_fail() {
    let client = client(format!("http://{DEAD_ENDPOINT}/coins"), &[DEAD_ENDPOINT]);
    assert!(matches!(
        client.fetch(0, 0).await,
        PageOutcome::Failed {
            error: FetchError::Transport(_),
            ..
        }
    ));
}

#[tokio::test]
async fn dead_upstream_without_proxy_fails() {
    let client = client(format!("http://{DEAD_ENDPOINT}/coins"), &[]);
    assert!(matches!(
        client.fetch(0, 0).await,
        PageOutcome::Failed {
            error: FetchError::Transport(_),
            ..
        }
    ));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(two_items())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let scan = ScanConfig {
        request_timeout_secs: 1,
        ..scan_config(format!("{}/coins", server.uri()))
    };
    let client = ListingClient::new(&scan, Arc::new(ProxyRotator::default())).expect("client");
    let started = std::time::Instant::now();
    assert!(matches!(
        client.fetch(0, 0).await,
        PageOutcome::Failed {
            error: FetchError::Transport(_),
            ..
        }
    ));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn live_proxy_serves_request() {
    // The mock server doubles as an HTTP forward proxy: requests reach it in absolute form.
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_items()))
        .expect(1)
        .mount(&proxy)
        .await;

    let endpoint = proxy.address().to_string();
    let client = client("http://listing.invalid/coins".to_string(), &[&endpoint]);
    match client.fetch(0, 0).await {
        PageOutcome::Fetched { route, items, .. } => {
            assert_eq!(route, Route::Proxy(endpoint));
            assert_eq!(items.len(), 2);
        }
        other => panic!("expected proxied success, got {other:?}"),
    }
}
