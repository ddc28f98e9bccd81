use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed pool of egress proxies handed out in round-robin order.
///
/// The pool never changes after construction. A bad proxy keeps its slot; callers
/// fall back to a direct request when it fails.
#[derive(Debug, Default)]
pub struct ProxyRotator {
    endpoints: Vec<String>,
    cursor: AtomicU64,
}

impl ProxyRotator {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            cursor: AtomicU64::new(0),
        }
    }

    /// Next endpoint, or `None` when the pool is empty (use a direct connection).
    ///
    /// Each call claims a distinct cursor slot, so concurrent callers never share one.
    pub fn next(&self) -> Option<&str> {
        if self.endpoints.is_empty() {
            return None;
        }
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed);
        let idx = (slot % self.endpoints.len() as u64) as usize;
        Some(self.endpoints[idx].as_str())
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Proxy URL for an endpoint. Bare `host:port` entries are HTTP proxies.
pub fn proxy_url(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}
