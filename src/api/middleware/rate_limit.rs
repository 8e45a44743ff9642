//! Rate limiting middleware.
//!
//! Fixed-window limiter keyed by user id (when authenticated) or client IP.
//! Applied to the auth and payment scopes, which are the abuse surface of
//! this API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header::HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;

use super::auth::AuthExtension;

/// Rate limiter that tracks requests per key (IP or user ID).
#[derive(Debug)]
pub struct RateLimiter {
    /// Map of key -> (request count, window start time)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    /// Maximum number of requests allowed per window
    max_requests: u32,
    /// Duration of the rate limiting window
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Check if a request should be rate limited.
    ///
    /// Returns `Ok(remaining)` if allowed, or `Err(retry_after_secs)` if
    /// the limit has been exceeded.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, u64> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let entry = requests.entry(key.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) >= self.window {
            entry.0 = 1;
            entry.1 = now;
            return Ok(self.max_requests.saturating_sub(1));
        }

        if entry.0 >= self.max_requests {
            let retry_after = self.window.as_secs() - now.duration_since(entry.1).as_secs();
            return Err(retry_after.max(1));
        }

        entry.0 += 1;
        Ok(self.max_requests.saturating_sub(entry.0))
    }

    /// Drop expired windows so the map does not grow without bound.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window);
    }
}

/// Rate limiting middleware.
///
/// Returns 429 with a Retry-After header when the limit is exceeded.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    // Authenticated user id takes priority over the client IP
    let key = if let Some(auth) = request.extensions().get::<AuthExtension>() {
        format!("user:{}", auth.user_id)
    } else if let Some(Some(auth)) = request.extensions().get::<Option<AuthExtension>>() {
        format!("user:{}", auth.user_id)
    } else {
        extract_client_ip(&request)
    };

    match limiter.check_rate_limit(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;

            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&limiter.max_requests.to_string()) {
                headers.insert("X-RateLimit-Limit", value);
            }
            if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                headers.insert("X-RateLimit-Remaining", value);
            }

            response
        }
        Err(retry_after) => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again later.",
            )
                .into_response();

            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                headers.insert("Retry-After", value);
            }

            response
        }
    }
}

/// Extract the client IP address from the request.
///
/// Only the socket-level peer address (ConnectInfo) is used; proxy headers
/// like X-Forwarded-For are client-spoofable and not trusted.
fn extract_client_ip(request: &Request) -> String {
    if let Some(connect_info) = request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
    {
        return format!("ip:{}", connect_info.0.ip());
    }

    // All unauthenticated requests share one bucket when no peer address
    // is available; conservative but not bypassable via headers.
    "ip:unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_requests_within_limit() {
        let limiter = RateLimiter::new(5, 60);

        for i in 0..5 {
            let result = limiter.check_rate_limit("test_key").await;
            assert!(result.is_ok(), "Request {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn blocks_requests_over_limit() {
        let limiter = RateLimiter::new(3, 60);

        for _ in 0..3 {
            assert!(limiter.check_rate_limit("test_key").await.is_ok());
        }
        assert!(limiter.check_rate_limit("test_key").await.is_err());
    }

    #[tokio::test]
    async fn remaining_counts_down_to_zero() {
        let limiter = RateLimiter::new(3, 60);

        assert_eq!(limiter.check_rate_limit("k").await, Ok(2));
        assert_eq!(limiter.check_rate_limit("k").await, Ok(1));
        assert_eq!(limiter.check_rate_limit("k").await, Ok(0));
        assert!(limiter.check_rate_limit("k").await.is_err());
    }

    #[tokio::test]
    async fn retry_after_is_bounded_by_window() {
        let limiter = RateLimiter::new(1, 60);

        let _ = limiter.check_rate_limit("key").await;
        match limiter.check_rate_limit("key").await {
            Err(retry_after) => {
                assert!(retry_after >= 1 && retry_after <= 60);
            }
            Ok(_) => panic!("Expected rate limit error"),
        }
    }

    #[tokio::test]
    async fn tracks_separate_keys() {
        let limiter = RateLimiter::new(2, 60);

        for _ in 0..2 {
            let _ = limiter.check_rate_limit("key1").await;
        }
        assert!(limiter.check_rate_limit("key1").await.is_err());
        assert!(limiter.check_rate_limit("key2").await.is_ok());
    }

    #[tokio::test]
    async fn window_reset_allows_requests_again() {
        let limiter = RateLimiter::new(1, 1);

        assert!(limiter.check_rate_limit("reset_key").await.is_ok());
        assert!(limiter.check_rate_limit("reset_key").await.is_err());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(limiter.check_rate_limit("reset_key").await.is_ok());
    }

    #[tokio::test]
    async fn cleanup_drops_expired_entries() {
        let limiter = RateLimiter::new(5, 1);

        let _ = limiter.check_rate_limit("old").await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let _ = limiter.check_rate_limit("fresh").await;

        limiter.cleanup_expired().await;

        let requests = limiter.requests.read().await;
        assert!(!requests.contains_key("old"));
        assert!(requests.contains_key("fresh"));
    }

    #[test]
    fn client_ip_ignores_spoofable_headers() {
        let request = axum::extract::Request::builder()
            .header("X-Forwarded-For", "192.168.1.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request), "ip:unknown");
    }

    #[test]
    fn client_ip_uses_connect_info() {
        use std::net::SocketAddr;
        let addr: SocketAddr = "192.168.1.100:12345".parse().unwrap();
        let mut request = axum::extract::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(axum::extract::ConnectInfo(addr));
        assert_eq!(extract_client_ip(&request), "ip:192.168.1.100");
    }
}
