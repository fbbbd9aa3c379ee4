//! Fixed-window per-client-ip rate limiting (§3 Rate-Limit Counter, §4.1,
//! §8 testable property: the `(cap+1)`-th request inside a window returns
//! 429, the `cap`-th succeeds). `tower_governor`'s token-bucket semantics
//! don't match that property exactly, so this is a small bespoke layer
//! over the same `RateLimitCounter` shape the domain model already names.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use parking_lot::Mutex;
use snapback_domain::config::RateLimitConfig;
use snapback_domain::model::RateLimitCounter;

#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    counters: Arc<Mutex<HashMap<IpAddr, RateLimitCounter>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns `Ok(())` if the request is admitted, `Err(retry_after_secs)`
    /// if the window's cap has been exceeded.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Utc::now();
        let mut counters = self.counters.lock();
        let entry = counters.entry(ip).or_insert_with(|| RateLimitCounter {
            count: 0,
            reset_at: now + chrono::Duration::milliseconds(self.config.window_ms as i64),
        });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + chrono::Duration::milliseconds(self.config.window_ms as i64);
        }

        entry.count += 1;
        if entry.count > self.config.cap {
            let retry_after = (entry.reset_at - now).num_seconds().max(1) as u64;
            return Err(retry_after);
        }
        Ok(())
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client_ip = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .unwrap_or(addr.ip());

    match limiter.check(client_ip) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", retry_after.to_string())],
            axum::Json(serde_json::json!({
                "error": "rate limit exceeded",
                "message": format!("retry after {retry_after}s"),
            })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_th_request_admitted_next_rejected() {
        let limiter = RateLimiter::new(RateLimitConfig { window_ms: 60_000, cap: 3 });
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_err());
    }

    #[test]
    fn different_ips_have_independent_counters() {
        let limiter = RateLimiter::new(RateLimitConfig { window_ms: 60_000, cap: 1 });
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "127.0.0.2".parse().unwrap();
        assert!(limiter.check(a).is_ok());
        assert!(limiter.check(b).is_ok());
        assert!(limiter.check(a).is_err());
    }
}
