use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Upstream analysis service (§4.6, §4.7, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the upstream API key. Required (and
    /// length/charset checked) in production.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Static feature-flag snapshot (§4.6, §5) consulted by the Analysis
    /// Router on every request; `ml-detection` is the only flag the router
    /// reads, defaulting to enabled when absent.
    #[serde(default)]
    pub feature_flags: HashMap<String, bool>,
    #[serde(default = "d_breaker_fail_threshold")]
    pub breaker_fail_threshold: u32,
    #[serde(default = "d_breaker_success_threshold")]
    pub breaker_success_threshold: u32,
    #[serde(default = "d_breaker_recovery_ms")]
    pub breaker_recovery_ms: u64,
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "d_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "d_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "d_total_deadline_ms")]
    pub total_deadline_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: d_api_key_env(),
            feature_flags: HashMap::new(),
            breaker_fail_threshold: d_breaker_fail_threshold(),
            breaker_success_threshold: d_breaker_success_threshold(),
            breaker_recovery_ms: d_breaker_recovery_ms(),
            max_attempts: d_max_attempts(),
            base_backoff_ms: d_base_backoff_ms(),
            max_backoff_ms: d_max_backoff_ms(),
            total_deadline_ms: d_total_deadline_ms(),
        }
    }
}

fn d_api_key_env() -> String {
    "SNAPBACK_UPSTREAM_API_KEY".into()
}
fn d_breaker_fail_threshold() -> u32 {
    3
}
fn d_breaker_success_threshold() -> u32 {
    2
}
fn d_breaker_recovery_ms() -> u64 {
    30_000
}
fn d_max_attempts() -> u32 {
    3
}
fn d_base_backoff_ms() -> u64 {
    100
}
fn d_max_backoff_ms() -> u64 {
    5_000
}
fn d_total_deadline_ms() -> u64 {
    10_000
}
