use serde::{Deserialize, Serialize};

/// External documentation-lookup service (§4.10, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_search_ttl_secs")]
    pub search_ttl_secs: i64,
    #[serde(default = "d_docs_ttl_secs")]
    pub docs_ttl_secs: i64,
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "d_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "d_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: d_api_key_env(),
            search_ttl_secs: d_search_ttl_secs(),
            docs_ttl_secs: d_docs_ttl_secs(),
            max_attempts: d_max_attempts(),
            base_backoff_ms: d_base_backoff_ms(),
            max_backoff_ms: d_max_backoff_ms(),
        }
    }
}

impl DocsConfig {
    /// Negative/NaN-equivalent values fall back to the default (§3).
    pub fn search_ttl(&self) -> i64 {
        if self.search_ttl_secs <= 0 {
            d_search_ttl_secs()
        } else {
            self.search_ttl_secs
        }
    }

    pub fn docs_ttl(&self) -> i64 {
        if self.docs_ttl_secs <= 0 {
            d_docs_ttl_secs()
        } else {
            self.docs_ttl_secs
        }
    }
}

fn d_api_key_env() -> String {
    "SNAPBACK_DOCS_API_KEY".into()
}
fn d_search_ttl_secs() -> i64 {
    3_600
}
fn d_docs_ttl_secs() -> i64 {
    86_400
}
fn d_max_attempts() -> u32 {
    3
}
fn d_base_backoff_ms() -> u64 {
    1_000
}
fn d_max_backoff_ms() -> u64 {
    10_000
}
