//! Documentation Proxy (§4.10): `resolveLibraryId`/`getLibraryDocs`,
//! cache-first, retry/backoff with non-retryable 4xx short-circuit.

use serde_json::Value;
use snapback_analysis::retry::{retry_with_backoff, Classified, RetryConfig};
use snapback_domain::config::DocsConfig;
use snapback_domain::{Error, Result};

use crate::cache::{docs_key, resolve_key, DocCache};

pub struct DocsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: DocCache,
    retry: RetryConfig,
    search_ttl: i64,
    docs_ttl: i64,
}

/// HTTP statuses the spec calls out as terminal: retrying them burns
/// attempts on a request that will never succeed.
fn is_non_retryable(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 401 | 403 | 404 | 429)
}

impl DocsClient {
    pub fn new(config: &DocsConfig, api_key: Option<String>) -> Option<Self> {
        let base_url = config.base_url.clone()?;
        Some(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            cache: DocCache::default(),
            retry: RetryConfig::from_upstream(config.max_attempts, config.base_backoff_ms, config.max_backoff_ms),
            search_ttl: config.search_ttl(),
            docs_ttl: config.docs_ttl(),
        })
    }

    pub fn cache(&self) -> &DocCache {
        &self.cache
    }

    pub async fn resolve_library_id(&self, library_name: &str) -> Result<Value> {
        let key = resolve_key(library_name);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let url = format!("{}/resolve", self.base_url.trim_end_matches('/'));
        let query = [("libraryName", library_name)];
        let value = self.get_with_retry(&url, &query).await?;
        self.cache.insert(key, value.clone(), snapback_domain::model::DocCacheClass::Search, self.search_ttl);
        Ok(value)
    }

    pub async fn get_library_docs(&self, library_id: &str, topic: Option<&str>, tokens: Option<u32>) -> Result<Value> {
        let key = docs_key(library_id, topic, tokens);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let url = format!("{}/docs", self.base_url.trim_end_matches('/'));
        let mut query = vec![("libraryId", library_id.to_string())];
        if let Some(topic) = topic {
            query.push(("topic".to_string(), topic.to_string()));
        }
        if let Some(tokens) = tokens {
            query.push(("tokens".to_string(), tokens.to_string()));
        }
        let value = self.get_with_retry(&url, &query).await?;
        self.cache.insert(key, value.clone(), snapback_domain::model::DocCacheClass::Docs, self.docs_ttl);
        Ok(value)
    }

    async fn get_with_retry<Q: serde::Serialize>(&self, url: &str, query: &Q) -> Result<Value> {
        retry_with_backoff(&self.retry, |_attempt| async {
            let mut req = self.http.get(url).query(query);
            if let Some(key) = &self.api_key {
                req = req.bearer_auth(key);
            }

            let response = req.send().await.map_err(|e| {
                Classified::Retryable(Error::Upstream { service: "docs".into(), message: e.to_string() })
            })?;

            let status = response.status();
            if is_non_retryable(status) {
                return Err(Classified::Fatal(Error::Upstream {
                    service: "docs".into(),
                    message: format!("rejected: {status}"),
                }));
            }
            if status.is_server_error() {
                return Err(Classified::Retryable(Error::Upstream {
                    service: "docs".into(),
                    message: format!("server error: {status}"),
                }));
            }
            if !status.is_success() {
                return Err(Classified::Fatal(Error::Upstream {
                    service: "docs".into(),
                    message: format!("unexpected status: {status}"),
                }));
            }

            response.json::<Value>().await.map_err(|e| {
                Classified::Fatal(Error::Upstream { service: "docs".into(), message: format!("malformed body: {e}") })
            })
        })
        .await
    }
}
