//! `snapback-docs` — the Documentation Proxy (§4.10): cached,
//! retry-with-backoff access to the external library-documentation
//! service.

pub mod cache;
pub mod client;

pub use cache::DocCache;
pub use client::DocsClient;
