/// Shared error type used across all coprocessor crates.
///
/// Never `Display`ed directly to a caller outside the sanitizer — see
/// `snapback-telemetry::sanitize`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport: {0}")]
    Transport(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("upstream {service}: {message}")]
    Upstream { service: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("path security violation")]
    PathSecurity,

    #[error("snapshot: {0}")]
    Snapshot(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
