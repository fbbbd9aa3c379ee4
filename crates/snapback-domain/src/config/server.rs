use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server / transport (spec §4.1, §6)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    #[serde(default = "d_max_body_bytes")]
    pub max_body_bytes: u64,
    /// Environment variable holding the bearer token for protected routes.
    /// Unset (and empty in development) means dev mode: no auth required.
    #[serde(default = "d_api_token_env")]
    pub api_token_env: String,
    /// Environment variable holding the admin bearer token.
    #[serde(default = "d_admin_token_env")]
    pub admin_token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            cors: CorsConfig::default(),
            rate_limit: Some(RateLimitConfig::default()),
            max_body_bytes: d_max_body_bytes(),
            api_token_env: d_api_token_env(),
            admin_token_env: d_admin_token_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed for CORS. `["*"]` permitted only in development mode.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

/// Fixed-window rate limiting (§3 Rate-Limit Counter, §4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "d_window_ms")]
    pub window_ms: u64,
    #[serde(default = "d_cap")]
    pub cap: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: d_window_ms(),
            cap: d_cap(),
        }
    }
}

fn d_port() -> u16 {
    3210
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_window_ms() -> u64 {
    60_000
}
fn d_cap() -> u32 {
    100
}
fn d_max_body_bytes() -> u64 {
    4 * 1024 * 1024
}
fn d_api_token_env() -> String {
    "SNAPBACK_API_TOKEN".into()
}
fn d_admin_token_env() -> String {
    "SNAPBACK_ADMIN_TOKEN".into()
}
