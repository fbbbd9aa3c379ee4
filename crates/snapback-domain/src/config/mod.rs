mod docs;
mod server;
mod telemetry;
mod upstream;
mod workspace;

pub use docs::*;
pub use server::*;
pub use telemetry::*;
pub use upstream::*;
pub use workspace::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. Any
    /// `Error`-severity issue is fatal at startup; `Warning` issues are
    /// logged and startup continues.
    pub fn validate(&self, production: bool) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.max_body_bytes == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.max_body_bytes".into(),
                message: "max_body_bytes must be greater than 0".into(),
            });
        }

        if self.server.cors.allowed_origins.iter().any(|o| o == "*") {
            if production {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.cors.allowed_origins".into(),
                    message: "\"*\" is only permitted in development mode".into(),
                });
            } else {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: "server.cors.allowed_origins".into(),
                    message: "wildcard \"*\" allows all origins".into(),
                });
            }
        }

        if let Some(rl) = &self.server.rate_limit {
            if rl.cap == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.cap".into(),
                    message: "cap must be greater than 0".into(),
                });
            }
            if rl.window_ms == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "server.rate_limit.window_ms".into(),
                    message: "window_ms must be greater than 0".into(),
                });
            }
        }

        if let Some(url) = &self.upstream.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "upstream.base_url".into(),
                    message: format!("base_url must start with http:// or https:// (got \"{url}\")"),
                });
            }
        }

        if let Some(url) = &self.docs.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "docs.base_url".into(),
                    message: format!("base_url must start with http:// or https:// (got \"{url}\")"),
                });
            }
        }

        if self.upstream.breaker_fail_threshold == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "upstream.breaker_fail_threshold".into(),
                message: "breaker_fail_threshold must be greater than 0".into(),
            });
        }
        if self.upstream.max_attempts == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "upstream.max_attempts".into(),
                message: "max_attempts must be greater than 0".into(),
            });
        }

        if self.workspace.state_dir.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "workspace.state_dir".into(),
                message: "state_dir must not be empty".into(),
            });
        }

        errors
    }

    /// Production-mode key strictness (§4.3, §6): keys must be at least 32
    /// characters and match `[A-Za-z0-9_-]+`. Empty keys are only allowed
    /// outside production.
    pub fn validate_key_strictness(key: &str, field: &str, production: bool) -> Option<ConfigError> {
        if key.is_empty() {
            if production {
                return Some(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: "must not be empty in production".into(),
                });
            }
            return None;
        }
        if key.len() < 32 {
            return Some(ConfigError {
                severity: ConfigSeverity::Error,
                field: field.into(),
                message: "must be at least 32 characters".into(),
            });
        }
        if !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
            return Some(ConfigError {
                severity: ConfigSeverity::Error,
                field: field.into(),
                message: "must match [A-Za-z0-9_-]+".into(),
            });
        }
        None
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn default_config_has_no_errors_in_development() {
        let cfg = Config::default();
        let issues = cfg.validate(false);
        let errors: Vec<_> = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn server_port_zero_is_error() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        let issue = find_issue(&cfg.validate(false), "server.port").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn wildcard_cors_is_warning_in_development() {
        let mut cfg = Config::default();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issue = find_issue(&cfg.validate(false), "server.cors.allowed_origins").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn wildcard_cors_is_error_in_production() {
        let mut cfg = Config::default();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issue = find_issue(&cfg.validate(true), "server.cors.allowed_origins").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn upstream_base_url_invalid_scheme_is_error() {
        let mut cfg = Config::default();
        cfg.upstream.base_url = Some("ftp://example.com".into());
        let issue = find_issue(&cfg.validate(false), "upstream.base_url").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn key_strictness_rejects_short_key_in_any_mode() {
        let err = Config::validate_key_strictness("short", "upstream.api_key", false);
        assert!(err.is_some());
    }

    #[test]
    fn key_strictness_allows_empty_key_outside_production() {
        let err = Config::validate_key_strictness("", "upstream.api_key", false);
        assert!(err.is_none());
    }

    #[test]
    fn key_strictness_rejects_empty_key_in_production() {
        let err = Config::validate_key_strictness("", "upstream.api_key", true);
        assert!(err.is_some());
    }

    #[test]
    fn key_strictness_rejects_bad_charset() {
        let key = "a".repeat(32) + "!";
        let err = Config::validate_key_strictness(&key, "upstream.api_key", true);
        assert!(err.is_some());
    }

    #[test]
    fn key_strictness_accepts_valid_key() {
        let key = "a".repeat(32);
        let err = Config::validate_key_strictness(&key, "upstream.api_key", true);
        assert!(err.is_none());
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(format!("{err}"), "[ERROR] server.port: port must be greater than 0");
    }
}
