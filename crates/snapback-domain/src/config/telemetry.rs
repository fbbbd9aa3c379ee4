use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Error Sanitizer + Performance Wrapper configuration (§4.11, §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `development` relaxes error verbosity and key strictness; any other
    /// value is treated as `production`.
    #[serde(default = "d_mode")]
    pub mode: String,
    /// Per-operation budget overrides (ms); unlisted operations use the
    /// built-in table in `snapback-telemetry::performance`.
    #[serde(default)]
    pub performance_budgets_ms: HashMap<String, u64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            mode: d_mode(),
            performance_budgets_ms: HashMap::new(),
        }
    }
}

impl TelemetryConfig {
    pub fn is_development(&self) -> bool {
        self.mode.eq_ignore_ascii_case("development")
    }
}

fn d_mode() -> String {
    "development".into()
}
