//! Upstream Client (§4.7): timeout (outermost) ∘ retry (middle) ∘
//! circuit breaker (innermost) around the ML-detection backend call.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use snapback_domain::config::UpstreamConfig;
use snapback_domain::model::{AnalysisResult, Issue, RiskLevel, Severity};
use snapback_domain::{Error, Result};

use crate::breaker::{Admission, CircuitBreaker};
use crate::retry::{retry_with_backoff, Classified, RetryConfig};

pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    breaker: CircuitBreaker,
    retry: RetryConfig,
    deadline: Duration,
}

/// Shape the upstream detection backend is required to return. Anything
/// that doesn't parse into this, or whose `risk_level`/`confidence` fall
/// outside the declared ranges, is treated as a fatal (non-retryable)
/// validation failure rather than a transient one.
#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    risk_level: String,
    confidence: f64,
    #[serde(default)]
    issues: Vec<UpstreamIssue>,
    #[serde(default)]
    recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamIssue {
    #[serde(rename = "type")]
    kind: String,
    severity: String,
    message: String,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    line: Option<u32>,
}

fn parse_risk_level(s: &str) -> Option<RiskLevel> {
    match s {
        "safe" | "low" => Some(RiskLevel::Low),
        "medium" => Some(RiskLevel::Medium),
        "high" | "critical" => Some(RiskLevel::High),
        "none" => Some(RiskLevel::None),
        _ => None,
    }
}

fn parse_severity(s: &str) -> Option<Severity> {
    match s {
        "low" => Some(Severity::Low),
        "medium" => Some(Severity::Medium),
        "high" => Some(Severity::High),
        "critical" => Some(Severity::Critical),
        _ => None,
    }
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, api_key: Option<String>) -> Option<Self> {
        let base_url = config.base_url.clone()?;
        Some(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            breaker: CircuitBreaker::new(
                config.breaker_fail_threshold,
                config.breaker_success_threshold,
                config.breaker_recovery_ms,
            ),
            retry: RetryConfig::from_upstream(
                config.max_attempts,
                config.base_backoff_ms,
                config.max_backoff_ms,
            ),
            deadline: Duration::from_millis(config.total_deadline_ms),
        })
    }

    pub async fn analyze(&self, payload: &Value) -> Result<AnalysisResult> {
        let call = self.call_once(payload);
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("upstream analysis deadline exceeded".into())),
        }
    }

    async fn call_once(&self, payload: &Value) -> Result<AnalysisResult> {
        let result = retry_with_backoff(&self.retry, |_attempt| async {
            match self.breaker.admit() {
                Admission::Rejected => {
                    return Err(Classified::Retryable(Error::Upstream {
                        service: "analysis".into(),
                        message: "circuit open".into(),
                    }))
                }
                Admission::Admitted => {}
            }

            match self.send(payload).await {
                Ok(parsed) => {
                    self.breaker.on_success();
                    Ok(parsed)
                }
                Err(Classified::Fatal(e)) => {
                    self.breaker.on_failure();
                    Err(Classified::Fatal(e))
                }
                Err(Classified::Retryable(e)) => {
                    self.breaker.on_failure();
                    Err(Classified::Retryable(e))
                }
            }
        })
        .await;

        result
    }

    async fn send(&self, payload: &Value) -> std::result::Result<AnalysisResult, Classified<Error>> {
        let mut req = self
            .http
            .post(format!("{}/v1/analyze", self.base_url.trim_end_matches('/')))
            .json(payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            Classified::Retryable(Error::Upstream {
                service: "analysis".into(),
                message: e.to_string(),
            })
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Classified::Retryable(Error::Upstream {
                service: "analysis".into(),
                message: format!("server error: {status}"),
            }));
        }
        if !status.is_success() {
            return Err(Classified::Fatal(Error::Upstream {
                service: "analysis".into(),
                message: format!("rejected: {status}"),
            }));
        }

        let body: UpstreamResponse = response.json().await.map_err(|e| {
            Classified::Fatal(Error::Upstream {
                service: "analysis".into(),
                message: format!("malformed response body: {e}"),
            })
        })?;

        let risk_level = parse_risk_level(&body.risk_level).ok_or_else(|| {
            Classified::Fatal(Error::Upstream {
                service: "analysis".into(),
                message: format!("unknown risk_level: {}", body.risk_level),
            })
        })?;
        if !(0.0..=1.0).contains(&body.confidence) {
            return Err(Classified::Fatal(Error::Upstream {
                service: "analysis".into(),
                message: format!("confidence out of range: {}", body.confidence),
            }));
        }

        let mut issues = Vec::with_capacity(body.issues.len());
        for issue in body.issues {
            let severity = parse_severity(&issue.severity).ok_or_else(|| {
                Classified::Fatal(Error::Upstream {
                    service: "analysis".into(),
                    message: format!("unknown severity: {}", issue.severity),
                })
            })?;
            issues.push(Issue {
                kind: issue.kind,
                severity,
                message: issue.message,
                pattern: issue.pattern,
                line: issue.line,
            });
        }

        Ok(AnalysisResult {
            risk_level,
            confidence: body.confidence,
            issues,
            execution_time_ms: 0,
            upgrade_prompt: false,
            recommendations: body.recommendations,
        }
        .clamp_confidence())
    }
}
