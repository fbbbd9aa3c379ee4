//! Detector contract (§4.8): pure `(content, path?, metadata?) → {score,
//! factors, recommendations, severity}`, diff-aware via `changedLines`,
//! comment-skipping.

mod dangerous_apis;
mod dependency_hygiene;
mod env_hygiene;
mod secrets;

pub use dangerous_apis::DangerousApisDetector;
pub use dependency_hygiene::DependencyHygieneDetector;
pub use env_hygiene::EnvHygieneDetector;
pub use secrets::SecretsDetector;

use std::collections::BTreeSet;

use snapback_domain::model::{Issue, Severity};

/// Everything a detector is allowed to see. No clock, no filesystem — the
/// facade reads the file once and hands every detector the same view.
pub struct DetectorInput<'a> {
    pub content: &'a str,
    pub path: Option<&'a str>,
    pub changed_lines: Option<&'a BTreeSet<u32>>,
}

#[derive(Debug, Clone)]
pub struct DetectorOutput {
    pub score: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub severity: Severity,
    pub issues: Vec<Issue>,
}

impl DetectorOutput {
    pub fn clean() -> Self {
        Self {
            score: 0.0,
            factors: Vec::new(),
            recommendations: Vec::new(),
            severity: Severity::Low,
            issues: Vec::new(),
        }
    }
}

pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;
    fn analyze(&self, input: &DetectorInput) -> DetectorOutput;
}

/// The fixed, ordered set the facade runs every file through.
pub fn baseline_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(SecretsDetector),
        Box::new(DangerousApisDetector),
        Box::new(EnvHygieneDetector),
        Box::new(DependencyHygieneDetector::default()),
    ]
}

/// Lines available for scanning: comment-only lines stripped, restricted
/// to `changed_lines` when the caller supplied a diff.
pub fn scannable_lines<'a>(input: &DetectorInput<'a>) -> Vec<(u32, &'a str)> {
    let mut in_block_comment = false;
    let ext = input
        .path
        .and_then(|p| p.rsplit('.').next())
        .unwrap_or("");
    let hash_comment = matches!(ext, "py" | "rb" | "sh" | "yml" | "yaml" | "toml" | "env" | "");

    input
        .content
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let line_no = (idx + 1) as u32;
            if let Some(changed) = input.changed_lines {
                if !changed.contains(&line_no) {
                    return None;
                }
            }

            let trimmed = raw.trim();
            if in_block_comment {
                if trimmed.contains("*/") {
                    in_block_comment = false;
                }
                return None;
            }
            if trimmed.starts_with("/*") && !trimmed.contains("*/") {
                in_block_comment = true;
                return None;
            }
            if trimmed.is_empty() {
                return None;
            }
            if trimmed.starts_with("//") {
                return None;
            }
            if hash_comment && trimmed.starts_with('#') {
                return None;
            }
            Some((line_no, raw))
        })
        .collect()
}

/// Facade merge rule (§4.8): severity and score take the max across
/// detectors; factors/recommendations concatenate in detector order,
/// deduplicated by string identity.
pub fn merge(outputs: Vec<DetectorOutput>) -> DetectorOutput {
    let mut merged = DetectorOutput::clean();
    for output in outputs {
        if output.score > merged.score {
            merged.score = output.score;
        }
        if output.severity > merged.severity {
            merged.severity = output.severity;
        }
        for factor in output.factors {
            if !merged.factors.contains(&factor) {
                merged.factors.push(factor);
            }
        }
        for rec in output.recommendations {
            if !merged.recommendations.contains(&rec) {
                merged.recommendations.push(rec);
            }
        }
        merged.issues.extend(output.issues);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scannable_lines_skips_line_comments() {
        let content = "let a = 1;\n// a secret here\nlet b = 2;";
        let input = DetectorInput { content, path: None, changed_lines: None };
        let lines = scannable_lines(&input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, 1);
        assert_eq!(lines[1].0, 3);
    }

    #[test]
    fn scannable_lines_skips_block_comments() {
        let content = "a();\n/* blocked\nsecret here\n*/\nb();";
        let input = DetectorInput { content, path: None, changed_lines: None };
        let lines = scannable_lines(&input);
        assert_eq!(lines.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn scannable_lines_restricts_to_changed_lines() {
        let content = "a();\nb();\nc();";
        let changed: BTreeSet<u32> = [2].into_iter().collect();
        let input = DetectorInput { content, path: None, changed_lines: Some(&changed) };
        let lines = scannable_lines(&input);
        assert_eq!(lines, vec![(2, "b();")]);
    }

    #[test]
    fn merge_takes_max_severity_and_dedupes_factors() {
        let a = DetectorOutput {
            score: 0.4,
            factors: vec!["secret".into()],
            recommendations: vec!["rotate keys".into()],
            severity: Severity::Medium,
            issues: vec![],
        };
        let b = DetectorOutput {
            score: 0.9,
            factors: vec!["secret".into(), "eval".into()],
            recommendations: vec!["rotate keys".into(), "avoid eval".into()],
            severity: Severity::Critical,
            issues: vec![],
        };
        let merged = merge(vec![a, b]);
        assert_eq!(merged.score, 0.9);
        assert_eq!(merged.severity, Severity::Critical);
        assert_eq!(merged.factors, vec!["secret".to_string(), "eval".to_string()]);
        assert_eq!(
            merged.recommendations,
            vec!["rotate keys".to_string(), "avoid eval".to_string()]
        );
    }
}
