//! Dependency hygiene (§4.8): applies only to `package.json`, consults an
//! offline vulnerability fixture, maps CVSS band to severity.

use snapback_domain::model::{Issue, Severity};

use super::{Detector, DetectorInput, DetectorOutput};
use crate::advisories::{cvss_to_severity, lookup_advisories};

pub struct DependencyHygieneDetector {
    fixture_path: Option<String>,
}

impl Default for DependencyHygieneDetector {
    fn default() -> Self {
        Self { fixture_path: None }
    }
}

impl DependencyHygieneDetector {
    /// Points at an on-disk advisory fixture instead of the bundled one.
    /// Reserved for deployments that ship a larger curated database.
    pub fn with_fixture(path: impl Into<String>) -> Self {
        Self { fixture_path: Some(path.into()) }
    }
}

fn applies_to(path: &str) -> bool {
    path.rsplit('/').next() == Some("package.json")
}

impl Detector for DependencyHygieneDetector {
    fn name(&self) -> &'static str {
        "dependency_hygiene"
    }

    fn analyze(&self, input: &DetectorInput) -> DetectorOutput {
        let mut out = DetectorOutput::clean();
        let Some(path) = input.path else {
            return out;
        };
        if !applies_to(path) {
            return out;
        }

        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(input.content) else {
            return out;
        };

        for field in ["dependencies", "devDependencies"] {
            let Some(deps) = parsed.get(field).and_then(|v| v.as_object()) else {
                continue;
            };
            for (name, version) in deps {
                let Some(version) = version.as_str() else { continue };
                for advisory in lookup_advisories(self.fixture_path.as_deref(), name, version) {
                    let severity = cvss_to_severity(advisory.cvss);
                    out.issues.push(Issue {
                        kind: "dependency_vulnerability".into(),
                        severity,
                        message: format!("{name}@{version}: {}", advisory.summary),
                        pattern: None,
                        line: None,
                    });
                    let factor = "dependency_vulnerability".to_string();
                    if !out.factors.contains(&factor) {
                        out.factors.push(factor);
                    }
                    let score = (advisory.cvss / 10.0).min(1.0);
                    if score > out.score {
                        out.score = score;
                    }
                    if severity > out.severity {
                        out.severity = severity;
                    }
                }
            }
        }

        if !out.issues.is_empty() {
            out.recommendations.push("upgrade flagged dependencies to the patched version named in the advisory".into());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str) -> DetectorOutput {
        let input = DetectorInput { content, path: Some("package.json"), changed_lines: None };
        DependencyHygieneDetector::default().analyze(&input)
    }

    #[test]
    fn ignores_non_package_json() {
        let input = DetectorInput { content: "{}", path: Some("other.json"), changed_lines: None };
        let out = DependencyHygieneDetector::default().analyze(&input);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn flags_known_vulnerable_version() {
        let out = run(r#"{"dependencies":{"lodash":"4.17.15"}}"#);
        assert!(!out.issues.is_empty());
    }

    #[test]
    fn does_not_flag_patched_version() {
        let out = run(r#"{"dependencies":{"lodash":"4.17.21"}}"#);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn ignores_packages_with_no_advisory() {
        let out = run(r#"{"dependencies":{"left-pad":"1.0.0"}}"#);
        assert!(out.issues.is_empty());
    }
}
