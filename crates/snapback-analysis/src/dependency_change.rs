//! Dependency-change analyzer (§4.8): backs the `check_dependencies` tool.
//! Compares two dependency maps and reports adds, removes and version
//! changes, severity bucketed by the same CVSS band as dependency hygiene.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use snapback_domain::model::Severity;

use crate::advisories::{cvss_to_severity, lookup_advisories};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChangeKind {
    Added { version: String },
    Removed { version: String },
    VersionChanged { from: String, to: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyChange {
    pub package: String,
    #[serde(flatten)]
    pub change: ChangeKind,
    pub severity: Option<Severity>,
    pub advisory: Option<String>,
}

fn as_version_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .into_iter()
        .flat_map(|obj| obj.iter())
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

/// Checks a package/version pair against the bundled advisory fixture and
/// returns the CVSS-banded severity of the worst applicable advisory.
fn advisory_severity(package: &str, version: &str) -> (Option<Severity>, Option<String>) {
    let advisories = lookup_advisories(None, package, version);
    advisories
        .into_iter()
        .max_by(|a, b| a.cvss.partial_cmp(&b.cvss).unwrap_or(std::cmp::Ordering::Equal))
        .map(|a| (Some(cvss_to_severity(a.cvss)), Some(a.summary)))
        .unwrap_or((None, None))
}

pub fn diff_dependencies(before: &Value, after: &Value) -> Vec<DependencyChange> {
    let before = as_version_map(before);
    let after = as_version_map(after);

    let mut packages: Vec<&String> = before.keys().chain(after.keys()).collect();
    packages.sort();
    packages.dedup();

    let mut changes = Vec::new();
    for package in packages {
        match (before.get(package), after.get(package)) {
            (None, Some(to)) => {
                let (severity, advisory) = advisory_severity(package, to);
                changes.push(DependencyChange {
                    package: package.clone(),
                    change: ChangeKind::Added { version: to.clone() },
                    severity,
                    advisory,
                });
            }
            (Some(from), None) => {
                changes.push(DependencyChange {
                    package: package.clone(),
                    change: ChangeKind::Removed { version: from.clone() },
                    severity: None,
                    advisory: None,
                });
            }
            (Some(from), Some(to)) if from != to => {
                let (severity, advisory) = advisory_severity(package, to);
                changes.push(DependencyChange {
                    package: package.clone(),
                    change: ChangeKind::VersionChanged { from: from.clone(), to: to.clone() },
                    severity,
                    advisory,
                });
            }
            _ => {}
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_added_and_removed_packages() {
        let before = json!({"lodash": "4.17.21"});
        let after = json!({"axios": "1.0.0"});
        let changes = diff_dependencies(&before, &after);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().any(|c| matches!(c.change, ChangeKind::Added { .. }) && c.package == "axios"));
        assert!(changes.iter().any(|c| matches!(c.change, ChangeKind::Removed { .. }) && c.package == "lodash"));
    }

    #[test]
    fn detects_version_change_with_advisory_severity() {
        let before = json!({"lodash": "4.17.10"});
        let after = json!({"lodash": "4.17.15"});
        let changes = diff_dependencies(&before, &after);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].change, ChangeKind::VersionChanged { .. }));
        assert_eq!(changes[0].severity, Some(Severity::High));
    }

    #[test]
    fn unchanged_dependency_produces_no_entry() {
        let before = json!({"lodash": "4.17.21"});
        let after = json!({"lodash": "4.17.21"});
        assert!(diff_dependencies(&before, &after).is_empty());
    }

    #[test]
    fn version_bump_to_patched_release_has_no_severity() {
        let before = json!({"lodash": "4.17.15"});
        let after = json!({"lodash": "4.17.21"});
        let changes = diff_dependencies(&before, &after);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].severity.is_none());
    }
}
