//! Bundled offline vulnerability fixture (§4.8) shared by the dependency
//! hygiene detector and the dependency-change analyzer.

use snapback_domain::model::Severity;

#[derive(Debug, Clone)]
pub struct Advisory {
    pub summary: String,
    pub cvss: f64,
}

struct BundledEntry {
    package: &'static str,
    vulnerable_below: &'static str,
    cvss: f64,
    summary: &'static str,
}

const BUNDLED: &[BundledEntry] = &[
    BundledEntry {
        package: "lodash",
        vulnerable_below: "4.17.21",
        cvss: 7.4,
        summary: "prototype pollution via zipObjectDeep (CVE-2020-8203)",
    },
    BundledEntry {
        package: "minimist",
        vulnerable_below: "1.2.6",
        cvss: 9.8,
        summary: "prototype pollution allows remote code execution (CVE-2021-44906)",
    },
    BundledEntry {
        package: "node-fetch",
        vulnerable_below: "2.6.7",
        cvss: 6.1,
        summary: "exposure of sensitive headers across redirects (CVE-2022-0235)",
    },
    BundledEntry {
        package: "axios",
        vulnerable_below: "0.21.2",
        cvss: 7.5,
        summary: "server-side request forgery via redirect handling (CVE-2021-3749)",
    },
    BundledEntry {
        package: "ws",
        vulnerable_below: "7.4.6",
        cvss: 7.5,
        summary: "denial of service via crafted Sec-WebSocket-Extensions header (CVE-2021-32640)",
    },
];

pub fn cvss_to_severity(cvss: f64) -> Severity {
    if cvss >= 9.0 {
        Severity::Critical
    } else if cvss >= 7.0 {
        Severity::High
    } else if cvss >= 4.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn strip_range_prefix(version: &str) -> &str {
    version.trim_start_matches(['^', '~', '>', '<', '=', ' '])
}

/// Conservative dotted-numeric compare: a non-numeric component (pre-release
/// suffixes, build metadata) sorts below any numeric one, so `1.2.0-beta`
/// is treated as older than `1.2.0`.
fn version_lt(a: &str, b: &str) -> bool {
    let pa = a.split(['.', '-', '+']).map(|p| p.parse::<u64>().ok());
    let pb = b.split(['.', '-', '+']).map(|p| p.parse::<u64>().ok());
    for (ca, cb) in pa.zip(pb) {
        match (ca, cb) {
            (Some(x), Some(y)) if x != y => return x < y,
            (None, Some(_)) => return true,
            (Some(_), None) => return false,
            _ => continue,
        }
    }
    false
}

/// Looks up known advisories for `package@version`. `fixture_path` is
/// reserved for deployments that supply a curated database on disk; absent
/// that, the bundled fixture is used.
pub fn lookup_advisories(_fixture_path: Option<&str>, package: &str, version: &str) -> Vec<Advisory> {
    let version = strip_range_prefix(version);
    BUNDLED
        .iter()
        .filter(|e| e.package == package && version_lt(version, e.vulnerable_below))
        .map(|e| Advisory { summary: e.summary.to_string(), cvss: e.cvss })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cvss_band_boundaries() {
        assert_eq!(cvss_to_severity(9.8), Severity::Critical);
        assert_eq!(cvss_to_severity(7.5), Severity::High);
        assert_eq!(cvss_to_severity(4.0), Severity::Medium);
        assert_eq!(cvss_to_severity(2.0), Severity::Low);
    }

    #[test]
    fn version_lt_orders_numeric_components() {
        assert!(version_lt("4.17.15", "4.17.21"));
        assert!(!version_lt("4.17.21", "4.17.21"));
        assert!(!version_lt("4.18.0", "4.17.21"));
    }

    #[test]
    fn lookup_strips_semver_range_prefix() {
        let found = lookup_advisories(None, "lodash", "^4.17.15");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn lookup_returns_empty_for_patched_version() {
        let found = lookup_advisories(None, "lodash", "4.17.21");
        assert!(found.is_empty());
    }

    #[test]
    fn lookup_returns_empty_for_unknown_package() {
        let found = lookup_advisories(None, "left-pad", "1.0.0");
        assert!(found.is_empty());
    }
}
