//! `.env` file hygiene (§4.8): only applies to `.env[*]` files, excluding
//! `.env.example`/`.env.sample`.

use snapback_domain::model::{Issue, Severity};

use super::{Detector, DetectorInput, DetectorOutput};

const ALLOWLIST: &[&str] = &["NODE_ENV", "PORT", "HOST", "LOG_LEVEL"];
const VERBOSE_LOG_LEVELS: &[&str] = &["debug", "trace", "verbose"];

fn applies_to(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    if name == ".env.example" || name == ".env.sample" {
        return false;
    }
    name == ".env" || name.starts_with(".env.")
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    value.is_empty()
        || lower.contains("changeme")
        || lower.contains("your_")
        || lower.contains("placeholder")
        || lower.contains("xxxx")
        || (value.starts_with('<') && value.ends_with('>'))
}

fn is_variable_reference(value: &str) -> bool {
    value.starts_with('$') || (value.starts_with("${") && value.ends_with('}'))
}

pub struct EnvHygieneDetector;

impl Detector for EnvHygieneDetector {
    fn name(&self) -> &'static str {
        "env_hygiene"
    }

    fn analyze(&self, input: &DetectorInput) -> DetectorOutput {
        let mut out = DetectorOutput::clean();
        let Some(path) = input.path else {
            return out;
        };
        if !applies_to(path) {
            return out;
        }

        for (idx, raw) in input.content.lines().enumerate() {
            let line_no = (idx + 1) as u32;
            if let Some(changed) = input.changed_lines {
                if !changed.contains(&line_no) {
                    continue;
                }
            }
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');

            if key == "DEBUG" && value.eq_ignore_ascii_case("true") {
                flag(&mut out, line_no, "DEBUG=true exposes verbose diagnostics", Severity::Medium);
                continue;
            }
            if key == "SSL" && value.eq_ignore_ascii_case("false") {
                flag(&mut out, line_no, "SSL=false disables transport security", Severity::High);
                continue;
            }
            if key == "NODE_ENV" && value.eq_ignore_ascii_case("development") {
                flag(&mut out, line_no, "NODE_ENV=development left in a deployable file", Severity::Medium);
                continue;
            }
            if key == "LOG_LEVEL" && VERBOSE_LOG_LEVELS.contains(&value.to_ascii_lowercase().as_str()) {
                flag(&mut out, line_no, "verbose log level may leak sensitive data", Severity::Low);
                continue;
            }

            if ALLOWLIST.contains(&key) {
                continue;
            }
            if is_placeholder(value) || is_variable_reference(value) {
                continue;
            }
            flag(&mut out, line_no, &format!("non-placeholder value assigned to {key}"), Severity::High);
        }

        if !out.issues.is_empty() {
            out.recommendations.push("keep secrets out of committed .env files; commit only .env.example with placeholders".into());
        }
        out
    }
}

fn flag(out: &mut DetectorOutput, line: u32, message: &str, severity: Severity) {
    out.issues.push(Issue {
        kind: "env_hygiene".into(),
        severity,
        message: message.into(),
        pattern: None,
        line: Some(line),
    });
    let factor = "env_hygiene".to_string();
    if !out.factors.contains(&factor) {
        out.factors.push(factor);
    }
    let score = match severity {
        Severity::Critical => 1.0,
        Severity::High => 0.8,
        Severity::Medium => 0.5,
        Severity::Low => 0.3,
    };
    if score > out.score {
        out.score = score;
    }
    if severity > out.severity {
        out.severity = severity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str, path: &str) -> DetectorOutput {
        let input = DetectorInput { content, path: Some(path), changed_lines: None };
        EnvHygieneDetector.analyze(&input)
    }

    #[test]
    fn ignores_non_env_files() {
        let out = run("SECRET=abc123", "config.json");
        assert!(out.issues.is_empty());
    }

    #[test]
    fn ignores_example_file() {
        let out = run("SECRET=abc123", ".env.example");
        assert!(out.issues.is_empty());
    }

    #[test]
    fn flags_non_placeholder_secret() {
        let out = run("DATABASE_PASSWORD=hunter2", ".env");
        assert!(!out.issues.is_empty());
    }

    #[test]
    fn allows_allowlisted_keys() {
        let out = run("PORT=8080\nNODE_ENV=production", ".env");
        assert!(out.issues.is_empty());
    }

    #[test]
    fn flags_debug_true() {
        let out = run("DEBUG=true", ".env.local");
        assert!(out.issues.iter().any(|i| i.message.contains("DEBUG")));
    }

    #[test]
    fn ignores_variable_references_and_placeholders() {
        let out = run("API_URL=$BASE_URL\nAPI_KEY=your_key_here", ".env");
        assert!(out.issues.is_empty());
    }

    #[test]
    fn restricts_to_changed_lines_when_present() {
        let content = "DATABASE_PASSWORD=hunter2\nPORT=8080";
        let changed: std::collections::BTreeSet<u32> = [2].into_iter().collect();
        let input = DetectorInput { content, path: Some(".env"), changed_lines: Some(&changed) };
        let out = EnvHygieneDetector.analyze(&input);
        assert!(out.issues.is_empty(), "line 1's pre-existing secret is outside the diff");
    }
}
