//! Direct/indirect `eval`, `Function` constructor, subprocess spawn/exec,
//! in-VM execution primitives (§4.8).

use std::sync::OnceLock;

use regex::Regex;
use snapback_domain::model::{Issue, Severity};

use super::{scannable_lines, Detector, DetectorInput, DetectorOutput};

struct Pattern {
    regex: &'static str,
    message: &'static str,
    severity: Severity,
}

fn patterns() -> &'static Vec<(Regex, &'static str, Severity)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str, Severity)>> = OnceLock::new();
    const RAW: &[Pattern] = &[
        Pattern { regex: r"\beval\s*\(", message: "direct eval() call", severity: Severity::Critical },
        Pattern {
            regex: r"new\s+Function\s*\(",
            message: "Function constructor used to build code from a string",
            severity: Severity::Critical,
        },
        Pattern {
            regex: r"\bvm\.(runInNewContext|runInThisContext|runInContext)\s*\(",
            message: "in-VM execution primitive",
            severity: Severity::High,
        },
        Pattern {
            regex: r"child_process\.(exec|execSync|spawn|spawnSync)\s*\(",
            message: "subprocess spawn/exec call",
            severity: Severity::High,
        },
        Pattern {
            regex: r"\bos\.(system|popen)\s*\(",
            message: "subprocess spawn/exec call",
            severity: Severity::High,
        },
        Pattern {
            regex: r"\bsubprocess\.(run|call|Popen|check_output)\s*\(",
            message: "subprocess spawn/exec call",
            severity: Severity::High,
        },
    ];
    PATTERNS.get_or_init(|| {
        RAW.iter()
            .map(|p| (Regex::new(p.regex).unwrap(), p.message, p.severity))
            .collect()
    })
}

pub struct DangerousApisDetector;

impl Detector for DangerousApisDetector {
    fn name(&self) -> &'static str {
        "dangerous_apis"
    }

    fn analyze(&self, input: &DetectorInput) -> DetectorOutput {
        let mut out = DetectorOutput::clean();

        for (line_no, line) in scannable_lines(input) {
            for (regex, message, severity) in patterns() {
                if regex.is_match(line) {
                    out.issues.push(Issue {
                        kind: "dangerous_api".into(),
                        severity: *severity,
                        message: (*message).into(),
                        pattern: Some(regex.as_str().to_string()),
                        line: Some(line_no),
                    });
                    let factor = "dangerous_api".to_string();
                    if !out.factors.contains(&factor) {
                        out.factors.push(factor);
                    }
                    let score = match severity {
                        Severity::Critical => 1.0,
                        Severity::High => 0.8,
                        Severity::Medium => 0.5,
                        Severity::Low => 0.2,
                    };
                    if score > out.score {
                        out.score = score;
                    }
                    if *severity > out.severity {
                        out.severity = *severity;
                    }
                }
            }
        }

        if !out.issues.is_empty() {
            out.recommendations.push(
                "avoid dynamic code execution and shell-spawning APIs; use explicit, statically analyzable calls".into(),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str) -> DetectorOutput {
        let input = DetectorInput { content, path: None, changed_lines: None };
        DangerousApisDetector.analyze(&input)
    }

    #[test]
    fn flags_eval() {
        let out = run("eval(userInput);");
        assert!(out.issues.iter().any(|i| i.severity == Severity::Critical));
    }

    #[test]
    fn flags_function_constructor() {
        let out = run("const f = new Function('a', 'return a + 1');");
        assert!(!out.issues.is_empty());
    }

    #[test]
    fn flags_subprocess_exec() {
        let out = run("child_process.exec(cmd);");
        assert!(out.issues.iter().any(|i| i.severity == Severity::High));
    }

    #[test]
    fn ignores_unrelated_calls() {
        let out = run("console.log('hello');");
        assert!(out.issues.is_empty());
    }
}
