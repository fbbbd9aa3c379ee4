//! Input Validator (§4.5): strictness and size caps applied to tool
//! arguments before they reach any handler. The per-tool JSON-Schema
//! (carried on each [`ToolDescriptor`]) covers shape; this module covers
//! the size budgets §4.5 names by field convention across the catalog.

use snapback_domain::error::{Error, Result};
use snapback_domain::model::ToolDescriptor;

const MAX_CODE_BYTES: usize = 1024 * 1024;
const MAX_PATH_BYTES: usize = 4 * 1024;
const MAX_CONTEXT_BYTES: usize = 100 * 1024;
const MAX_REASON_BYTES: usize = 1024;
const MAX_ISSUES_DISPLAYED: usize = 100;

/// Rejects unknown top-level fields per the tool's schema (strictness) and
/// enforces the size caps §4.5 names on the conventional field names that
/// carry each kind of payload across the catalog.
pub fn validate_arguments(descriptor: &ToolDescriptor, arguments: &serde_json::Value) -> Result<()> {
    let obj = arguments
        .as_object()
        .ok_or_else(|| Error::Validation("arguments must be a JSON object".into()))?;

    if let Some(schema_props) = descriptor
        .input_schema
        .get("properties")
        .and_then(|p| p.as_object())
    {
        for key in obj.keys() {
            if !schema_props.contains_key(key) {
                return Err(Error::Validation(format!("unexpected field: {key}")));
            }
        }
    }

    check_size(obj, "content", MAX_CODE_BYTES, "content")?;
    check_size(obj, "filePath", MAX_PATH_BYTES, "filePath")?;
    check_size(obj, "targetPath", MAX_PATH_BYTES, "targetPath")?;
    check_size(obj, "surroundingCode", MAX_CONTEXT_BYTES, "surroundingCode")?;
    check_size(obj, "reason", MAX_REASON_BYTES, "reason")?;

    if let Some(files) = obj.get("files").and_then(|v| v.as_array()) {
        for file in files {
            if let Some(file_obj) = file.as_object() {
                check_size(file_obj, "path", MAX_PATH_BYTES, "files[].path")?;
                check_size(file_obj, "content", MAX_CODE_BYTES, "files[].content")?;
            }
        }
    }

    Ok(())
}

fn check_size(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    max_bytes: usize,
    label: &str,
) -> Result<()> {
    if let Some(s) = obj.get(field).and_then(|v| v.as_str()) {
        if s.len() > max_bytes {
            return Err(Error::Validation(format!("{label} exceeds maximum size of {max_bytes} bytes")));
        }
    }
    Ok(())
}

/// Truncates a displayed issue list to the cap §4.5 names.
pub fn truncate_issues<T>(issues: Vec<T>) -> Vec<T> {
    let mut issues = issues;
    issues.truncate(MAX_ISSUES_DISPLAYED);
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snapback_domain::model::Tier;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "snapback.analyze_risk".into(),
            description: String::new(),
            input_schema: json!({
                "type": "object",
                "properties": {"content": {"type": "string"}, "filePath": {"type": "string"}}
            }),
            requires_backend: false,
            min_tier: Tier::Free,
        }
    }

    #[test]
    fn rejects_unknown_field() {
        let args = json!({"content": "x", "unexpected": true});
        assert!(validate_arguments(&descriptor(), &args).is_err());
    }

    #[test]
    fn rejects_oversized_content() {
        let args = json!({"content": "a".repeat(MAX_CODE_BYTES + 1)});
        assert!(validate_arguments(&descriptor(), &args).is_err());
    }

    #[test]
    fn accepts_within_caps() {
        let args = json!({"content": "fn main() {}", "filePath": "src/main.rs"});
        assert!(validate_arguments(&descriptor(), &args).is_ok());
    }

    #[test]
    fn truncate_caps_issue_list() {
        let issues: Vec<u32> = (0..150).collect();
        assert_eq!(truncate_issues(issues).len(), MAX_ISSUES_DISPLAYED);
    }
}
