//! The `RequestHandler` implementation (§2 data flow): every JSON-RPC
//! request lands here, in order, through auth resolution, tier gating,
//! input validation and tool dispatch.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use snapback_analysis::dependency_change::diff_dependencies;
use snapback_analysis::router::UserContext;
use snapback_auth::ToolAccess;
use snapback_domain::model::Tier;
use snapback_domain::Error;
use snapback_protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallContent, ToolCallResult,
};
use snapback_snapshot::CreateOptions;
use snapback_telemetry::{measured, sanitize};
use snapback_tools::input::validate_arguments;
use snapback_tools::path_validator::validate_path;
use snapback_tools::registry::ResolvedTool;
use snapback_transport::RequestHandler;

use crate::state::AppState;

#[derive(Clone)]
pub struct Handler {
    pub state: AppState,
}

fn tier_str(tier: Tier) -> &'static str {
    match tier {
        Tier::Free => "free",
        Tier::Pro => "pro",
        Tier::Admin => "admin",
    }
}

/// Converts the catalog's diff-shaped `changes` array into a flat content
/// string plus the 1-based line numbers that were added, the form the
/// local analyzer and the upstream payload both expect (§4.6, §4.8).
/// Removed lines never appear in the returned content.
fn changes_to_content(changes: &[Value]) -> (String, BTreeSet<u32>) {
    let mut content = String::new();
    let mut changed_lines = BTreeSet::new();
    let mut line_no: u32 = 0;

    for change in changes {
        let removed = change.get("removed").and_then(Value::as_bool).unwrap_or(false);
        if removed {
            continue;
        }
        let added = change.get("added").and_then(Value::as_bool).unwrap_or(false);
        let value = change.get("value").and_then(Value::as_str).unwrap_or("");

        for line in value.split_inclusive('\n') {
            line_no += 1;
            content.push_str(line);
            if !line.ends_with('\n') {
                content.push('\n');
            }
            if added {
                changed_lines.insert(line_no);
            }
        }
    }

    (content, changed_lines)
}

/// Resolves `target_path` against the workspace root for `restore_snapshot`,
/// creating it if necessary so the path validator's canonicalize-then-check
/// has something real to resolve against. Rejects any `..` segment before
/// ever touching the filesystem.
fn resolve_restore_target(workspace_root: &Path, target_path: &str) -> snapback_domain::Result<PathBuf> {
    use std::path::Component;

    if Path::new(target_path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(Error::PathSecurity);
    }

    let joined = workspace_root.join(target_path.trim_start_matches("./"));
    std::fs::create_dir_all(&joined)?;
    let canonical_root = workspace_root.canonicalize()?;
    let canonical = joined.canonicalize()?;
    if !canonical.starts_with(&canonical_root) {
        return Err(Error::PathSecurity);
    }
    Ok(canonical)
}

impl Handler {
    fn public_error(&self, err: &Error, context: &str) -> ToolCallResult {
        let sanitized = sanitize(err, context, self.state.production);
        ToolCallResult {
            content: vec![
                ToolCallContent::text(sanitized.public_message),
                ToolCallContent::json(json!({ "code": sanitized.code, "logId": sanitized.log_id })),
            ],
            is_error: true,
        }
    }

    async fn dispatch_tool(&self, name: &str, arguments: Value, ctx: &UserContext) -> ToolCallResult {
        match name {
            "snapback.analyze_risk" => {
                let changes = arguments
                    .get("changes")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let (content, changed_lines) = changes_to_content(&changes);
                let (result, _) = measured("analysis.local", {
                    let analysis = self.state.analysis.clone();
                    async move { analysis.analyze(&content, None, Some(&changed_lines), ctx).await }
                })
                .await;
                match result {
                    Ok(result) => ToolCallResult::ok(vec![ToolCallContent::json(
                        serde_json::to_value(result).unwrap_or(Value::Null),
                    )]),
                    Err(e) => self.public_error(&e, "analyze_risk"),
                }
            }

            "snapback.check_dependencies" => {
                let before = arguments.get("before").cloned().unwrap_or(json!({}));
                let after = arguments.get("after").cloned().unwrap_or(json!({}));
                let changes = diff_dependencies(&before, &after);
                ToolCallResult::ok(vec![ToolCallContent::json(
                    serde_json::to_value(changes).unwrap_or(Value::Null),
                )])
            }

            "snapback.create_snapshot" => self.create_snapshot(&arguments).await,

            "snapback.list_snapshots" => {
                let snapshots = self.state.snapshots.list();
                ToolCallResult::ok(vec![ToolCallContent::json(
                    serde_json::to_value(snapshots).unwrap_or(Value::Null),
                )])
            }

            "snapback.restore_snapshot" => self.restore_snapshot(&arguments).await,

            "catalog.list_tools" => {
                let tools: Vec<Value> = self
                    .state
                    .tools
                    .external_tools()
                    .into_iter()
                    .map(|(server_id, tool)| json!({ "serverId": server_id, "tool": tool }))
                    .collect();
                ToolCallResult::ok(vec![ToolCallContent::json(json!({ "tools": tools }))])
            }

            "ctx7.resolve-library-id" => {
                let Some(docs) = self.state.docs.clone() else {
                    return ToolCallResult::error("documentation service is not configured");
                };
                let Some(library_name) = arguments.get("libraryName").and_then(Value::as_str) else {
                    return ToolCallResult::error("libraryName is required");
                };
                let (result, _) =
                    measured("docs.resolve_library_id", docs.resolve_library_id(library_name)).await;
                match result {
                    Ok(value) => ToolCallResult::ok(vec![ToolCallContent::json(value)]),
                    Err(e) => self.public_error(&e, "resolve_library_id"),
                }
            }

            "ctx7.get-library-docs" => {
                let Some(docs) = self.state.docs.clone() else {
                    return ToolCallResult::error("documentation service is not configured");
                };
                let Some(library_id) = arguments.get("context7CompatibleLibraryID").and_then(Value::as_str) else {
                    return ToolCallResult::error("context7CompatibleLibraryID is required");
                };
                let topic = arguments.get("topic").and_then(Value::as_str);
                let tokens = arguments.get("tokens").and_then(Value::as_u64).map(|t| t as u32);
                let (result, _) =
                    measured("docs.get_library_docs", docs.get_library_docs(library_id, topic, tokens)).await;
                match result {
                    Ok(value) => ToolCallResult::ok(vec![ToolCallContent::json(value)]),
                    Err(e) => self.public_error(&e, "get_library_docs"),
                }
            }

            other => ToolCallResult::error(format!("unsupported tool: {other}")),
        }
    }

    async fn create_snapshot(&self, arguments: &Value) -> ToolCallResult {
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        if let Some(entries) = arguments.get("files").and_then(Value::as_array) {
            for entry in entries {
                let (Some(path), Some(content)) = (
                    entry.get("path").and_then(Value::as_str),
                    entry.get("content").and_then(Value::as_str),
                ) else {
                    return ToolCallResult::error("files[].path and files[].content are required");
                };
                files.push((path.to_owned(), content.as_bytes().to_vec()));
            }
        } else if let (Some(path), Some(content)) = (
            arguments.get("filePath").and_then(Value::as_str),
            arguments.get("content").and_then(Value::as_str),
        ) {
            files.push((path.to_owned(), content.as_bytes().to_vec()));
        } else {
            return ToolCallResult::error("either filePath+content or files is required");
        }

        let workspace_root = self.state.config.workspace.resolved_root();
        for (path, _) in &files {
            if validate_path(&workspace_root, path).is_err() {
                self.state.telemetry.record(
                    "path_validation_failed",
                    json!({ "reason": "path_traversal" }),
                );
                return ToolCallResult::error("invalid path");
            }
        }

        let reason = arguments.get("reason").and_then(Value::as_str).map(str::to_owned);
        let options = CreateOptions { description: reason, protected: false };

        let (result, _) = measured("snapshot.create", {
            let store = self.state.snapshots.clone();
            async move { store.create(files, options) }
        })
        .await;

        match result {
            Ok(snapshot) => ToolCallResult::ok(vec![ToolCallContent::json(
                serde_json::to_value(snapshot).unwrap_or(Value::Null),
            )]),
            Err(e) => self.public_error(&e, "create_snapshot"),
        }
    }

    async fn restore_snapshot(&self, arguments: &Value) -> ToolCallResult {
        let Some(snapshot_id) = arguments.get("snapshotId").and_then(Value::as_str) else {
            return ToolCallResult::error("snapshotId is required");
        };
        let target_path = arguments.get("targetPath").and_then(Value::as_str);

        let workspace_root = self.state.config.workspace.resolved_root();
        let target = match target_path {
            Some(t) => match resolve_restore_target(&workspace_root, t) {
                Ok(p) => Some(p),
                Err(_) => {
                    self.state.telemetry.record(
                        "path_validation_failed",
                        json!({ "reason": "path_traversal" }),
                    );
                    return ToolCallResult::error("invalid path");
                }
            },
            None => None,
        };

        let (report, _) = measured("snapshot.restore", {
            let store = self.state.snapshots.clone();
            let id = snapshot_id.to_owned();
            async move {
                store.restore(&id, target.as_deref(), |rel, root| validate_path(root, rel))
            }
        })
        .await;

        if !report.success {
            return ToolCallResult::error(report.errors.join("; "));
        }
        ToolCallResult::ok(vec![ToolCallContent::json(json!({
            "success": report.success,
            "restoredFiles": report.restored_files,
            "errors": report.errors,
        }))])
    }
}

/// Extracts the raw credential carried in `params.apiKey`, empty string
/// (anonymous) if absent — both transports are header-less at the
/// `RequestHandler` seam (§4.1), so the credential travels in-band.
fn extract_api_key(params: &Option<Value>) -> String {
    params
        .as_ref()
        .and_then(|p| p.get("apiKey"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_str_matches_all_variants() {
        assert_eq!(tier_str(Tier::Free), "free");
        assert_eq!(tier_str(Tier::Pro), "pro");
        assert_eq!(tier_str(Tier::Admin), "admin");
    }

    #[test]
    fn changes_to_content_drops_removed_lines_and_tracks_added() {
        let changes = vec![
            json!({ "value": "fn main() {\n" }),
            json!({ "added": true, "value": "    let key = \"AKIA1234567890ABCDEF\";\n" }),
            json!({ "removed": true, "value": "    let key = \"old\";\n" }),
            json!({ "value": "}\n" }),
        ];
        let (content, changed_lines) = changes_to_content(&changes);
        assert_eq!(
            content,
            "fn main() {\n    let key = \"AKIA1234567890ABCDEF\";\n}\n"
        );
        assert_eq!(changed_lines, BTreeSet::from([2]));
    }

    #[test]
    fn changes_to_content_handles_multiline_chunks() {
        let changes = vec![json!({ "added": true, "value": "a\nb\nc" })];
        let (content, changed_lines) = changes_to_content(&changes);
        assert_eq!(content, "a\nb\nc\n");
        assert_eq!(changed_lines, BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn resolve_restore_target_rejects_parent_dir_component() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_restore_target(dir.path(), "../escape").unwrap_err();
        assert!(matches!(err, Error::PathSecurity));
    }

    #[test]
    fn resolve_restore_target_creates_missing_directory_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_restore_target(dir.path(), "out/nested").unwrap();
        assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
        assert!(resolved.is_dir());
    }

    #[test]
    fn extract_api_key_reads_params_api_key() {
        let params = Some(json!({ "name": "snapback.analyze_risk", "apiKey": "k-123" }));
        assert_eq!(extract_api_key(&params), "k-123");
    }

    #[test]
    fn extract_api_key_defaults_to_empty_when_absent() {
        assert_eq!(extract_api_key(&None), "");
        assert_eq!(extract_api_key(&Some(json!({"name": "x"}))), "");
    }
}

#[async_trait]
impl RequestHandler for Handler {
    async fn handle(&self, _session_id: &str, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "list_tools" => {
                let tools = self.state.tools.list();
                JsonRpcResponse::success(request.id, json!({ "tools": tools }))
            }

            "call_tool" => {
                let Some(params) = &request.params else {
                    return JsonRpcResponse::failure(
                        request.id,
                        JsonRpcError::invalid_params("missing params"),
                    );
                };
                let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
                    return JsonRpcResponse::failure(
                        request.id,
                        JsonRpcError::invalid_params("missing params.name"),
                    );
                };
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

                let raw_key = extract_api_key(&request.params);
                let (auth_result, _) = measured("auth.authenticate", self.state.auth.authenticate(&raw_key)).await;

                let Some(descriptor) = self.state.tools.resolve(tool_name) else {
                    return JsonRpcResponse::success(
                        request.id,
                        serde_json::to_value(ToolCallResult::error(format!("unknown tool: {tool_name}")))
                            .unwrap_or(Value::Null),
                    );
                };

                let result = match descriptor {
                    ResolvedTool::Builtin(descriptor) => {
                        match self.state.auth.has_tool_access(&auth_result, descriptor) {
                            ToolAccess::Denied => ToolCallResult::ok(vec![ToolCallContent::text("access denied")]),
                            ToolAccess::UpgradeRequired => {
                                ToolCallResult::upgrade_required(tool_name, tier_str(descriptor.min_tier))
                            }
                            ToolAccess::Granted => {
                                if let Err(e) = validate_arguments(descriptor, &arguments) {
                                    ToolCallResult::error(e.to_string())
                                } else {
                                    let ctx = UserContext {
                                        tier: auth_result.tier,
                                        feature_flags: self.state.config.upstream.feature_flags.clone(),
                                    };
                                    let (result, _) =
                                        measured("tools.call", self.dispatch_tool(tool_name, arguments, &ctx)).await;
                                    result
                                }
                            }
                        }
                    }
                    ResolvedTool::External { .. } => {
                        ToolCallResult::error("external tool delegation is not configured")
                    }
                };

                self.state.telemetry.record(
                    "tool_call",
                    json!({ "name": tool_name, "tier": tier_str(auth_result.tier), "isError": result.is_error }),
                );

                JsonRpcResponse::success(request.id, serde_json::to_value(result).unwrap_or(Value::Null))
            }

            other => JsonRpcResponse::failure(request.id, JsonRpcError::method_not_found(other)),
        }
    }
}
