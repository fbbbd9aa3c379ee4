//! Tool Registry (§4.4): the fixed catalog from §6, plus namespaced
//! delegation to external MCP servers via [`snapback_protocol::McpManager`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use snapback_domain::model::{Tier, ToolDescriptor};
use snapback_protocol::external::McpManager;
use snapback_protocol::protocol::McpToolDef;

/// What `resolve` found for a given name.
pub enum ResolvedTool<'a> {
    Builtin(&'a ToolDescriptor),
    External { server_id: String, tool: McpToolDef },
}

pub struct ToolRegistry {
    catalog: HashMap<String, ToolDescriptor>,
    external: Arc<McpManager>,
}

impl ToolRegistry {
    /// Builds and validates the static catalog once. Panics on a
    /// duplicate-name catalog, which would be a programming error caught
    /// at startup, not a runtime condition.
    pub fn new(external: Arc<McpManager>) -> Self {
        let mut catalog = HashMap::new();
        for descriptor in builtin_catalog() {
            let prev = catalog.insert(descriptor.name.clone(), descriptor);
            assert!(prev.is_none(), "duplicate tool name in static catalog");
        }
        Self { catalog, external }
    }

    /// Resolves a dotted tool name in constant time: a direct hit in the
    /// static catalog, or a namespaced external server + tool lookup.
    pub fn resolve(&self, name: &str) -> Option<ResolvedTool<'_>> {
        if let Some(descriptor) = self.catalog.get(name) {
            return Some(ResolvedTool::Builtin(descriptor));
        }

        let (prefix, tool_name) = name.split_once('.')?;
        self.external
            .list_tools()
            .into_iter()
            .find(|(server_id, tool)| *server_id == prefix && tool.name == tool_name)
            .map(|(server_id, tool)| ResolvedTool::External {
                server_id: server_id.to_owned(),
                tool: tool.clone(),
            })
    }

    /// Discovery surface for the `list_tools` JSON-RPC method: the static
    /// catalog. External tools are surfaced separately via the
    /// `catalog.list_tools` tool (§6), not mixed into this list, so a
    /// client calling the base protocol method sees a stable set.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut all: Vec<_> = self.catalog.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Aggregated external tools, namespaced — backs the `catalog.list_tools`
    /// tool handler.
    pub fn external_tools(&self) -> Vec<(String, McpToolDef)> {
        self.external
            .list_tools()
            .into_iter()
            .map(|(server_id, tool)| (server_id.to_owned(), tool.clone()))
            .collect()
    }
}

fn builtin_catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "snapback.analyze_risk".into(),
            description: "Diff-aware static risk analysis over a set of code changes.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "changes": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "added": {"type": "boolean"},
                                "removed": {"type": "boolean"},
                                "value": {"type": "string"},
                                "count": {"type": "number"}
                            },
                            "required": ["value"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["changes"],
                "additionalProperties": false
            }),
            requires_backend: false,
            min_tier: Tier::Free,
        },
        ToolDescriptor {
            name: "snapback.check_dependencies".into(),
            description: "Compares two dependency maps and reports the change in risk.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "before": {"type": "object"},
                    "after": {"type": "object"}
                },
                "required": ["before", "after"],
                "additionalProperties": false
            }),
            requires_backend: false,
            min_tier: Tier::Free,
        },
        ToolDescriptor {
            name: "snapback.create_snapshot".into(),
            description: "Creates a content-addressed snapshot of one or more files.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filePath": {"type": "string"},
                    "reason": {"type": "string"},
                    "content": {"type": "string"},
                    "files": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "path": {"type": "string"},
                                "content": {"type": "string"}
                            },
                            "required": ["path", "content"],
                            "additionalProperties": false
                        }
                    }
                },
                "additionalProperties": false
            }),
            requires_backend: true,
            min_tier: Tier::Pro,
        },
        ToolDescriptor {
            name: "snapback.list_snapshots".into(),
            description: "Lists known snapshots in descending creation order.".into(),
            input_schema: json!({"type": "object", "additionalProperties": false}),
            requires_backend: true,
            min_tier: Tier::Pro,
        },
        ToolDescriptor {
            name: "snapback.restore_snapshot".into(),
            description: "Restores a snapshot, optionally writing it to a target path.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "snapshotId": {"type": "string"},
                    "targetPath": {"type": "string"}
                },
                "required": ["snapshotId"],
                "additionalProperties": false
            }),
            requires_backend: true,
            min_tier: Tier::Pro,
        },
        ToolDescriptor {
            name: "catalog.list_tools".into(),
            description: "Lists tools contributed by configured external MCP servers.".into(),
            input_schema: json!({"type": "object", "additionalProperties": false}),
            requires_backend: false,
            min_tier: Tier::Free,
        },
        ToolDescriptor {
            name: "ctx7.resolve-library-id".into(),
            description: "Resolves a library name to a documentation-proxy library id.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"libraryName": {"type": "string"}},
                "required": ["libraryName"],
                "additionalProperties": false
            }),
            requires_backend: false,
            min_tier: Tier::Free,
        },
        ToolDescriptor {
            name: "ctx7.get-library-docs".into(),
            description: "Fetches documentation for a resolved library id.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "context7CompatibleLibraryID": {"type": "string"},
                    "topic": {"type": "string"},
                    "tokens": {"type": "number"}
                },
                "required": ["context7CompatibleLibraryID"],
                "additionalProperties": false
            }),
            requires_backend: false,
            min_tier: Tier::Free,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_catalog_resolves_every_advertised_name() {
        let registry = ToolRegistry::new(Arc::new(McpManager::empty()));
        for descriptor in builtin_catalog() {
            assert!(matches!(
                registry.resolve(&descriptor.name),
                Some(ResolvedTool::Builtin(_))
            ));
        }
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        let registry = ToolRegistry::new(Arc::new(McpManager::empty()));
        assert!(registry.resolve("nonexistent.tool").is_none());
    }

    #[test]
    fn list_is_sorted_and_stable() {
        let registry = ToolRegistry::new(Arc::new(McpManager::empty()));
        let names: Vec<_> = registry.list().into_iter().map(|d| d.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
