//! Auth Resolver (§4.3): `authenticate(rawKey) → AuthResult`,
//! `hasToolAccess(authResult, tool) → ToolAccess`.

use std::sync::Arc;

use snapback_domain::model::{AuthResult, Tier, ToolDescriptor};

use crate::cache::AuthCache;
use crate::tier::tier_from_metadata;
use crate::verifier::KeyVerifier;

/// The outcome of a tool-access check — deliberately not a `bool`, since
/// the free/backend-gated case is a *successful* structured response
/// (§4.3), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAccess {
    Granted,
    /// Caller is valid but below the tool's tier and the tool is
    /// backend-gated: the caller gets `snapback.upgrade_required`, not an
    /// error.
    UpgradeRequired,
    /// Caller is invalid, or valid but below tier on a non-backend-gated
    /// tool (plain access denial).
    Denied,
}

pub struct AuthResolver {
    cache: AuthCache,
    verifier: Arc<dyn KeyVerifier>,
}

impl AuthResolver {
    pub fn new(verifier: Arc<dyn KeyVerifier>) -> Self {
        Self {
            cache: AuthCache::new(),
            verifier,
        }
    }

    /// Resolves a raw credential to an [`AuthResult`], consulting the cache
    /// first. Never propagates a verifier error — degrades to
    /// [`AuthResult::verifier_unavailable`] instead (§4.3).
    pub async fn authenticate(&self, raw_key: &str) -> AuthResult {
        if let Some(cached) = self.cache.get(raw_key) {
            return cached;
        }

        let result = match self.verifier.verify(raw_key).await {
            Ok(Some(metadata)) => AuthResult {
                valid: true,
                tier: tier_from_metadata(&metadata),
                permissions: metadata.permissions,
                user_id: metadata.user_id,
                org_id: metadata.org_id,
                error: None,
            },
            Ok(None) => AuthResult {
                valid: false,
                tier: Tier::Free,
                permissions: Vec::new(),
                user_id: None,
                org_id: None,
                error: Some("invalid credential".into()),
            },
            Err(e) => {
                tracing::warn!(error = %e, "auth verifier unavailable");
                AuthResult::verifier_unavailable()
            }
        };

        self.cache.insert(raw_key.to_owned(), result.clone());
        result
    }

    /// Tools absent a tier requirement (`min_tier == Tier::Free`) are open
    /// to any valid principal (§4.3).
    pub fn has_tool_access(&self, auth: &AuthResult, tool: &ToolDescriptor) -> ToolAccess {
        if !auth.valid {
            return ToolAccess::Denied;
        }
        if auth.tier.at_least(tool.min_tier) {
            return ToolAccess::Granted;
        }
        if tool.requires_backend {
            ToolAccess::UpgradeRequired
        } else {
            ToolAccess::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::{AlwaysUnavailableVerifier, StaticTokenVerifier};
    use serde_json::json;

    fn descriptor(min_tier: Tier, requires_backend: bool) -> ToolDescriptor {
        ToolDescriptor {
            name: "snapback.analyze_risk".into(),
            description: String::new(),
            input_schema: json!({}),
            requires_backend,
            min_tier,
        }
    }

    #[tokio::test]
    async fn valid_api_token_maps_to_pro() {
        let verifier = Arc::new(StaticTokenVerifier::new(None, Some("k".repeat(40).as_str()), false));
        let resolver = AuthResolver::new(verifier);
        let auth = resolver.authenticate(&"k".repeat(40)).await;
        assert!(auth.valid);
        assert_eq!(auth.tier, Tier::Pro);
    }

    #[tokio::test]
    async fn unknown_key_is_invalid() {
        let verifier = Arc::new(StaticTokenVerifier::new(None, None, false));
        let resolver = AuthResolver::new(verifier);
        let auth = resolver.authenticate("anything").await;
        assert!(!auth.valid);
    }

    #[tokio::test]
    async fn verifier_failure_degrades_to_free_invalid() {
        let resolver = AuthResolver::new(Arc::new(AlwaysUnavailableVerifier));
        let auth = resolver.authenticate("key").await;
        assert!(!auth.valid);
        assert_eq!(auth.tier, Tier::Free);
        assert_eq!(auth.error.as_deref(), Some("authentication service unavailable"));
    }

    #[test]
    fn free_tier_on_backend_gated_tool_needs_upgrade() {
        let resolver = AuthResolver::new(Arc::new(StaticTokenVerifier::new(None, None, false)));
        let auth = AuthResult {
            valid: true,
            tier: Tier::Free,
            permissions: vec![],
            user_id: None,
            org_id: None,
            error: None,
        };
        let tool = descriptor(Tier::Pro, true);
        assert_eq!(resolver.has_tool_access(&auth, &tool), ToolAccess::UpgradeRequired);
    }

    #[test]
    fn free_tier_on_non_gated_tool_is_denied_not_upgraded() {
        let resolver = AuthResolver::new(Arc::new(StaticTokenVerifier::new(None, None, false)));
        let auth = AuthResult {
            valid: true,
            tier: Tier::Free,
            permissions: vec![],
            user_id: None,
            org_id: None,
            error: None,
        };
        let tool = descriptor(Tier::Pro, false);
        assert_eq!(resolver.has_tool_access(&auth, &tool), ToolAccess::Denied);
    }

    #[test]
    fn tool_open_to_any_valid_principal_when_min_tier_free() {
        let resolver = AuthResolver::new(Arc::new(StaticTokenVerifier::new(None, None, false)));
        let auth = AuthResult {
            valid: true,
            tier: Tier::Free,
            permissions: vec![],
            user_id: None,
            org_id: None,
            error: None,
        };
        let tool = descriptor(Tier::Free, false);
        assert_eq!(resolver.has_tool_access(&auth, &tool), ToolAccess::Granted);
    }
}
