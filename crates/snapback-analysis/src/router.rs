//! Analysis Router (§4.6): `analyze(code, userContext) → AnalysisResult`.

use std::collections::BTreeSet;

use serde_json::json;
use snapback_domain::model::{FeatureFlagSnapshot, Tier};

use crate::facade::LocalAnalyzer;
use crate::upstream::UpstreamClient;

const UPGRADE_RECOMMENDATION: &str =
    "upgrade to a paid tier to run this analysis against the full ML-backed detection service";

pub struct UserContext {
    pub tier: Tier,
    pub feature_flags: FeatureFlagSnapshot,
}

impl UserContext {
    fn ml_detection_enabled(&self) -> bool {
        self.feature_flags.get("ml-detection").copied().unwrap_or(true)
    }
}

pub struct AnalysisRouter {
    upstream: Option<UpstreamClient>,
    local: LocalAnalyzer,
}

impl AnalysisRouter {
    pub fn new(upstream: Option<UpstreamClient>) -> Self {
        Self { upstream, local: LocalAnalyzer::default() }
    }

    pub async fn analyze(
        &self,
        code: &str,
        path: Option<&str>,
        changed_lines: Option<&BTreeSet<u32>>,
        ctx: &UserContext,
    ) -> snapback_domain::Result<snapback_domain::model::AnalysisResult> {
        if ctx.tier == Tier::Free {
            let mut result = self.local.analyze(code, path, changed_lines);
            result.upgrade_prompt = true;
            result.recommendations.push(UPGRADE_RECOMMENDATION.to_string());
            return Ok(result);
        }

        if let Some(upstream) = &self.upstream {
            if ctx.ml_detection_enabled() {
                let mut payload = json!({ "code": code });
                if let Some(path) = path {
                    payload["path"] = json!(path);
                }
                if let Some(lines) = changed_lines {
                    payload["changedLines"] = json!(lines.iter().collect::<Vec<_>>());
                }

                match upstream.analyze(&payload).await {
                    Ok(result) => return Ok(result),
                    Err(err) => {
                        tracing::warn!(error = %err, "upstream analysis failed, falling back to local analyzer");
                    }
                }
            }
        }

        Ok(self.local.analyze(code, path, changed_lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx(tier: Tier) -> UserContext {
        UserContext { tier, feature_flags: HashMap::new() }
    }

    #[tokio::test]
    async fn free_tier_always_uses_local_analyzer_with_upgrade_prompt() {
        let router = AnalysisRouter::new(None);
        let result = router.analyze("const x = 1;", None, None, &ctx(Tier::Free)).await.unwrap();
        assert!(result.upgrade_prompt);
        assert!(result.recommendations.iter().any(|r| r == UPGRADE_RECOMMENDATION));
    }

    #[tokio::test]
    async fn pro_tier_without_upstream_falls_back_to_local() {
        let router = AnalysisRouter::new(None);
        let result = router.analyze("const x = 1;", None, None, &ctx(Tier::Pro)).await.unwrap();
        assert!(!result.upgrade_prompt);
    }

    #[tokio::test]
    async fn pro_tier_with_ml_detection_disabled_uses_local() {
        let router = AnalysisRouter::new(None);
        let mut context = ctx(Tier::Pro);
        context.feature_flags.insert("ml-detection".into(), false);
        let result = router.analyze("const x = 1;", None, None, &context).await.unwrap();
        assert!(!result.upgrade_prompt);
    }
}
