//! The external verification contract (§4.3): pluggable so the coprocessor
//! can defer to whatever identity backend a deployment has, without the
//! resolver or its cache knowing the details. Ships one concrete
//! implementation — a constant-time compare against the two configured
//! bearer tokens — grounded on the teacher's own bearer-token middleware.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use snapback_domain::error::{Error, Result};
use subtle::ConstantTimeEq;

/// Caller metadata as returned by the verification backend, prior to tier
/// mapping. `tier_hint` is a raw string (e.g. `"admin"`, `"pro"`) — the tier
/// utility (`crate::tier`) is the single place that turns it into a [`Tier`].
#[derive(Debug, Clone, Default)]
pub struct VerifiedMetadata {
    pub tier_hint: Option<String>,
    pub permissions: Vec<String>,
    pub user_id: Option<String>,
    pub org_id: Option<String>,
}

#[async_trait]
pub trait KeyVerifier: Send + Sync {
    /// Returns `Ok(None)` for "key does not match any known principal"
    /// (distinct from a verifier-side failure, which is `Err`).
    async fn verify(&self, raw_key: &str) -> Result<Option<VerifiedMetadata>>;
}

/// Verifies against two configured tokens (admin, api/pro) hashed once at
/// construction — the same shape as the teacher's `AppState.api_token_hash`,
/// generalized to two tiers and moved behind the `KeyVerifier` trait.
pub struct StaticTokenVerifier {
    admin_hash: Option<[u8; 32]>,
    api_hash: Option<[u8; 32]>,
    /// Whether an empty raw key is accepted as an anonymous free-tier
    /// principal (development/test only, §4.3).
    allow_anonymous: bool,
}

impl StaticTokenVerifier {
    pub fn new(admin_token: Option<&str>, api_token: Option<&str>, allow_anonymous: bool) -> Self {
        Self {
            admin_hash: admin_token
                .filter(|t| !t.is_empty())
                .map(|t| Sha256::digest(t.as_bytes()).into()),
            api_hash: api_token
                .filter(|t| !t.is_empty())
                .map(|t| Sha256::digest(t.as_bytes()).into()),
            allow_anonymous,
        }
    }

    fn matches(hash: &[u8; 32], candidate: &[u8; 32]) -> bool {
        bool::from(hash.ct_eq(candidate))
    }
}

#[async_trait]
impl KeyVerifier for StaticTokenVerifier {
    async fn verify(&self, raw_key: &str) -> Result<Option<VerifiedMetadata>> {
        if raw_key.is_empty() {
            return if self.allow_anonymous {
                Ok(Some(VerifiedMetadata {
                    tier_hint: Some("free".into()),
                    ..Default::default()
                }))
            } else {
                Ok(None)
            };
        }

        let candidate: [u8; 32] = Sha256::digest(raw_key.as_bytes()).into();

        if let Some(hash) = &self.admin_hash {
            if Self::matches(hash, &candidate) {
                return Ok(Some(VerifiedMetadata {
                    tier_hint: Some("admin".into()),
                    ..Default::default()
                }));
            }
        }
        if let Some(hash) = &self.api_hash {
            if Self::matches(hash, &candidate) {
                return Ok(Some(VerifiedMetadata {
                    tier_hint: Some("pro".into()),
                    ..Default::default()
                }));
            }
        }
        Ok(None)
    }
}

/// A verifier that always fails, used to exercise the resolver's
/// verifier-unavailable path without standing up a real backend.
pub struct AlwaysUnavailableVerifier;

#[async_trait]
impl KeyVerifier for AlwaysUnavailableVerifier {
    async fn verify(&self, _raw_key: &str) -> Result<Option<VerifiedMetadata>> {
        Err(Error::Auth("verifier unreachable".into()))
    }
}
