//! `snapback-auth` — the Auth Resolver (§4.3): caching, tier mapping, and
//! tool-access gating on top of a pluggable verification backend.

pub mod cache;
pub mod resolver;
pub mod tier;
pub mod verifier;

pub use resolver::{AuthResolver, ToolAccess};
pub use tier::tier_from_metadata;
pub use verifier::{AlwaysUnavailableVerifier, KeyVerifier, StaticTokenVerifier, VerifiedMetadata};
