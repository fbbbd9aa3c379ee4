//! Single deterministic metadata → tier mapping (§4.3: "map metadata to
//! tier via a single deterministic function — explicit mapping table").

use snapback_domain::model::Tier;

use crate::verifier::VerifiedMetadata;

pub fn tier_from_metadata(metadata: &VerifiedMetadata) -> Tier {
    match metadata.tier_hint.as_deref() {
        Some("admin") => Tier::Admin,
        Some("pro") => Tier::Pro,
        _ => Tier::Free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_hint_maps_to_free() {
        let meta = VerifiedMetadata {
            tier_hint: Some("enterprise-legacy".into()),
            ..Default::default()
        };
        assert_eq!(tier_from_metadata(&meta), Tier::Free);
    }

    #[test]
    fn known_hints_map_exactly() {
        assert_eq!(
            tier_from_metadata(&VerifiedMetadata { tier_hint: Some("admin".into()), ..Default::default() }),
            Tier::Admin
        );
        assert_eq!(
            tier_from_metadata(&VerifiedMetadata { tier_hint: Some("pro".into()), ..Default::default() }),
            Tier::Pro
        );
    }
}
