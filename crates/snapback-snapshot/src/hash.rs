//! Stable content hashing (§3, §4.9): BLAKE3, version-tagged so a future
//! algorithm change is distinguishable from a corrupt digest.

const HASH_TAG: &str = "b3.1";

pub fn content_digest(bytes: &[u8]) -> String {
    format!("{HASH_TAG}:{}", blake3::hash(bytes).to_hex())
}

/// Stable snapshot id over `(path, digest)` pairs: sort by path
/// byte-lexicographic order, join as `"path:digest"` with `|`, hash the
/// joined string (§4.9).
pub fn stable_snapshot_id<'a>(mut entries: Vec<(&'a str, &'a str)>) -> String {
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    let joined = entries
        .iter()
        .map(|(path, digest)| format!("{path}:{digest}"))
        .collect::<Vec<_>>()
        .join("|");
    content_digest(joined.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_version_tagged() {
        assert!(content_digest(b"hello").starts_with("b3.1:"));
    }

    #[test]
    fn id_is_order_independent_of_input_order() {
        let a = stable_snapshot_id(vec![("b.txt", "d2"), ("a.txt", "d1")]);
        let b = stable_snapshot_id(vec![("a.txt", "d1"), ("b.txt", "d2")]);
        assert_eq!(a, b);
    }

    #[test]
    fn id_changes_with_content() {
        let a = stable_snapshot_id(vec![("a.txt", "d1")]);
        let b = stable_snapshot_id(vec![("a.txt", "d2")]);
        assert_ne!(a, b);
    }
}
