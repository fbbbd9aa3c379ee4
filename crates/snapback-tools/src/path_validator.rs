//! Path Validator (§4.5): the security-critical sub-component. Generalized
//! from the teacher's `file_ops::validate_path` (raw `..` rejection,
//! canonicalize-longest-existing-prefix, containment check) with every
//! additional rejection predicate §4.5 names.

use std::path::{Component, Path, PathBuf};

use snapback_domain::error::{Error, Result};

/// Coarse reason tag reported to telemetry on rejection (§4.5) — never the
/// full path, never the detailed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    EmptyOrWhitespace,
    NulByte,
    EncodedTraversalToken,
    ParentDirSegment,
    WindowsRootedPath,
    OutsideWorkspace,
    ParentMissing,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyOrWhitespace => "empty_or_whitespace",
            Self::NulByte => "nul_byte",
            Self::EncodedTraversalToken => "encoded_traversal_token",
            Self::ParentDirSegment => "parent_dir_segment",
            Self::WindowsRootedPath => "windows_rooted_path",
            Self::OutsideWorkspace => "outside_workspace",
            Self::ParentMissing => "parent_missing",
        }
    }
}

const ENCODED_TRAVERSAL_TOKENS: &[&str] = &[
    "%2e%2e%2f", "%2e%2e/", "..%2f", "%252e", "%252f", "%2e%2e%5c", "..%5c",
];

/// `≤100` bytes, for the telemetry sample — never the full path (§4.5).
fn truncate_sample(raw: &str) -> String {
    raw.chars().take(100).collect()
}

fn report_rejection(reason: RejectionReason, raw: &str) {
    tracing::warn!(
        reason = reason.as_str(),
        path_sample = %truncate_sample(raw),
        "path validation rejected"
    );
}

/// Resolves `candidate` against `workspace_root`, returning the real
/// absolute path iff it exists inside the root after following symlinks.
/// The returned error never carries the full candidate path.
pub fn validate_path(workspace_root: &Path, candidate: &str) -> Result<PathBuf> {
    let reject = |reason: RejectionReason| -> Result<PathBuf> {
        report_rejection(reason, candidate);
        Err(Error::PathSecurity)
    };

    if candidate.trim().is_empty() {
        return reject(RejectionReason::EmptyOrWhitespace);
    }
    if candidate.contains('\0') {
        return reject(RejectionReason::NulByte);
    }

    let lowered = candidate.to_ascii_lowercase();
    if ENCODED_TRAVERSAL_TOKENS.iter().any(|tok| lowered.contains(tok)) {
        return reject(RejectionReason::EncodedTraversalToken);
    }

    // Windows-like UNC/drive-letter rejection, even on non-Windows hosts —
    // a Rust host running this server could still receive such a string
    // from a remote client.
    if candidate.starts_with("\\\\") {
        return reject(RejectionReason::WindowsRootedPath);
    }
    if candidate.len() >= 2
        && candidate.as_bytes()[0].is_ascii_alphabetic()
        && candidate.as_bytes()[1] == b':'
    {
        return reject(RejectionReason::WindowsRootedPath);
    }

    let requested_path = Path::new(candidate);
    // Segment-equality, not substring: `config..json` must be accepted.
    for component in requested_path.components() {
        if matches!(component, Component::ParentDir) {
            return reject(RejectionReason::ParentDirSegment);
        }
    }

    let canonical_root = match workspace_root.canonicalize() {
        Ok(r) => r,
        Err(_) => return reject(RejectionReason::ParentMissing),
    };

    let joined = canonical_root.join(requested_path);

    let parent = match joined.parent() {
        Some(p) => p,
        None => return reject(RejectionReason::ParentMissing),
    };
    if !parent.exists() {
        return reject(RejectionReason::ParentMissing);
    }

    let resolved = if joined.exists() {
        match joined.canonicalize() {
            Ok(r) => r,
            Err(_) => return reject(RejectionReason::OutsideWorkspace),
        }
    } else {
        let canonical_parent = match parent.canonicalize() {
            Ok(p) => p,
            Err(_) => return reject(RejectionReason::ParentMissing),
        };
        match joined.file_name() {
            Some(name) => canonical_parent.join(name),
            None => return reject(RejectionReason::OutsideWorkspace),
        }
    };

    let within_root = resolved == canonical_root
        || resolved.starts_with(canonical_root.join(""));
    if !within_root {
        return reject(RejectionReason::OutsideWorkspace);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn rejects_empty_or_whitespace() {
        let ws = workspace();
        assert!(validate_path(ws.path(), "   ").is_err());
        assert!(validate_path(ws.path(), "").is_err());
    }

    #[test]
    fn rejects_nul_byte() {
        let ws = workspace();
        assert!(validate_path(ws.path(), "a\0b").is_err());
    }

    #[test]
    fn rejects_encoded_traversal_tokens() {
        let ws = workspace();
        assert!(validate_path(ws.path(), "%2e%2e%2fetc/passwd").is_err());
        assert!(validate_path(ws.path(), "..%2fetc").is_err());
    }

    #[test]
    fn rejects_parent_dir_segment_but_accepts_dotdot_in_filename() {
        let ws = workspace();
        assert!(validate_path(ws.path(), "../escape.txt").is_err());
        std::fs::write(ws.path().join("config..json"), b"{}").unwrap();
        assert!(validate_path(ws.path(), "config..json").is_ok());
    }

    #[test]
    fn rejects_windows_rooted_paths() {
        let ws = workspace();
        assert!(validate_path(ws.path(), "\\\\server\\share\\file").is_err());
        assert!(validate_path(ws.path(), "C:\\windows\\system32").is_err());
    }

    #[test]
    fn accepts_new_file_under_existing_dir() {
        let ws = workspace();
        let resolved = validate_path(ws.path(), "new-file.txt").unwrap();
        assert!(resolved.starts_with(ws.path().canonicalize().unwrap()));
    }

    #[test]
    fn rejects_missing_parent_directory() {
        let ws = workspace();
        assert!(validate_path(ws.path(), "missing-dir/file.txt").is_err());
    }

    #[test]
    fn rejects_symlink_escaping_workspace() {
        let ws = workspace();
        let outside = workspace();
        std::fs::write(outside.path().join("secret.txt"), b"secret").unwrap();

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(outside.path(), ws.path().join("escape")).unwrap();
            assert!(validate_path(ws.path(), "escape/secret.txt").is_err());
        }
    }
}
