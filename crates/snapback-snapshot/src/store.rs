//! Snapshot Store (§4.9): content-addressed file storage plus a JSON
//! metadata index, write-temp-then-rename throughout (the teacher's
//! `rewrite_jsonl` idiom generalized to per-object and per-snapshot files).

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use snapback_domain::error::{Error, Result};
use snapback_domain::model::{RestoreReport, Snapshot, SnapshotFile};

use crate::hash::{content_digest, stable_snapshot_id};

const MAX_LISTED: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub description: Option<String>,
    pub protected: bool,
}

/// `(path, content)` pairs supplied to [`SnapshotStore::create`].
pub type FileInput = (String, Vec<u8>);

pub struct SnapshotStore {
    root: PathBuf,
    /// Serializes `create` so concurrent identical-input calls dedup
    /// without corrupting the object/metadata stores (§4.9 concurrency).
    create_lock: Mutex<()>,
    /// In-memory index mirrors the on-disk metadata files; avoids a
    /// directory scan on every `list`/`get`.
    index: RwLock<HashMap<String, Snapshot>>,
}

impl SnapshotStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("objects"))?;
        std::fs::create_dir_all(root.join("snapshots"))?;

        let mut index = HashMap::new();
        let snapshots_dir = root.join("snapshots");
        if let Ok(entries) = std::fs::read_dir(&snapshots_dir) {
            for entry in entries.flatten() {
                if let Ok(bytes) = std::fs::read(entry.path()) {
                    if let Ok(snap) = serde_json::from_slice::<Snapshot>(&bytes) {
                        index.insert(snap.id.clone(), snap);
                    }
                }
            }
        }

        Ok(Self {
            root,
            create_lock: Mutex::new(()),
            index: RwLock::new(index),
        })
    }

    fn object_path(&self, digest: &str) -> PathBuf {
        let safe = digest.replace(':', "_");
        self.root.join("objects").join(safe)
    }

    fn snapshot_path(&self, id: &str) -> PathBuf {
        self.root.join("snapshots").join(format!("{id}.json"))
    }

    /// Writes `bytes` to `path` via write-temp-then-rename; a partial write
    /// never leaves a corrupt file at `path`.
    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn create(&self, files: Vec<FileInput>, options: CreateOptions) -> Result<Snapshot> {
        let _guard = self.create_lock.lock();

        let digests: Vec<(String, String, usize)> = files
            .iter()
            .map(|(path, content)| (path.clone(), content_digest(content), content.len()))
            .collect();

        let id = stable_snapshot_id(
            digests
                .iter()
                .map(|(path, digest, _)| (path.as_str(), digest.as_str()))
                .collect(),
        );

        if let Some(existing) = self.index.read().get(&id).cloned() {
            return Ok(existing);
        }

        for (path, content) in &files {
            let digest = content_digest(content);
            let object_path = self.object_path(&digest);
            if !object_path.exists() {
                Self::write_atomic(&object_path, content).map_err(|e| {
                    Error::Snapshot(format!("writing object for {path}: {e}"))
                })?;
            }
        }

        let mut snapshot_files: Vec<SnapshotFile> = digests
            .into_iter()
            .map(|(path, digest, size)| SnapshotFile {
                path,
                digest,
                size: size as u64,
            })
            .collect();
        snapshot_files.sort_by(|a, b| a.path.cmp(&b.path));

        let snapshot = Snapshot {
            id: id.clone(),
            created_at: Utc::now(),
            description: options.description,
            protected: options.protected,
            files: snapshot_files,
        };

        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        Self::write_atomic(&self.snapshot_path(&id), &bytes)
            .map_err(|e| Error::Snapshot(format!("writing snapshot metadata: {e}")))?;

        self.index.write().insert(id, snapshot.clone());
        tracing::info!(snapshot_id = %snapshot.id, files = snapshot.files.len(), "snapshot created");
        Ok(snapshot)
    }

    pub fn list(&self) -> Vec<Snapshot> {
        let mut all: Vec<Snapshot> = self.index.read().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(MAX_LISTED);
        all
    }

    pub fn get(&self, id: &str) -> Option<Snapshot> {
        self.index.read().get(id).cloned()
    }

    /// When `target` is absent, restore is metadata-only: no filesystem
    /// mutation (§4.9). `validate_dest` is the path validator applied to
    /// every destination with `target` as root — kept as a caller-supplied
    /// closure so this crate doesn't depend on `snapback-tools`.
    pub fn restore(
        &self,
        id: &str,
        target: Option<&Path>,
        validate_dest: impl Fn(&str, &Path) -> Result<PathBuf>,
    ) -> RestoreReport {
        let Some(snapshot) = self.get(id) else {
            return RestoreReport {
                success: false,
                errors: vec![format!("no such snapshot: {id}")],
                restored_files: Vec::new(),
            };
        };

        let Some(target) = target else {
            return RestoreReport {
                success: true,
                errors: Vec::new(),
                restored_files: snapshot.files.iter().map(|f| f.path.clone()).collect(),
            };
        };

        let mut report = RestoreReport {
            success: true,
            errors: Vec::new(),
            restored_files: Vec::new(),
        };

        for file in &snapshot.files {
            let dest = match validate_dest(&file.path, target) {
                Ok(p) => p,
                Err(e) => {
                    report.success = false;
                    report.errors.push(format!("{}: {e}", file.path));
                    continue;
                }
            };

            let object_path = self.object_path(&file.digest);
            let content = match std::fs::read(&object_path) {
                Ok(c) => c,
                Err(e) => {
                    report.success = false;
                    report.errors.push(format!("{}: reading object: {e}", file.path));
                    continue;
                }
            };

            if let Some(parent) = dest.parent() {
                if std::fs::create_dir_all(parent).is_err() {
                    report.success = false;
                    report.errors.push(format!("{}: creating parent dir", file.path));
                    continue;
                }
            }

            // Already-written files are not rolled back on a later failure
            // (§4.9 documented caveat).
            if let Err(e) = Self::write_atomic(&dest, &content) {
                report.success = false;
                report.errors.push(format!("{}: {e}", file.path));
                continue;
            }

            report.restored_files.push(file.path.clone());
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_validator(path: &str, root: &Path) -> Result<PathBuf> {
        Ok(root.join(path))
    }

    #[test]
    fn create_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let files = vec![("a.txt".into(), b"hello".to_vec())];
        let snap = store.create(files, CreateOptions::default()).unwrap();
        assert_eq!(store.get(&snap.id).unwrap().id, snap.id);
    }

    #[test]
    fn duplicate_create_dedups_to_same_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let files = || vec![("a.txt".to_string(), b"hello".to_vec())];
        let a = store.create(files(), CreateOptions::default()).unwrap();
        let b = store.create(files(), CreateOptions::default()).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn restore_without_target_is_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let snap = store
            .create(vec![("a.txt".into(), b"hi".to_vec())], CreateOptions::default())
            .unwrap();
        let report = store.restore(&snap.id, None, identity_validator);
        assert!(report.success);
        assert_eq!(report.restored_files, vec!["a.txt".to_string()]);
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn restore_with_target_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let snap = store
            .create(vec![("a.txt".into(), b"hi".to_vec())], CreateOptions::default())
            .unwrap();
        let target = tempfile::tempdir().unwrap();
        let report = store.restore(&snap.id, Some(target.path()), identity_validator);
        assert!(report.success);
        assert_eq!(std::fs::read(target.path().join("a.txt")).unwrap(), b"hi");
    }

    #[test]
    fn list_orders_descending_by_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        store.create(vec![("a.txt".into(), b"1".to_vec())], CreateOptions::default()).unwrap();
        store.create(vec![("b.txt".into(), b"2".to_vec())], CreateOptions::default()).unwrap();
        let listed = store.list();
        assert!(listed[0].created_at >= listed[1].created_at);
    }
}
