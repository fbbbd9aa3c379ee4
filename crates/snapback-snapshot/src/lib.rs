//! `snapback-snapshot` — the content-addressed Snapshot Store (§4.9).

pub mod hash;
pub mod store;

pub use hash::{content_digest, stable_snapshot_id};
pub use store::{CreateOptions, FileInput, SnapshotStore};
