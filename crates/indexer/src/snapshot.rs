use eidetic_protocol::{FileRecord, Snapshot};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// First 16 hex chars of SHA-256 of the file's bytes (spec.md §3
/// "FileRecord"). Truncation is safe: a collision only costs a redundant
/// re-index, never incorrectness.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Hashes every file under `tree_root` named by `relative_paths`. A file
/// that fails to read is skipped with a warning and omitted from the
/// snapshot (spec.md §4.6 "buildSnapshot").
#[must_use]
pub fn build_snapshot(tree_root: &Path, relative_paths: &[String]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for relative in relative_paths {
        let full = tree_root.join(relative);
        match std::fs::read(&full) {
            Ok(bytes) => {
                snapshot.insert(
                    relative.clone(),
                    FileRecord {
                        content_hash: content_hash(&bytes),
                    },
                );
            }
            Err(err) => {
                log::warn!("skipping unreadable file {relative} during snapshot build: {err}");
            }
        }
    }
    snapshot
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

/// Pure set operation keyed on relative path, compared by content hash
/// (spec.md §4.6 "diffSnapshots", §8 property 7).
#[must_use]
pub fn diff_snapshots(prev: &Snapshot, cur: &Snapshot) -> SnapshotDiff {
    let prev_keys: HashSet<&String> = prev.keys().collect();
    let cur_keys: HashSet<&String> = cur.keys().collect();

    let mut added: Vec<String> = cur_keys.difference(&prev_keys).map(|s| (*s).clone()).collect();
    let mut removed: Vec<String> = prev_keys.difference(&cur_keys).map(|s| (*s).clone()).collect();
    let mut modified: Vec<String> = cur_keys
        .intersection(&prev_keys)
        .filter(|path| prev[**path].content_hash != cur[**path].content_hash)
        .map(|s| (*s).clone())
        .collect();

    added.sort();
    modified.sort();
    removed.sort();
    SnapshotDiff { added, modified, removed }
}

/// Path on disk for a tree's persisted snapshot (spec.md §6): `snapshots/
/// <collectionName>.json` under the data root.
#[must_use]
pub fn snapshot_path(data_root: &Path, collection_name: &str) -> PathBuf {
    data_root.join("snapshots").join(format!("{collection_name}.json"))
}

/// `None` if the file is absent *or* unreadable/corrupt — both are treated
/// as "no previous snapshot" by the caller (spec.md §4.1 step 4).
pub async fn read_snapshot(path: &Path) -> Option<Snapshot> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            log::warn!("snapshot at {path:?} is corrupt, treating as absent: {err}");
            None
        }
    }
}

/// Write-to-temp-then-rename so readers never observe a partial file
/// (spec.md §4.1 step 8, §5 "Shared resources").
pub async fn write_snapshot_atomic(path: &Path, snapshot: &Snapshot) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(snapshot).unwrap_or_default();
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(hash: &str) -> FileRecord {
        FileRecord { content_hash: hash.to_string() }
    }

    #[test]
    fn identical_snapshots_produce_empty_diff() {
        let mut snap = Snapshot::new();
        snap.insert("a.rs".to_string(), record("abc"));
        let diff = diff_snapshots(&snap, &snap);
        assert_eq!(diff, SnapshotDiff::default());
    }

    #[test]
    fn added_modified_removed_are_independent() {
        let mut prev = Snapshot::new();
        prev.insert("a.rs".to_string(), record("1"));
        prev.insert("b.rs".to_string(), record("2"));

        let mut cur = Snapshot::new();
        cur.insert("b.rs".to_string(), record("2-changed"));
        cur.insert("c.rs".to_string(), record("3"));

        let diff = diff_snapshots(&prev, &cur);
        assert_eq!(diff.added, vec!["c.rs".to_string()]);
        assert_eq!(diff.modified, vec!["b.rs".to_string()]);
        assert_eq!(diff.removed, vec!["a.rs".to_string()]);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let mut snap = Snapshot::new();
        snap.insert("a.rs".to_string(), record("abc"));
        write_snapshot_atomic(&path, &snap).await.unwrap();
        let read_back = read_snapshot(&path).await.unwrap();
        assert_eq!(read_back, snap);
    }

    #[tokio::test]
    async fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(read_snapshot(&path).await.is_none());
    }
}
