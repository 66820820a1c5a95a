//! Stop-hook algorithm (spec.md §6): turn a session's shadow git index into
//! a commit, then hand the touched files to a detached targeted-reindex
//! subprocess.

use crate::error::Result;
use git2::{Index, Repository, Signature};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    pub session_id: String,
    pub cwd: String,
    #[serde(default)]
    pub hook_event_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReindexManifest {
    #[serde(rename = "projectPath")]
    pub project_path: String,
    #[serde(rename = "modifiedFiles")]
    pub modified_files: Vec<String>,
}

/// What `process_stop_event` actually did, for the caller's own logging —
/// the wire-level response is `{}` in every case (spec.md §6 steps 1, 2, 7).
#[derive(Debug, PartialEq, Eq)]
pub enum HookOutcome {
    NotAGitRepo,
    NoShadowIndex,
    NoModifiedFiles,
    Reindexing {
        manifest_path: PathBuf,
        modified_files: Vec<String>,
    },
}

const SHADOW_AUTHOR_NAME: &str = "eidetic";
const SHADOW_AUTHOR_EMAIL: &str = "eidetic@localhost";

/// Runs one `Stop`-event cycle (spec.md §6 steps 1-7). `spawn_reindexer` is
/// called with the manifest path only on the "modified files" branch; the
/// real binary passes a closure that does a detached `Command::spawn`,
/// tests pass a closure that just records the call so no subprocess needs
/// to exist on disk.
pub fn process_stop_event(
    input: &HookInput,
    manifest_dir: &Path,
    spawn_reindexer: impl FnOnce(&Path),
) -> Result<HookOutcome> {
    let cwd = Path::new(&input.cwd);

    let repo = match Repository::discover(cwd) {
        Ok(repo) => repo,
        Err(_) => return Ok(HookOutcome::NotAGitRepo),
    };

    let shadow_dir = repo.path().join("claude").join("indexes").join(&input.session_id);
    let index_path = shadow_dir.join("index");
    let base_commit_path = shadow_dir.join("base_commit");
    if !index_path.is_file() || !base_commit_path.is_file() {
        return Ok(HookOutcome::NoShadowIndex);
    }

    let base_commit_text = std::fs::read_to_string(&base_commit_path)?;
    let base_oid = git2::Oid::from_str(base_commit_text.trim())?;
    let base_commit = repo.find_commit(base_oid)?;
    let base_tree = base_commit.tree()?;

    // `write-tree` with `GIT_INDEX_FILE` pointed at the shadow index
    // (spec.md §6 step 3): `Index::open` reads the on-disk shadow index
    // directly, independent of the repo's own index file.
    let mut shadow_index = Index::open(&index_path)?;
    let tree_oid = shadow_index.write_tree_to(&repo)?;
    let tree = repo.find_tree(tree_oid)?;

    // `commit-tree tree -p base_commit -m "eidetic: session <id>"` (step 4).
    let signature = Signature::now(SHADOW_AUTHOR_NAME, SHADOW_AUTHOR_EMAIL)?;
    let message = format!("eidetic: session {}", input.session_id);
    let commit_oid = repo.commit(None, &signature, &signature, &message, &tree, &[&base_commit])?;

    // `update-ref refs/heads/claude/<session_id> commit` (step 5).
    repo.reference(
        &format!("refs/heads/claude/{}", input.session_id),
        commit_oid,
        true,
        "eidetic stop-hook shadow commit",
    )?;

    // `diff-tree --no-commit-id --name-only -r base_commit commit` (step 6).
    let diff = repo.diff_tree_to_tree(Some(&base_tree), Some(&tree), None)?;
    let mut modified_files = Vec::new();
    diff.foreach(
        &mut |delta, _progress| {
            if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                modified_files.push(path.to_string_lossy().to_string());
            }
            true
        },
        None,
        None,
        None,
    )?;
    modified_files.sort();
    modified_files.dedup();

    if modified_files.is_empty() {
        cleanup_shadow_dir(&shadow_dir);
        return Ok(HookOutcome::NoModifiedFiles);
    }

    let manifest = ReindexManifest {
        project_path: input.cwd.clone(),
        modified_files: modified_files.clone(),
    };
    let manifest_path = manifest_dir.join(format!("eidetic-reindex-{}.json", input.session_id));
    std::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;

    spawn_reindexer(&manifest_path);

    cleanup_shadow_dir(&shadow_dir);

    Ok(HookOutcome::Reindexing {
        manifest_path,
        modified_files,
    })
}

fn cleanup_shadow_dir(shadow_dir: &Path) {
    if let Err(err) = std::fs::remove_dir_all(shadow_dir) {
        if err.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to clean up shadow index dir {shadow_dir:?}: {err}");
        }
    }
}

/// Spawns the targeted reindexer as a fully detached background process
/// (spec.md §6 step 7). Stdio is closed off so the hook can exit without
/// waiting on the child.
pub fn spawn_detached_targeted_reindex(exe_path: &Path, manifest_path: &Path) {
    use std::process::Stdio;
    match std::process::Command::new(exe_path)
        .arg(manifest_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => drop(child),
        Err(err) => log::warn!("failed to spawn targeted reindexer {exe_path:?}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        let mut index = repo.index().unwrap();
        std::fs::write(dir.join("a.txt"), "hello\n").unwrap();
        index.add_path(Path::new("a.txt")).unwrap();
        let tree_oid = index.write_tree().unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let sig = Signature::now("tester", "tester@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();
        repo
    }

    fn write_shadow_index(repo: &Repository, session_id: &str, base_oid: git2::Oid, files: &[(&str, &str)]) -> PathBuf {
        let shadow_dir = repo.path().join("claude").join("indexes").join(session_id);
        std::fs::create_dir_all(&shadow_dir).unwrap();
        std::fs::write(shadow_dir.join("base_commit"), format!("{base_oid}\n")).unwrap();

        let index_path = shadow_dir.join("index");
        let mut index = Index::new().unwrap();
        index.set_path(&index_path).unwrap();
        // Seed from HEAD so unrelated files aren't treated as removed.
        let head_tree = repo.head().unwrap().peel_to_tree().unwrap();
        index.read_tree(&head_tree).unwrap();
        for (name, contents) in files {
            let full = repo.workdir().unwrap().join(name);
            std::fs::write(&full, contents).unwrap();
            index.add_path(Path::new(name)).unwrap();
        }
        index.write().unwrap();
        shadow_dir
    }

    #[test]
    fn non_git_cwd_is_not_a_git_repo() {
        let dir = tempfile::tempdir().unwrap();
        let input = HookInput {
            session_id: "s1".to_string(),
            cwd: dir.path().to_string_lossy().to_string(),
            hook_event_name: "Stop".to_string(),
        };
        let manifest_dir = tempfile::tempdir().unwrap();
        let outcome = process_stop_event(&input, manifest_dir.path(), |_| {}).unwrap();
        assert_eq!(outcome, HookOutcome::NotAGitRepo);
    }

    #[test]
    fn missing_shadow_index_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let input = HookInput {
            session_id: "missing-session".to_string(),
            cwd: dir.path().to_string_lossy().to_string(),
            hook_event_name: "Stop".to_string(),
        };
        let manifest_dir = tempfile::tempdir().unwrap();
        let outcome = process_stop_event(&input, manifest_dir.path(), |_| {}).unwrap();
        assert_eq!(outcome, HookOutcome::NoShadowIndex);
    }

    #[test]
    fn shadow_index_with_edits_produces_manifest_and_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let base_oid = repo.head().unwrap().target().unwrap();
        write_shadow_index(&repo, "sess-1", base_oid, &[("b.txt", "world\n")]);

        let input = HookInput {
            session_id: "sess-1".to_string(),
            cwd: dir.path().to_string_lossy().to_string(),
            hook_event_name: "Stop".to_string(),
        };
        let manifest_dir = tempfile::tempdir().unwrap();
        let spawned = RefCell::new(None);
        let outcome = process_stop_event(&input, manifest_dir.path(), |manifest_path| {
            *spawned.borrow_mut() = Some(manifest_path.to_path_buf());
        })
        .unwrap();

        match outcome {
            HookOutcome::Reindexing { manifest_path, modified_files } => {
                assert_eq!(modified_files, vec!["b.txt".to_string()]);
                assert!(manifest_path.is_file());
                let manifest: ReindexManifest = serde_json::from_slice(&std::fs::read(&manifest_path).unwrap()).unwrap();
                assert_eq!(manifest.modified_files, vec!["b.txt".to_string()]);
                assert_eq!(spawned.into_inner(), Some(manifest_path));
            }
            other => panic!("expected Reindexing, got {other:?}"),
        }

        // shadow dir must be cleaned up
        let shadow_dir = repo.path().join("claude").join("indexes").join("sess-1");
        assert!(!shadow_dir.exists());

        // ref was created
        assert!(repo.find_reference("refs/heads/claude/sess-1").is_ok());
    }

    #[test]
    fn shadow_index_identical_to_base_has_no_modified_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let base_oid = repo.head().unwrap().target().unwrap();
        write_shadow_index(&repo, "sess-2", base_oid, &[]);

        let input = HookInput {
            session_id: "sess-2".to_string(),
            cwd: dir.path().to_string_lossy().to_string(),
            hook_event_name: "Stop".to_string(),
        };
        let manifest_dir = tempfile::tempdir().unwrap();
        let outcome = process_stop_event(&input, manifest_dir.path(), |_| {
            panic!("should not spawn when nothing changed");
        })
        .unwrap();
        assert_eq!(outcome, HookOutcome::NoModifiedFiles);
    }
}
