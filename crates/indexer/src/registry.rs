use crate::paths::normalize_path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Persisted mapping `projectName -> absolutePath`, keyed by lowercased
/// basename (spec.md §4.7). Basename collisions are tolerated: a later
/// `register_project` overwrites the name mapping; the path remains the
/// true identity used everywhere else (snapshots, run state, mutex map).
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    projects: HashMap<String, String>,
}

pub struct ProjectRegistry {
    path: PathBuf,
    inner: RwLock<RegistryFile>,
}

impl ProjectRegistry {
    /// Loads `registry.json` from `path` if present; a missing or corrupt
    /// file starts empty rather than erroring (the registry is a cache of
    /// convenience, not the source of truth for a tree's identity).
    #[must_use]
    pub fn load(path: PathBuf) -> Self {
        let inner = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self {
            path,
            inner: RwLock::new(inner),
        }
    }

    pub fn register_project(&self, absolute_path: &str) -> String {
        let normalized = normalize_path(absolute_path);
        let name = basename(&normalized).to_ascii_lowercase();
        {
            let mut inner = self.inner.write().unwrap();
            inner.projects.insert(name.clone(), normalized);
        }
        self.persist();
        name
    }

    #[must_use]
    pub fn resolve_project(&self, name: &str) -> Option<String> {
        let lower = name.to_ascii_lowercase();
        self.inner.read().unwrap().projects.get(&lower).cloned()
    }

    /// Longest registered-path prefix of `p` (both normalized,
    /// case-insensitive) (spec.md §4.7 "findProjectByPath").
    #[must_use]
    pub fn find_project_by_path(&self, p: &str) -> Option<String> {
        let normalized = normalize_path(p).to_ascii_lowercase();
        self.inner
            .read()
            .unwrap()
            .projects
            .values()
            .filter(|registered| normalized.starts_with(&registered.to_ascii_lowercase()))
            .max_by_key(|registered| registered.len())
            .cloned()
    }

    #[must_use]
    pub fn list_projects(&self) -> Vec<(String, String)> {
        let inner = self.inner.read().unwrap();
        let mut out: Vec<(String, String)> = inner.projects.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        out.sort();
        out
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(inner) = self.inner.read() {
            if let Ok(json) = serde_json::to_vec_pretty(&*inner) {
                let _ = std::fs::write(&self.path, json);
            }
        }
    }
}

#[must_use]
pub fn registry_path(data_root: &Path) -> PathBuf {
    data_root.join("registry.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProjectRegistry::load(registry_path(dir.path()));
        registry.register_project("/home/user/MyApp");
        assert_eq!(
            registry.resolve_project("myapp"),
            Some("/home/user/MyApp".to_string())
        );
    }

    #[test]
    fn later_registration_overwrites_name_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProjectRegistry::load(registry_path(dir.path()));
        registry.register_project("/one/app");
        registry.register_project("/two/app");
        assert_eq!(registry.resolve_project("app"), Some("/two/app".to_string()));
    }

    #[test]
    fn find_by_path_picks_longest_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProjectRegistry::load(registry_path(dir.path()));
        registry.register_project("/home/user/projects");
        registry.register_project("/home/user/projects/app");
        let found = registry.find_project_by_path("/home/user/projects/app/src/main.rs");
        assert_eq!(found, Some("/home/user/projects/app".to_string()));
    }

    #[test]
    fn persists_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(dir.path());
        ProjectRegistry::load(path.clone()).register_project("/home/user/app");
        let reloaded = ProjectRegistry::load(path);
        assert_eq!(reloaded.resolve_project("app"), Some("/home/user/app".to_string()));
    }
}
