use std::path::{Path, PathBuf};

/// Normalizes a tree path to the single form stored in snapshots and the
/// registry (spec.md §4.6): expand a leading `~`, resolve to absolute,
/// replace `\` with `/`, strip a trailing `/` except at the root.
///
/// Resolution to "absolute" is done against the current working directory
/// rather than `fs::canonicalize`, so a path that doesn't exist yet (a
/// tree about to be created, or a test fixture) still normalizes
/// deterministically instead of erroring.
#[must_use]
pub fn normalize_path(input: &str) -> String {
    let expanded = expand_tilde(input);
    let absolute = to_absolute(&expanded);
    let slashified = absolute.to_string_lossy().replace('\\', "/");
    strip_trailing_slash(&slashified)
}

fn expand_tilde(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if input == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(input)
}

fn to_absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn strip_trailing_slash(path: &str) -> String {
    if path.len() > 1 && path.ends_with('/') {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

/// Derives a stable, lowercase-alphanumeric collection name from a
/// *normalized* path (spec.md §3 "CollectionName"): deterministic, and
/// depends only on the normalized form (spec.md §8 property 4).
#[must_use]
pub fn collection_name(normalized_path: &str) -> String {
    let mut out = String::from("eidetic_");
    let mut last_was_sep = true; // suppress a leading underscore
    for ch in normalized_path.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}
