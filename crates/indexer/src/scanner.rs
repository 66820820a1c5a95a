use std::path::Path;

/// Default set of indexed extensions (lowercase, dot-prefixed), covering the
/// chunker's AST-wired languages plus the common text formats the category
/// classifier (spec.md §4.6) distinguishes by extension.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".rs", ".py", ".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".go", ".java", ".c", ".h", ".cc",
    ".cpp", ".hpp", ".rb", ".php", ".cs", ".swift", ".kt", ".scala", ".md", ".mdx", ".rst", ".txt",
    ".json", ".yaml", ".yml", ".toml",
];

/// Default ignore globs (spec.md §4.1 step 1), in the same glob dialect
/// produced by [`parse_gitignore_patterns`].
pub const DEFAULT_IGNORE_GLOBS: &[&str] = &[
    "**/.git",
    "**/node_modules",
    "**/target",
    "**/dist",
    "**/build",
    "**/.next",
    "**/__pycache__",
    "**/.venv",
    "**/venv",
    "**/vendor",
    "**/.cache",
];

/// Translates `.gitignore` lines into the glob dialect used by the scanner
/// (spec.md §4.1 step 1, §8 property 8): trailing `/` stripped, leading `/`
/// rooted at the tree (slash just dropped since matching is already
/// tree-relative), otherwise prefixed with `**/`; comments and negations
/// are dropped entirely (negation re-inclusion is not supported).
#[must_use]
pub fn parse_gitignore_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                return None;
            }
            let mut pattern = trimmed.to_string();
            if pattern.ends_with('/') {
                pattern.pop();
            }
            Some(match pattern.strip_prefix('/') {
                Some(rooted) => rooted.to_string(),
                None => format!("**/{pattern}"),
            })
        })
        .collect()
}

fn build_matcher(tree_root: &Path, extra_patterns: &[String]) -> ignore::gitignore::Gitignore {
    let mut builder = ignore::gitignore::GitignoreBuilder::new(tree_root);
    for pattern in DEFAULT_IGNORE_GLOBS {
        let _ = builder.add_line(None, pattern);
    }
    for pattern in extra_patterns {
        let _ = builder.add_line(None, pattern);
    }
    builder.build().unwrap_or_else(|_| ignore::gitignore::Gitignore::empty())
}

/// Scans `tree_root`, returning lexicographically sorted relative paths of
/// every file whose lowercased extension is included, that isn't excluded
/// by the combined ignore rules (spec.md §4.1 step 1).
#[must_use]
pub fn scan_files(
    tree_root: &Path,
    custom_extensions: &[String],
    custom_ignore_patterns: &[String],
) -> Vec<String> {
    let gitignore_content = std::fs::read_to_string(tree_root.join(".gitignore")).unwrap_or_default();
    let mut patterns = parse_gitignore_patterns(&gitignore_content);
    patterns.extend(custom_ignore_patterns.iter().cloned());
    let matcher = build_matcher(tree_root, &patterns);

    let mut extensions: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect();
    extensions.extend(custom_extensions.iter().map(|e| {
        let lower = e.to_ascii_lowercase();
        if lower.starts_with('.') {
            lower
        } else {
            format!(".{lower}")
        }
    }));

    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(tree_root).into_iter().filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(tree_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if matcher.matched(relative, false).is_ignore() {
            continue;
        }
        let ext = relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()));
        if !ext.is_some_and(|e| extensions.contains(&e)) {
            continue;
        }
        out.push(relative.to_string_lossy().replace('\\', "/"));
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn translates_examples_from_spec() {
        let patterns = parse_gitignore_patterns("dir/\n/root\n*.log\n# comment\n!keep.log\n");
        assert_eq!(patterns, vec!["**/dir", "root", "**/*.log"]);
    }

    #[test]
    fn gitignore_excludes_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "*.log\nsecrets.ts\n").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "export const a = 1;").unwrap();
        std::fs::write(dir.path().join("debug.log"), "log").unwrap();
        std::fs::write(dir.path().join("src/secrets.ts"), "export const s = 1;").unwrap();

        let files = scan_files(dir.path(), &[], &[]);
        assert_eq!(files, vec!["src/a.ts".to_string()]);
    }

    #[test]
    fn custom_extensions_are_included() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.zig"), "const x = 1;").unwrap();
        let files = scan_files(dir.path(), &["zig".to_string()], &[]);
        assert_eq!(files, vec!["a.zig".to_string()]);
    }

    #[test]
    fn output_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("z.rs"), "// z").unwrap();
        std::fs::write(dir.path().join("a.rs"), "// a").unwrap();
        let files = scan_files(dir.path(), &[], &[]);
        assert_eq!(files, vec!["a.rs".to_string(), "z.rs".to_string()]);
    }
}
