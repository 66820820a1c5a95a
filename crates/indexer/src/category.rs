use eidetic_protocol::FileCategory;

fn filename(relative_path: &str) -> &str {
    relative_path.rsplit('/').next().unwrap_or(relative_path)
}

fn extension(name: &str) -> Option<&str> {
    name.rfind('.').map(|i| &name[i..])
}

fn segments(relative_path: &str) -> impl Iterator<Item = &str> {
    relative_path.split('/').filter(|s| !s.is_empty())
}

fn glob_like(name: &str, pattern: &str) -> bool {
    // Every pattern used here is a single `*` wildcard at the start, end,
    // or both — no need for a general glob engine.
    let lower_name = name.to_ascii_lowercase();
    let lower_pattern = pattern.to_ascii_lowercase();
    match (lower_pattern.starts_with('*'), lower_pattern.ends_with('*')) {
        (true, true) => {
            let inner = &lower_pattern[1..lower_pattern.len() - 1];
            lower_name.contains(inner)
        }
        (true, false) => lower_name.ends_with(&lower_pattern[1..]),
        (false, true) => lower_name.starts_with(&lower_pattern[..lower_pattern.len() - 1]),
        (false, false) => lower_name == lower_pattern,
    }
}

fn is_test(relative_path: &str, name: &str) -> bool {
    if segments(relative_path).any(|s| s == "__tests__") {
        return true;
    }
    const PATTERNS: &[&str] = &["*.test.*", "*.spec.*", "*_test.*", "*_spec.*"];
    if PATTERNS.iter().any(|p| glob_like(name, p)) {
        return true;
    }
    let lower = name.to_ascii_lowercase();
    lower.starts_with("test_") || lower.starts_with("test-")
}

fn is_doc(relative_path: &str, name: &str, ext: Option<&str>) -> bool {
    const DOC_EXTS: &[&str] = &[".md", ".mdx", ".rst", ".txt"];
    if ext.is_some_and(|e| DOC_EXTS.contains(&e.to_ascii_lowercase().as_str())) {
        return true;
    }
    if segments(relative_path).any(|s| s == "docs" || s == "doc") {
        return true;
    }
    const NAME_PATTERNS: &[&str] = &["readme*", "changelog*", "license*"];
    NAME_PATTERNS.iter().any(|p| glob_like(name, p))
}

fn is_generated(relative_path: &str, name: &str) -> bool {
    const GENERATED_SEGMENTS: &[&str] = &["dist", "build", "generated"];
    if segments(relative_path).any(|s| GENERATED_SEGMENTS.contains(&s)) {
        return true;
    }
    let lower = name.to_ascii_lowercase();
    lower.contains(".generated.") || glob_like(name, "*.g.*")
}

fn is_config(relative_path: &str, name: &str, ext: Option<&str>) -> bool {
    let lower = name.to_ascii_lowercase();
    const EXACT_PREFIXES: &[&str] = &[
        "package.json",
        "tsconfig",
        "makefile",
        "dockerfile",
        "docker-compose",
        ".eslintrc",
        ".prettierrc",
    ];
    if EXACT_PREFIXES.iter().any(|p| lower == *p || lower.starts_with(p)) {
        return true;
    }
    if glob_like(name, "*.config.*") {
        return true;
    }
    const CONFIG_EXTS: &[&str] = &[".yaml", ".yml", ".toml"];
    if ext.is_some_and(|e| CONFIG_EXTS.contains(&e.to_ascii_lowercase().as_str())) {
        return !segments(relative_path).any(|s| s == "src");
    }
    false
}

/// First-match-wins classification (spec.md §4.6, §8 property 3). Total and
/// deterministic: every relative path lands in exactly one category.
#[must_use]
pub fn classify_file_category(relative_path: &str) -> FileCategory {
    let name = filename(relative_path);
    let ext = extension(name);

    if is_test(relative_path, name) {
        FileCategory::Test
    } else if is_doc(relative_path, name, ext) {
        FileCategory::Doc
    } else if is_generated(relative_path, name) {
        FileCategory::Generated
    } else if is_config(relative_path, name, ext) {
        FileCategory::Config
    } else {
        FileCategory::Source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changelog_in_docs_is_doc_not_config() {
        assert_eq!(classify_file_category("docs/CHANGELOG.md"), FileCategory::Doc);
    }

    #[test]
    fn dunder_tests_dir_is_test() {
        assert_eq!(classify_file_category("src/__tests__/foo.ts"), FileCategory::Test);
    }

    #[test]
    fn test_prefix_file_is_test() {
        assert_eq!(classify_file_category("test_utils.py"), FileCategory::Test);
    }

    #[test]
    fn generated_dir_wins_over_config_extension() {
        assert_eq!(classify_file_category("dist/config.yaml"), FileCategory::Generated);
    }

    #[test]
    fn yaml_under_src_is_source_not_config() {
        assert_eq!(classify_file_category("src/schema.yaml"), FileCategory::Source);
    }

    #[test]
    fn yaml_outside_src_is_config() {
        assert_eq!(classify_file_category("config/schema.yaml"), FileCategory::Config);
    }

    #[test]
    fn plain_rust_file_is_source() {
        assert_eq!(classify_file_category("src/main.rs"), FileCategory::Source);
    }

    #[test]
    fn dockerfile_is_config() {
        assert_eq!(classify_file_category("Dockerfile"), FileCategory::Config);
    }

    #[test]
    fn readme_at_root_is_doc() {
        assert_eq!(classify_file_category("README.md"), FileCategory::Doc);
    }
}
