use crate::error::{ChunkerError, Result};
use std::path::Path;

/// Supported programming language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    Markdown,
    Yaml,
    Json,
    Config,
    Sql,
    Shell,
    Terraform,
    Html,
    Css,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Self::Rust,
            "py" | "pyw" => Self::Python,
            "js" | "mjs" | "cjs" | "jsx" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "go" => Self::Go,
            "java" => Self::Java,
            "c" | "h" => Self::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Self::Cpp,
            "cs" => Self::CSharp,
            "rb" => Self::Ruby,
            "swift" => Self::Swift,
            "kt" | "kts" => Self::Kotlin,
            "md" | "mdx" | "rst" | "adoc" => Self::Markdown,
            "yaml" | "yml" => Self::Yaml,
            "json" => Self::Json,
            "toml" | "ini" | "cfg" | "conf" | "properties" | "env" | "gradle" | "groovy" => {
                Self::Config
            }
            "sql" | "dbml" => Self::Sql,
            "sh" | "bash" | "zsh" | "fish" | "ps1" | "bat" | "cmd" => Self::Shell,
            "tf" | "tfvars" | "hcl" => Self::Terraform,
            "html" => Self::Html,
            "css" | "scss" | "less" => Self::Css,
            _ => Self::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .or_else(|| {
                path.as_ref()
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| match name {
                        "Dockerfile" | "docker-compose.yml" => Some(Self::Terraform),
                        "Makefile" | "makefile" => Some(Self::Shell),
                        _ => None,
                    })
            })
            .unwrap_or(Self::Unknown)
    }

    /// Get language name as string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Markdown => "markdown",
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Config => "config",
            Self::Sql => "sql",
            Self::Shell => "shell",
            Self::Terraform => "terraform",
            Self::Html => "html",
            Self::Css => "css",
            Self::Unknown => "unknown",
        }
    }

    /// Check if this language is supported for AST parsing
    pub const fn supports_ast(self) -> bool {
        matches!(
            self,
            Self::Rust | Self::Python | Self::JavaScript | Self::TypeScript
        )
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Self::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Self::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Self::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Self::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            _ => Err(ChunkerError::unsupported_language(self.as_str())),
        }
    }

    /// Node kinds that should each produce their own chunk (spec.md §4.2:
    /// function/class/method/interface/type-alias/impl/trait).
    pub const fn splittable_node_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &[
                "function_item",
                "impl_item",
                "trait_item",
                "struct_item",
                "enum_item",
                "mod_item",
            ],
            Self::Python => &["function_definition", "class_definition"],
            Self::JavaScript => &[
                "function_declaration",
                "class_declaration",
                "method_definition",
                "arrow_function",
            ],
            Self::TypeScript => &[
                "function_declaration",
                "class_declaration",
                "method_definition",
                "arrow_function",
                "interface_declaration",
                "type_alias_declaration",
            ],
            _ => &[],
        }
    }

    /// Node kinds that are containers: children are recursed into with
    /// `parentSymbol` set, but the container body itself is not re-emitted
    /// as its own chunk (spec.md §4.2).
    pub const fn container_node_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &["impl_item", "trait_item", "mod_item"],
            Self::Python => &["class_definition"],
            Self::JavaScript | Self::TypeScript => &["class_declaration", "interface_declaration"],
            _ => &[],
        }
    }

    /// Field name whose child holds a node's primary identifier, given the
    /// node's own `kind()`. Most splittable/container node kinds expose
    /// their identifier as a `name` field, but tree-sitter-rust's
    /// `impl_item` has no `name` field at all — the implemented type sits
    /// under `type` instead (e.g. `impl Foo` or `impl Trait for Foo`).
    pub fn identifier_field(self, node_kind: &str) -> &'static str {
        match (self, node_kind) {
            (Self::Rust, "impl_item") => "type",
            _ => "name",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Language;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("RS"), Language::Rust);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("js"), Language::JavaScript);
        assert_eq!(Language::from_extension("ts"), Language::TypeScript);
        assert_eq!(Language::from_extension("md"), Language::Markdown);
        assert_eq!(Language::from_extension("yaml"), Language::Yaml);
        assert_eq!(Language::from_extension("json"), Language::Json);
        assert_eq!(Language::from_extension("toml"), Language::Config);
        assert_eq!(Language::from_extension("sql"), Language::Sql);
        assert_eq!(Language::from_extension("unknown"), Language::Unknown);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("test.rs"), Language::Rust);
        assert_eq!(Language::from_path("src/main.py"), Language::Python);
        assert_eq!(Language::from_path("index.ts"), Language::TypeScript);
        assert_eq!(Language::from_path("no_extension"), Language::Unknown);
        assert_eq!(Language::from_path("README.md"), Language::Markdown);
        assert_eq!(Language::from_path("Dockerfile"), Language::Terraform);
    }

    #[test]
    fn test_supports_ast() {
        assert!(Language::Rust.supports_ast());
        assert!(Language::Python.supports_ast());
        assert!(Language::JavaScript.supports_ast());
        assert!(Language::TypeScript.supports_ast());
        assert!(!Language::Go.supports_ast());
        assert!(!Language::Unknown.supports_ast());
    }

    #[test]
    fn test_tree_sitter_language() {
        assert!(Language::Rust.tree_sitter_language().is_ok());
        assert!(Language::Python.tree_sitter_language().is_ok());
        assert!(Language::JavaScript.tree_sitter_language().is_ok());
        assert!(Language::TypeScript.tree_sitter_language().is_ok());
        assert!(Language::Go.tree_sitter_language().is_err());
    }

    #[test]
    fn test_splittable_node_kinds() {
        assert!(!Language::Rust.splittable_node_kinds().is_empty());
        assert!(!Language::TypeScript.splittable_node_kinds().is_empty());
        assert!(Language::Go.splittable_node_kinds().is_empty());
    }

    #[test]
    fn test_container_node_kinds() {
        assert!(Language::Rust.container_node_kinds().contains(&"impl_item"));
        assert!(Language::Python
            .container_node_kinds()
            .contains(&"class_definition"));
    }
}
