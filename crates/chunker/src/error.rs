use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("unsupported language for AST parsing: {0}")]
    UnsupportedLanguage(String),

    #[error("failed to initialize tree-sitter parser for {0}")]
    ParserInit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChunkerError {
    #[must_use]
    pub fn unsupported_language(name: &str) -> Self {
        Self::UnsupportedLanguage(name.to_string())
    }
}
