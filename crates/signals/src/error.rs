use thiserror::Error;

/// Result type for signal engine operations
pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors raised while indexing or analysing sources.
///
/// None of these abort an analysis pass: callers log them and exclude the
/// affected file.
#[derive(Error, Debug)]
pub enum SignalError {
    /// A source file could not be read
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Tree-sitter produced no tree for the source
    #[error("Parse error: {0}")]
    Parse(String),

    /// No grammar is available for the language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}

impl SignalError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitter(msg.into())
    }
}
