//! Error types for source indexing

/// Errors while indexing one source file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// File extension is not on the tracked allow-list
    #[error("no parser for extension: '{0}'")]
    UnsupportedExtension(String),

    /// Grammar could not be loaded
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// Parser gave up without producing a tree
    #[error("parse failed")]
    ParseFailed,

    /// Tree contains error or missing nodes
    #[error("syntax error at {line}:{column}")]
    SyntaxError { line: usize, column: usize },
}
