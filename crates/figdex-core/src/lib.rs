//! Shared primitives used across figdex crates.

use core::fmt;

/// Result alias used across the workspace.
pub type FigdexResult<T> = Result<T, FigdexError>;

/// Workspace error: a stable dotted code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FigdexError {
    pub code: &'static str,
    pub message: String,
}

impl FigdexError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Builds an error from an I/O failure, keeping the source text in the message.
    pub fn io(code: &'static str, context: impl fmt::Display, error: std::io::Error) -> Self {
        Self::new(code, format!("{context}: {error}"))
    }
}

impl fmt::Display for FigdexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for FigdexError {}
