use thiserror::Error;

/// Raised while scanning diff text into per-file records.
///
/// Carries the offending line so callers can surface useful diagnostics
/// without re-reading the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {linenum}: {line:?})")]
pub struct DiffParserError {
    pub message: String,
    pub linenum: usize,
    pub line: String,
}

impl DiffParserError {
    pub fn new(message: impl Into<String>, linenum: usize, line: impl Into<String>) -> Self {
        DiffParserError {
            message: message.into(),
            linenum,
            line: line.into(),
        }
    }
}

/// Raised when a unified diff cannot be applied to the original content.
///
/// Partial results are never returned; the first failing hunk aborts the
/// whole application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("hunk `{hunk_header}` does not apply to {filename}: expected {expected:?}, found {found:?}")]
    HunkMismatch {
        filename: String,
        hunk_header: String,
        expected: String,
        found: String,
    },

    #[error("malformed hunk header in patch for {filename} (line {linenum}: {line:?})")]
    MalformedHunk {
        filename: String,
        linenum: usize,
        line: String,
    },

    #[error("patch input for {filename} is not valid UTF-8")]
    InvalidEncoding { filename: String },
}
