//! File revision markers extracted from diff headers.

use std::fmt;

/// The revision a diff header attaches to one side of a file.
///
/// `PreCreation` marks a file that did not exist before the change,
/// `Head` the current tip, and `Unknown` a header the backend could not
/// resolve to anything concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    PreCreation,
    Head,
    Unknown,
    Other(String),
}

impl Revision {
    pub fn other(value: impl Into<String>) -> Self {
        Revision::Other(value.into())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::PreCreation => write!(f, "PRE-CREATION"),
            Revision::Head => write!(f, "HEAD"),
            Revision::Unknown => write!(f, "UNKNOWN"),
            Revision::Other(value) => write!(f, "{value}"),
        }
    }
}
