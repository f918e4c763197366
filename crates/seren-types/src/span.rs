use serde::{Deserialize, Serialize};
use std::fmt;

/// Source position of a message.
///
/// Line/column values are 1-based for human-readable condition reports.
/// The parser collaborator fills these in; hand-built trees default to
/// [`Span::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

impl Span {
    /// Position used for trees built without source text.
    pub const UNKNOWN: Span = Span { line: 0, col: 0 };

    /// Create a new span.
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
