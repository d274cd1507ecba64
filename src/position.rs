use std::fmt;

use serde::{Deserialize, Serialize};

/// 1-based source location.
///
/// Ordered by line first, then column, so spans can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Position of the first character of a source.
    pub const START: Self = Self { line: 1, column: 1 };

    /// Create a position, clamping both components to 1.
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self {
            line: if line == 0 { 1 } else { line },
            column: if column == 0 { 1 } else { column },
        }
    }

    /// The position one column to the right.
    #[must_use]
    pub const fn next_column(self) -> Self {
        Self {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// The first column of the following line.
    #[must_use]
    pub const fn next_line(self) -> Self {
        Self {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Move `columns` to the right on the same line.
    #[must_use]
    pub const fn offset(self, columns: usize) -> Self {
        Self {
            line: self.line,
            column: self.column + columns,
        }
    }

    /// Position reached after walking over `text` starting here.
    #[must_use]
    pub fn advanced_over(self, text: &str) -> Self {
        text.chars().fold(self, |position, ch| {
            if ch == '\n' {
                position.next_line()
            } else {
                position.next_column()
            }
        })
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
