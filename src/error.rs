use std::fmt;

use serde::Serialize;

use crate::position::Position;

/// Classifies a lint finding.
///
/// The serialized names form a stable contract for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKey {
    /// A token or block was still open at end of input.
    UnclosedToken,
    /// Leftover content that never formed a token.
    UnexpectedCharacterEndOfContent,
    /// Selector text with characters or sequences outside the grammar.
    UnexpectedSelectorCharacter,
    /// Unknown or malformed property declaration.
    InvalidPropertyDeclaration,
    /// Content inside a block that is not a declaration or nested rule.
    UnexpectedCharacterInBlockContent,
    /// Indentation character not in the allowed set.
    InvalidIndentationCharacter,
    /// Reserved.
    MixedIndentation,
    /// Reserved.
    InvalidIndentationSize,
    /// Unknown or empty at-rule name.
    InvalidAtRuleDeclaration,
    /// At-rule prelude that does not fit the at-rule's grammar.
    InvalidAtRuleValue,
}

impl ErrorKey {
    pub const ALL: [Self; 10] = [
        Self::UnclosedToken,
        Self::UnexpectedCharacterEndOfContent,
        Self::UnexpectedSelectorCharacter,
        Self::InvalidPropertyDeclaration,
        Self::UnexpectedCharacterInBlockContent,
        Self::InvalidIndentationCharacter,
        Self::MixedIndentation,
        Self::InvalidIndentationSize,
        Self::InvalidAtRuleDeclaration,
        Self::InvalidAtRuleValue,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnclosedToken => "unclosed_token",
            Self::UnexpectedCharacterEndOfContent => "unexpected_character_end_of_content",
            Self::UnexpectedSelectorCharacter => "unexpected_selector_character",
            Self::InvalidPropertyDeclaration => "invalid_property_declaration",
            Self::UnexpectedCharacterInBlockContent => "unexpected_character_in_block_content",
            Self::InvalidIndentationCharacter => "invalid_indentation_character",
            Self::MixedIndentation => "mixed_indentation",
            Self::InvalidIndentationSize => "invalid_indentation_size",
            Self::InvalidAtRuleDeclaration => "invalid_at_rule_declaration",
            Self::InvalidAtRuleValue => "invalid_at_rule_value",
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A located lint finding, structural or semantic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} at line {}, column {}", start.line, start.column)]
pub struct LintError {
    pub key: ErrorKey,
    pub message: String,
    pub start: Position,
    pub end: Position,
}

impl LintError {
    /// Create a finding spanning `start..end`, widened to at least one
    /// column.
    #[must_use]
    pub fn new(key: ErrorKey, message: impl Into<String>, start: Position, end: Position) -> Self {
        let end = if end <= start { start.next_column() } else { end };
        Self {
            key,
            message: message.into(),
            start,
            end,
        }
    }
}
