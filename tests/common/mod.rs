#![allow(dead_code)]

use csslint_rs::{ErrorKey, LintError, Linter, Scanned, Token, TokenType, tokenize};

/// Top-level tokens of `input`, skipping indentation.
pub fn top_level(input: &str) -> Vec<Token> {
    tokenize(input)
        .into_iter()
        .filter_map(|item| match item {
            Scanned::Token(token) if token.token_type() != TokenType::Whitespace => Some(token),
            _ => None,
        })
        .collect()
}

/// Structural errors of `input`.
pub fn structural_errors(input: &str) -> Vec<LintError> {
    tokenize(input)
        .into_iter()
        .filter_map(|item| match item {
            Scanned::Error(error) => Some(error),
            Scanned::Token(_) => None,
        })
        .collect()
}

/// Keys of every finding for `input` with the built-in knowledge base.
pub fn lint_keys(input: &str) -> Vec<ErrorKey> {
    lint(input).into_iter().map(|error| error.key).collect()
}

pub fn lint(input: &str) -> Vec<LintError> {
    Linter::default()
        .lint_str(input)
        .unwrap_or_else(|e| panic!("lint failed: {e}\n--- input ---\n{input}"))
        .errors
}

/// Helper: assert block containment and child ordering for a whole tree.
pub fn assert_well_formed(token: &Token) {
    for pair in token.children().windows(2) {
        assert!(
            pair[0].start() < pair[1].start(),
            "children out of order: {:?} then {:?}",
            pair[0],
            pair[1]
        );
    }
    for child in token.children() {
        assert!(
            token.start() <= child.start() && child.end() <= token.end(),
            "child {child:?} escapes block {}..{}",
            token.start(),
            token.end()
        );
        assert_eq!(child.parent(), Some(token.id()));
        assert_well_formed(child);
    }
}
