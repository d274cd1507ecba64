//! CSS tokenizer and linter.
//!
//! Source text is scanned into a tree of typed tokens (selectors, at-rules,
//! declarations, comments, indentation, blocks) with exact line/column
//! spans, then every completed token is checked against a configurable
//! knowledge base of properties and at-rules. Malformed input never aborts
//! a run: structural problems are reported alongside the tokens.
//!
//! # Quick start
//!
//! ## Lint a stylesheet
//!
//! ```
//! use csslint_rs::{ErrorKey, Linter};
//!
//! let report = Linter::default()
//!     .lint_str(".test { displady: block; }")
//!     .unwrap();
//! assert!(!report.is_valid());
//! assert_eq!(report.errors[0].key, ErrorKey::InvalidPropertyDeclaration);
//! ```
//!
//! ## Walk the token stream
//!
//! ```
//! use csslint_rs::{Scanned, TokenKind, tokenize};
//!
//! let items = tokenize(".button { display: block; }");
//! let Scanned::Token(selector) = &items[0] else { panic!() };
//! assert_eq!(selector.kind(), &TokenKind::Selector(".button".into()));
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod knowledge;
pub mod linter;
pub mod position;
pub mod rules;
pub mod token;
pub mod token_linter;
pub mod tokenizer;

use std::io;

pub use config::LintConfig;
pub use error::{ErrorKey, LintError};
pub use knowledge::KnowledgeBase;
pub use linter::{Errors, LintReport, Linter, lint_tree};
pub use position::Position;
pub use token::{Token, TokenId, TokenKind, TokenType};
pub use token_linter::{
    AtRuleLinter, IndentationLinter, PropertyLinter, Scope, SelectorLinter, TokenLinter,
    linters_for,
};
pub use tokenizer::{Scanned, Tokenizer, tokenize};

/// Faults that stop a run, as opposed to lint findings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A token linter was handed a kind of token it does not handle.
    #[error("{linter} linter does not support {found} tokens")]
    InvalidArgument {
        linter: &'static str,
        found: TokenType,
    },
    /// Reading the source or a configuration file failed.
    #[error("{0}")]
    Io(#[from] io::Error),
    /// A configuration file is not valid JSON for [`LintConfig`].
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Lint an in-memory stylesheet with the built-in knowledge base.
pub fn lint_str(input: &str) -> Result<LintReport, Error> {
    Linter::default().lint_str(input)
}
