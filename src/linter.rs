//! Tokenize-and-lint facade.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::Error;
use crate::config::LintConfig;
use crate::error::LintError;
use crate::knowledge::KnowledgeBase;
use crate::token::Token;
use crate::token_linter::{Scope, linters_for};
use crate::tokenizer::{Scanned, Tokenizer};

/// Outcome of linting one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LintReport {
    /// Structural and semantic findings in stream order.
    pub errors: Vec<LintError>,
}

impl LintReport {
    /// A source is valid when it produced no findings.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the tokenizer and every applicable token linter over a source.
#[derive(Debug, Clone, Default)]
pub struct Linter {
    knowledge: KnowledgeBase,
}

impl Linter {
    #[must_use]
    pub const fn new(knowledge: KnowledgeBase) -> Self {
        Self { knowledge }
    }

    #[must_use]
    pub fn with_config(config: &LintConfig) -> Self {
        Self::new(config.knowledge_base())
    }

    #[must_use]
    pub const fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Lazily lint `reader`, yielding structural and semantic findings as
    /// the tokens that produce them complete.
    pub fn errors<R: Read>(&self, reader: R) -> Errors<'_, R> {
        Errors {
            tokenizer: Tokenizer::new(reader),
            knowledge: &self.knowledge,
            pending: VecDeque::new(),
            previous: None,
        }
    }

    pub fn lint_reader<R: Read>(&self, reader: R) -> Result<LintReport, Error> {
        let errors = self.errors(reader).collect::<Result<Vec<_>, _>>()?;
        debug!(errors = errors.len(), "source linted");
        Ok(LintReport { errors })
    }

    pub fn lint_str(&self, input: &str) -> Result<LintReport, Error> {
        self.lint_reader(input.as_bytes())
    }

    pub fn lint_file(&self, path: impl AsRef<Path>) -> Result<LintReport, Error> {
        let path = path.as_ref();
        debug!(path = %path.display(), "linting file");
        let file = File::open(path)?;
        self.lint_reader(BufReader::new(file))
    }
}

/// Lazy stream of findings for one source; see [`Linter::errors`].
#[derive(Debug)]
pub struct Errors<'a, R> {
    tokenizer: Tokenizer<R>,
    knowledge: &'a KnowledgeBase,
    pending: VecDeque<LintError>,
    /// Last top-level token, kept to resolve the next one's predecessor.
    previous: Option<Token>,
}

impl<R: Read> Iterator for Errors<'_, R> {
    type Item = Result<LintError, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(error) = self.pending.pop_front() {
                return Some(Ok(error));
            }
            let token = match self.tokenizer.next()? {
                Ok(Scanned::Error(error)) => return Some(Ok(error)),
                Ok(Scanned::Token(token)) => token,
                Err(error) => return Some(Err(error)),
            };
            let previous = self
                .previous
                .as_ref()
                .filter(|previous| token.previous() == Some(previous.id()));
            let mut found = Vec::new();
            if let Err(error) = lint_tree(
                &token,
                &Scope::TOP_LEVEL,
                previous,
                self.knowledge,
                &mut found,
            ) {
                return Some(Err(error));
            }
            self.pending.extend(found);
            self.previous = Some(token);
        }
    }
}

/// Lint `token` and everything nested in it.
///
/// `previous` is the token completed before `token` in the same scope; for a
/// block it is the selector or at-rule that opened it.
///
/// # Errors
///
/// Propagates [`Error::InvalidArgument`] from a misregistered linter.
pub fn lint_tree(
    token: &Token,
    scope: &Scope<'_>,
    previous: Option<&Token>,
    knowledge: &KnowledgeBase,
    errors: &mut Vec<LintError>,
) -> Result<(), Error> {
    for linter in linters_for(token.token_type()) {
        errors.extend(linter.lint(token, scope, knowledge)?);
    }
    let inner = Scope::new(Some(token), previous);
    for child in token.children() {
        let child_previous = child.previous().and_then(|id| token.child(id));
        lint_tree(child, &inner, child_previous, knowledge, errors)?;
    }
    Ok(())
}
