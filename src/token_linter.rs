//! Semantic checks run on completed tokens.
//!
//! Every linter handles a fixed set of token kinds and is looked up through
//! [`linters_for`]. Handing a linter a kind it does not support is a caller
//! bug and reported as [`Error::InvalidArgument`], never as a lint finding.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Error;
use crate::error::{ErrorKey, LintError};
use crate::knowledge::KnowledgeBase;
use crate::position::Position;
use crate::token::{Token, TokenKind, TokenType};

/// Characters a selector may be built from.
const SELECTOR_CLASS: &str = r#"\w\s.#*\[\]="'\-:>+~,()%^$|\\"#;

/// Whole-selector shape check, shared with the selector scan rule so the
/// tokenizer and the linter agree on what a selector looks like.
pub(crate) static SELECTOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^[{SELECTOR_CLASS}]+$")).expect("valid selector pattern")
});

static SELECTOR_FORBIDDEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("[^{SELECTOR_CLASS}]")).expect("valid selector character pattern")
});

/// Doubled structural characters that never form a valid selector.
static SELECTOR_DOUBLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"##|\.\.|>>|\+\+|~~|,,|\[\[").expect("valid doubled pattern"));

static CUSTOM_PROPERTY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--[A-Za-z0-9_-]+$").expect("valid custom property pattern"));

static PROPERTY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[A-Za-z_][A-Za-z0-9_-]*$").expect("valid property pattern"));

static IMPORT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:url\(\s*(?:"[^"]*"|'[^']*'|[^"'()\s]+)\s*\)|"[^"]*"|'[^']*')"#)
        .expect("valid import url pattern")
});

static IMPORT_CONDITIONS: Lazy<Regex> = Lazy::new(|| {
    let query = r"(?:(?:only|not)\s+)?[A-Za-z-]+(?:\s+and\s+\([^()]+\))*|\([^()]+\)(?:\s+(?:and|or)\s+\([^()]+\))*";
    let media = format!(r"(?:{query})(?:\s*,\s*(?:{query}))*");
    let layer = r"layer(?:\(\s*[A-Za-z_-][\w.-]*\s*\))?";
    let supports = r"supports\((?:[^()]|\([^()]*\))+\)";
    Regex::new(&format!(
        r"^(?:{layer})?\s*(?:{supports})?\s*(?:{media})?$"
    ))
    .expect("valid import conditions pattern")
});

static CHARSET_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?:"[^"]*"|'[^']*')$"#).expect("valid charset pattern"));

static LAYER_NAMES: Lazy<Regex> = Lazy::new(|| {
    let name = r"[A-Za-z_-][\w-]*(?:\.[A-Za-z_-][\w-]*)*";
    Regex::new(&format!(r"^{name}(?:\s*,\s*{name})*$")).expect("valid layer pattern")
});

static LAYER_CONSECUTIVE_COMMAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*,").expect("valid comma pattern"));

/// First character of `text` outside the selector character class.
#[must_use]
pub fn first_non_selector_char(text: &str) -> Option<char> {
    SELECTOR_FORBIDDEN
        .find(text)
        .and_then(|found| found.as_str().chars().next())
}

/// Tree context of the token being linted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    block: Option<&'a Token>,
    block_previous: Option<&'a Token>,
}

impl<'a> Scope<'a> {
    /// Scope of a token accepted at top level.
    pub const TOP_LEVEL: Self = Self {
        block: None,
        block_previous: None,
    };

    #[must_use]
    pub const fn new(block: Option<&'a Token>, block_previous: Option<&'a Token>) -> Self {
        Self {
            block,
            block_previous,
        }
    }

    /// Block owning the token.
    #[must_use]
    pub const fn block(&self) -> Option<&'a Token> {
        self.block
    }

    /// Token completed right before the owning block, e.g. the selector or
    /// at-rule that opened it.
    #[must_use]
    pub const fn block_previous(&self) -> Option<&'a Token> {
        self.block_previous
    }

    /// Name of the at-rule that opened the owning block.
    #[must_use]
    pub fn enclosing_at_rule(&self) -> Option<&'a str> {
        match self.block_previous.map(Token::kind) {
            Some(TokenKind::AtRule { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// A semantic check over one kind of token.
pub trait TokenLinter {
    /// Name used in fault messages.
    fn name(&self) -> &'static str;

    fn supports(&self, token_type: TokenType) -> bool;

    /// Lint `token`, returning every finding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `token` is of a kind this
    /// linter does not support.
    fn lint(
        &self,
        token: &Token,
        scope: &Scope<'_>,
        knowledge: &KnowledgeBase,
    ) -> Result<Vec<LintError>, Error>;
}

fn unsupported(linter: &dyn TokenLinter, token: &Token) -> Error {
    Error::InvalidArgument {
        linter: linter.name(),
        found: token.token_type(),
    }
}

const AT_RULE_LINTERS: &[&dyn TokenLinter] = &[&AtRuleLinter];
const PROPERTY_LINTERS: &[&dyn TokenLinter] = &[&PropertyLinter];
const SELECTOR_LINTERS: &[&dyn TokenLinter] = &[&SelectorLinter];
const WHITESPACE_LINTERS: &[&dyn TokenLinter] = &[&IndentationLinter];

/// Linters applicable to a token kind.
#[must_use]
pub const fn linters_for(token_type: TokenType) -> &'static [&'static dyn TokenLinter] {
    match token_type {
        TokenType::AtRule => AT_RULE_LINTERS,
        TokenType::Property => PROPERTY_LINTERS,
        TokenType::Selector => SELECTOR_LINTERS,
        TokenType::Whitespace => WHITESPACE_LINTERS,
        TokenType::Comment | TokenType::Block => &[],
    }
}

// -----------------------------------------------------------
// At-rules
// -----------------------------------------------------------

/// Checks at-rule names and the preludes of `@import`, `@charset` and
/// `@layer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtRuleLinter;

impl TokenLinter for AtRuleLinter {
    fn name(&self) -> &'static str {
        "at-rule"
    }

    fn supports(&self, token_type: TokenType) -> bool {
        token_type == TokenType::AtRule
    }

    fn lint(
        &self,
        token: &Token,
        _scope: &Scope<'_>,
        knowledge: &KnowledgeBase,
    ) -> Result<Vec<LintError>, Error> {
        let TokenKind::AtRule {
            name,
            value,
            is_block,
        } = token.kind()
        else {
            return Err(unsupported(self, token));
        };
        let declaration = |message: String| {
            LintError::new(
                ErrorKey::InvalidAtRuleDeclaration,
                message,
                token.start(),
                token.end(),
            )
        };

        if name.is_empty() {
            return Ok(vec![declaration("At-rule name is empty".to_string())]);
        }
        if !knowledge.at_rule_exists(name) {
            return Ok(vec![declaration(format!("Unknown at-rule \"{name}\""))]);
        }

        let value = value.as_deref();
        let problem = match name.to_ascii_lowercase().as_str() {
            "import" => import_problem(value),
            "charset" => charset_problem(value),
            "layer" => layer_problem(value, *is_block),
            _ => None,
        };
        Ok(problem
            .map(|message| {
                LintError::new(
                    ErrorKey::InvalidAtRuleValue,
                    message,
                    token.start(),
                    token.end(),
                )
            })
            .into_iter()
            .collect())
    }
}

fn import_problem(value: Option<&str>) -> Option<String> {
    let Some(value) = value else {
        return Some("@import requires a URL".to_string());
    };
    let Some(url) = IMPORT_URL.find(value) else {
        return Some(format!("Invalid @import URL in \"{value}\""));
    };
    let conditions = value[url.end()..].trim();
    if IMPORT_CONDITIONS.is_match(conditions) {
        None
    } else {
        Some(format!("Invalid @import conditions \"{conditions}\""))
    }
}

fn charset_problem(value: Option<&str>) -> Option<String> {
    match value {
        Some(value) if CHARSET_VALUE.is_match(value) => None,
        Some(value) => Some(format!(
            "@charset value must be a single quoted string, got \"{value}\""
        )),
        None => Some("@charset value must be a single quoted string".to_string()),
    }
}

fn layer_problem(value: Option<&str>, is_block: bool) -> Option<String> {
    let Some(value) = value else {
        // `@layer { ... }` declares an anonymous layer.
        return (!is_block).then(|| "@layer requires a layer name".to_string());
    };
    if value.ends_with(',') {
        Some(format!("@layer names must not end with a comma: \"{value}\""))
    } else if LAYER_CONSECUTIVE_COMMAS.is_match(value) {
        Some(format!(
            "@layer names must not contain consecutive commas: \"{value}\""
        ))
    } else if LAYER_NAMES.is_match(value) {
        None
    } else {
        Some(format!("Invalid @layer name list \"{value}\""))
    }
}

// -----------------------------------------------------------
// Properties
// -----------------------------------------------------------

/// Checks declarations against the known properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyLinter;

impl TokenLinter for PropertyLinter {
    fn name(&self) -> &'static str {
        "property"
    }

    fn supports(&self, token_type: TokenType) -> bool {
        token_type == TokenType::Property
    }

    fn lint(
        &self,
        token: &Token,
        scope: &Scope<'_>,
        knowledge: &KnowledgeBase,
    ) -> Result<Vec<LintError>, Error> {
        let TokenKind::Property { name, value } = token.kind() else {
            return Err(unsupported(self, token));
        };
        let finding = |message: String| {
            LintError::new(
                ErrorKey::InvalidPropertyDeclaration,
                message,
                token.start(),
                token.end(),
            )
        };

        if name.is_empty() {
            return Ok(vec![finding("Property name is empty".to_string())]);
        }

        let mut errors = Vec::new();
        if name.starts_with("--") {
            if !CUSTOM_PROPERTY_NAME.is_match(name) {
                errors.push(finding(format!("Invalid custom property name \"{name}\"")));
            }
        } else if !PROPERTY_NAME.is_match(name) {
            errors.push(finding(format!("Invalid property name \"{name}\"")));
        } else if scope.block().is_none() {
            errors.push(finding(format!("Property \"{name}\" must be inside a block")));
        } else if let Some(at_rule) = scope
            .enclosing_at_rule()
            .filter(|at_rule| knowledge.at_rule_has_properties(at_rule))
        {
            if !knowledge.at_rule_property_exists(at_rule, name) {
                errors.push(finding(format!(
                    "Unknown property \"{name}\" in at-rule \"{at_rule}\""
                )));
            }
        } else if !knowledge.property_exists(name) {
            errors.push(finding(format!("Unknown property \"{name}\"")));
        }

        if value.is_none() {
            errors.push(finding(format!("Property \"{name}\" value is empty")));
        }
        Ok(errors)
    }
}

// -----------------------------------------------------------
// Selectors
// -----------------------------------------------------------

/// Checks selector characters, doubled combinators and parentheses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorLinter;

impl TokenLinter for SelectorLinter {
    fn name(&self) -> &'static str {
        "selector"
    }

    fn supports(&self, token_type: TokenType) -> bool {
        token_type == TokenType::Selector
    }

    fn lint(
        &self,
        token: &Token,
        _scope: &Scope<'_>,
        _knowledge: &KnowledgeBase,
    ) -> Result<Vec<LintError>, Error> {
        let TokenKind::Selector(value) = token.kind() else {
            return Err(unsupported(self, token));
        };
        let at = |offset: usize, len: usize| {
            let start = token.locate(value, offset);
            (start, start.advanced_over(&value[offset..offset + len]))
        };

        if let Some(found) = SELECTOR_FORBIDDEN.find(value) {
            let (start, end) = at(found.start(), found.len());
            return Ok(vec![LintError::new(
                ErrorKey::UnexpectedSelectorCharacter,
                format!(
                    "Unexpected character \"{}\" in selector \"{value}\"",
                    found.as_str()
                ),
                start,
                end,
            )]);
        }

        let unquoted = mask_quoted(value);
        let mut errors: Vec<LintError> = SELECTOR_DOUBLED
            .find_iter(&unquoted)
            .map(|found| {
                let (start, end) = at(found.start(), found.len());
                LintError::new(
                    ErrorKey::UnexpectedSelectorCharacter,
                    format!(
                        "Unexpected \"{}\" in selector \"{value}\"",
                        found.as_str()
                    ),
                    start,
                    end,
                )
            })
            .collect();

        let opened = unquoted.matches('(').count();
        let closed = unquoted.matches(')').count();
        if opened != closed {
            errors.push(LintError::new(
                ErrorKey::UnexpectedSelectorCharacter,
                format!("Unbalanced parentheses in selector \"{value}\""),
                token.start(),
                token.end(),
            ));
        }
        Ok(errors)
    }
}

/// Replace quoted content with spaces, keeping byte offsets intact.
fn mask_quoted(text: &str) -> String {
    let mut quote = None;
    text.chars()
        .map(|ch| match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                    ch
                } else if ch.is_ascii() {
                    ' '
                } else {
                    ch
                }
            }
            None => {
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                }
                ch
            }
        })
        .collect()
}

// -----------------------------------------------------------
// Indentation
// -----------------------------------------------------------

/// Flags indentation characters outside the allowed set.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndentationLinter;

impl TokenLinter for IndentationLinter {
    fn name(&self) -> &'static str {
        "indentation"
    }

    fn supports(&self, token_type: TokenType) -> bool {
        token_type == TokenType::Whitespace
    }

    fn lint(
        &self,
        token: &Token,
        _scope: &Scope<'_>,
        knowledge: &KnowledgeBase,
    ) -> Result<Vec<LintError>, Error> {
        let TokenKind::Whitespace(value) = token.kind() else {
            return Err(unsupported(self, token));
        };

        let normalized = value.replace("\r\n", "\n").replace('\r', "\n");
        let mut errors = Vec::new();
        for (index, line) in normalized.split('\n').enumerate() {
            let line_start = if index == 0 {
                token.start()
            } else {
                Position::new(token.start().line + index, 1)
            };
            let mut run: Option<(char, Position, Position)> = None;
            for (offset, ch) in line.chars().enumerate() {
                let at = line_start.offset(offset);
                if knowledge.is_allowed_indentation_char(ch) {
                    errors.extend(run.take().map(indentation_error));
                    continue;
                }
                run = match run {
                    Some((current, start, _)) if current == ch => {
                        Some((current, start, at.next_column()))
                    }
                    previous => {
                        errors.extend(previous.map(indentation_error));
                        Some((ch, at, at.next_column()))
                    }
                };
            }
            errors.extend(run.map(indentation_error));
        }
        Ok(errors)
    }
}

fn indentation_error((ch, start, end): (char, Position, Position)) -> LintError {
    LintError::new(
        ErrorKey::InvalidIndentationCharacter,
        format!("Unexpected char \"{}\"", ch.escape_default()),
        start,
        end,
    )
}
