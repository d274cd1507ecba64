//! Scan rules: recognisers consulted in a fixed order for every character.
//!
//! Each rule inspects the [`TokenizerContext`] right after a character was
//! pushed and either declines ([`Scan::Skip`]), claims the character
//! without output ([`Scan::Consumed`]), completes a token, or reports a
//! structural error.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::context::{OpenComment, TokenizerContext};
use crate::error::{ErrorKey, LintError};
use crate::position::Position;
use crate::token::{OpenBlock, OpenKind, OpenToken, Token, TokenKind, TokenType};
use crate::token_linter::{SELECTOR_PATTERN, first_non_selector_char};

/// A lone `@` opening an at-rule.
static AT_RULE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*@$").expect("valid at-rule start pattern"));

/// `name:` at the start of a declaration.
static PROPERTY_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-{0,2}[A-Za-z0-9_-]*)\s*:$").expect("valid property start pattern")
});

/// Outcome of one scan rule for the current character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// The rule does not apply; try the next one.
    Skip,
    /// The rule claimed the character without completing anything.
    Consumed,
    /// A token was completed.
    Token(Token),
    /// Structural problem; scanning continues with the next character.
    Error(LintError),
    /// A token was completed after skipping over unexpected content.
    Recovered(Token, LintError),
}

/// The scan rules, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanRule {
    LineEnding,
    Comment,
    AtRule,
    Selector,
    Property,
    Block,
    Whitespace,
}

impl ScanRule {
    /// Order in which rules are tried for every character.
    pub const ORDER: [Self; 7] = [
        Self::LineEnding,
        Self::Comment,
        Self::AtRule,
        Self::Selector,
        Self::Property,
        Self::Block,
        Self::Whitespace,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LineEnding => "line-ending",
            Self::Comment => "comment",
            Self::AtRule => "at-rule",
            Self::Selector => "selector",
            Self::Property => "property",
            Self::Block => "block",
            Self::Whitespace => "whitespace",
        }
    }

    /// Apply the rule to the context's pending content.
    pub fn scan(self, ctx: &mut TokenizerContext) -> Scan {
        let Some(ch) = ctx.last_char() else {
            return Scan::Skip;
        };
        // Nothing but the comment rule may look inside an open comment.
        if ctx.in_comment() && !matches!(self, Self::LineEnding | Self::Comment) {
            return Scan::Skip;
        }
        match self {
            Self::LineEnding => scan_line_ending(ctx, ch),
            Self::Comment => scan_comment(ctx),
            Self::AtRule => scan_at_rule(ctx, ch),
            Self::Selector => scan_selector(ctx, ch),
            Self::Property => scan_property(ctx, ch),
            Self::Block => scan_block(ctx, ch),
            Self::Whitespace => scan_whitespace(ctx, ch),
        }
    }
}

impl fmt::Display for ScanRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `to` may continue from the character that completed a token of
/// type `from`.
#[must_use]
pub const fn hands_off(from: TokenType, to: ScanRule, ch: char) -> bool {
    match (from, to) {
        (TokenType::Selector | TokenType::AtRule, ScanRule::Block) => ch == '{',
        (TokenType::Property, ScanRule::Block) => ch == '}',
        (TokenType::Whitespace, ScanRule::LineEnding | ScanRule::Whitespace) => false,
        (TokenType::Whitespace, _) => true,
        (
            TokenType::Selector
            | TokenType::AtRule
            | TokenType::Property
            | TokenType::Comment
            | TokenType::Block,
            _,
        ) => false,
    }
}

/// Whether the end of `text` sits inside a quoted string.
#[must_use]
pub fn inside_string(text: &str) -> bool {
    let mut quote = None;
    let mut escaped = false;
    for ch in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(open), _) if ch == open => quote = None,
            (None, '"' | '\'') => quote = Some(ch),
            _ => {}
        }
    }
    quote.is_some()
}

/// Unclosed parentheses in `text`, ignoring quoted content.
#[must_use]
pub fn open_parens(text: &str) -> usize {
    let mut depth = 0usize;
    let mut quote = None;
    for ch in text.chars() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// Whether the end of `text` sits inside an unquoted `url(`, where `/*` is
/// part of the address.
#[must_use]
pub fn inside_url(text: &str) -> bool {
    let mut opens = Vec::new();
    let mut quote = None;
    for (offset, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => opens.push(offset),
            (None, ')') => {
                opens.pop();
            }
            _ => {}
        }
    }
    opens.last().is_some_and(|&at| {
        at.checked_sub(3)
            .and_then(|from| text.get(from..at))
            .is_some_and(|name| name.eq_ignore_ascii_case("url"))
    })
}

/// Strip comment delimiters' leftovers: a leading `*` on continuation
/// lines and surrounding whitespace.
#[must_use]
pub fn clean_comment(raw: &str) -> String {
    raw.lines()
        .enumerate()
        .map(|(index, line)| {
            let line = line.trim();
            if index == 0 {
                line
            } else {
                line.strip_prefix('*').map_or(line, str::trim)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Split an at-rule prelude (`@name value`) into name and value.
#[must_use]
pub fn split_at_rule(body: &str) -> (String, Option<String>) {
    let text = body.trim();
    let text = text.strip_prefix('@').unwrap_or(text);
    let split = text
        .find(|ch: char| !(ch.is_alphanumeric() || ch == '-' || ch == '_'))
        .unwrap_or(text.len());
    let (name, value) = text.split_at(split);
    let value = value.trim();
    (
        name.to_string(),
        (!value.is_empty()).then(|| value.to_string()),
    )
}

/// Value of a declaration body (`name: value`), trimmed.
fn declaration_value(body: &str) -> Option<String> {
    let (_, value) = body.split_once(':')?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn scan_line_ending(ctx: &mut TokenizerContext, ch: char) -> Scan {
    if ch == '\n' {
        ctx.advance_line();
    }
    Scan::Skip
}

fn scan_comment(ctx: &mut TokenizerContext) -> Scan {
    if let Some(offset) = ctx.comment().map(|comment| comment.offset) {
        let content = ctx.content();
        if content.len() < offset + 4 || !content.ends_with("*/") {
            return Scan::Consumed;
        }
        let value = clean_comment(&content[offset + 2..content.len() - 2]);
        let end = ctx.next_position();
        let Some(comment) = ctx.take_comment() else {
            return Scan::Consumed;
        };
        if comment.embedded {
            ctx.truncate_content(offset);
            return Scan::Consumed;
        }
        return Scan::Token(comment.finish(value, end));
    }

    if !ctx.ends_with("/*") {
        return Scan::Skip;
    }
    let offset = ctx.content().len() - 2;
    let prefix = &ctx.content()[..offset];
    if inside_string(prefix) || inside_url(prefix) {
        return Scan::Skip;
    }
    let embedded = ctx.current_token().is_some() || !prefix.trim().is_empty();
    let start = ctx.position_at(offset).unwrap_or_else(|| ctx.position());
    let id = ctx.next_id();
    ctx.open_comment(OpenComment {
        offset,
        id,
        start,
        embedded,
    });
    Scan::Consumed
}

fn scan_at_rule(ctx: &mut TokenizerContext, ch: char) -> Scan {
    match ctx.current_type() {
        Some(TokenType::AtRule) => {
            if ch != ';' && ch != '{' {
                return Scan::Skip;
            }
            let body_len = ctx.content().len() - ch.len_utf8();
            let body = &ctx.content()[..body_len];
            if inside_string(body) || open_parens(body) > 0 {
                return Scan::Skip;
            }
            let (name, value) = split_at_rule(body);
            let is_block = ch == '{';
            let end = if is_block {
                ctx.trimmed_span(body_len)
                    .map_or_else(|| ctx.position(), |(_, end)| end)
            } else {
                ctx.next_position()
            };
            let Some(open) = ctx.take_current_token() else {
                return Scan::Skip;
            };
            Scan::Token(open.finish(
                TokenKind::AtRule {
                    name,
                    value,
                    is_block,
                },
                end,
            ))
        }
        Some(_) => Scan::Skip,
        None => {
            if ch != '@' || !ctx.is_match(&AT_RULE_START) {
                return Scan::Skip;
            }
            let start = ctx.position();
            let id = ctx.next_id();
            ctx.set_current_token(OpenToken::new(id, OpenKind::AtRule, start));
            Scan::Consumed
        }
    }
}

fn scan_selector(ctx: &mut TokenizerContext, ch: char) -> Scan {
    if ch != '{' {
        return Scan::Skip;
    }
    // A `name:` prefix inside a block opened a property; a following `{`
    // shows it was a pseudo-class selector instead.
    let takes_over = match ctx.current_type() {
        None => false,
        Some(TokenType::Property) => true,
        Some(_) => return Scan::Skip,
    };
    let body_len = ctx.content().len() - 1;
    let body = &ctx.content()[..body_len];
    if inside_string(body) {
        return Scan::Skip;
    }
    let value = body.trim();
    if value.is_empty() || !SELECTOR_PATTERN.is_match(value) {
        return Scan::Skip;
    }
    let from = body.len() - body.trim_start().len();
    let anchors = ctx.anchors(from, from + value.len());
    let value = value.to_string();
    let Some((start, end)) = ctx.trimmed_span(body_len) else {
        return Scan::Skip;
    };
    if takes_over {
        ctx.take_current_token();
    }
    let id = ctx.next_id();
    let token = Token::with_id(id, TokenKind::Selector(value), start, end);
    Scan::Token(token.with_anchors(anchors))
}

fn scan_property(ctx: &mut TokenizerContext, ch: char) -> Scan {
    if !ctx.in_block() {
        return Scan::Skip;
    }
    match ctx.current_type() {
        Some(TokenType::Property) => complete_property(ctx, ch),
        Some(_) => Scan::Skip,
        None => match ch {
            ':' => open_property(ctx),
            ';' => reject_block_content(ctx),
            _ => Scan::Skip,
        },
    }
}

fn open_property(ctx: &mut TokenizerContext) -> Scan {
    let Some(name) = PROPERTY_START
        .captures(ctx.content())
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
    else {
        return Scan::Skip;
    };
    let len = ctx.content().len();
    let start = ctx
        .trimmed_span(len)
        .map_or_else(|| ctx.position(), |(start, _)| start);
    let id = ctx.next_id();
    ctx.set_current_token(OpenToken::new(id, OpenKind::Property { name }, start));
    Scan::Consumed
}

fn complete_property(ctx: &mut TokenizerContext, ch: char) -> Scan {
    if ch != ';' && ch != '}' {
        return Scan::Skip;
    }
    let body_len = ctx.content().len() - 1;
    let body = &ctx.content()[..body_len];
    if inside_string(body) || (ch == ';' && open_parens(body) > 0) {
        return Scan::Skip;
    }
    let value = declaration_value(body);
    let end = if ch == ';' {
        ctx.next_position()
    } else {
        ctx.trimmed_span(body_len)
            .map_or_else(|| ctx.position(), |(_, end)| end)
    };
    let Some(open) = ctx.take_current_token() else {
        return Scan::Skip;
    };
    let name = match open.kind() {
        OpenKind::Property { name } => name.clone(),
        OpenKind::AtRule | OpenKind::Whitespace => String::new(),
    };
    Scan::Token(open.finish(TokenKind::Property { name, value }, end))
}

/// Content ending in `;` inside a block that never formed a declaration.
fn reject_block_content(ctx: &mut TokenizerContext) -> Scan {
    let body_len = ctx.content().len() - 1;
    let body = &ctx.content()[..body_len];
    if inside_string(body) {
        return Scan::Skip;
    }
    let text = body.trim().to_string();
    let span = ctx.trimmed_span(body_len);
    ctx.reset_content();
    match span {
        Some((start, end)) => Scan::Error(LintError::new(
            ErrorKey::UnexpectedCharacterInBlockContent,
            format!("Unexpected content \"{text}\" in block"),
            start,
            end,
        )),
        None => Scan::Consumed,
    }
}

fn scan_block(ctx: &mut TokenizerContext, ch: char) -> Scan {
    match (ctx.current_type(), ch) {
        (None, '{') => open_block(ctx),
        (None, '}') => close_block(ctx),
        (Some(TokenType::Property), '{') => abandon_property(ctx),
        _ => Scan::Skip,
    }
}

/// A `name:` prefix followed by `{` that no selector claimed: the text was
/// a malformed block header, not a declaration.
fn abandon_property(ctx: &mut TokenizerContext) -> Scan {
    let body = &ctx.content()[..ctx.content().len() - 1];
    if inside_string(body) || open_parens(body) > 0 {
        return Scan::Skip;
    }
    ctx.take_current_token();
    open_block(ctx)
}

fn open_block(ctx: &mut TokenizerContext) -> Scan {
    let body_len = ctx.content().len() - 1;
    let body = &ctx.content()[..body_len];
    if inside_string(body) {
        return Scan::Skip;
    }
    let start = ctx.position();
    let unclaimed = ctx.trimmed_span(body_len);
    let error = unclaimed.map(|(from, to)| {
        let text = body.trim();
        let message = first_non_selector_char(text).map_or_else(
            || format!("Unexpected selector \"{text}\""),
            |bad| format!("Unexpected character \"{bad}\" in selector \"{text}\""),
        );
        LintError::new(ErrorKey::UnexpectedSelectorCharacter, message, from, to)
    });
    let header_start = match ctx.last_completed() {
        Some(completed)
            if completed.at == start
                && matches!(completed.token_type, TokenType::Selector | TokenType::AtRule) =>
        {
            completed.start
        }
        _ => unclaimed.map_or(start, |(from, _)| from),
    };
    let id = ctx.next_id();
    ctx.push_block(OpenBlock::new(id, start, header_start));
    ctx.reset_content();
    trace!(line = start.line, column = start.column, depth = ctx.depth(), "block opened");
    error.map_or(Scan::Consumed, Scan::Error)
}

fn close_block(ctx: &mut TokenizerContext) -> Scan {
    let body_len = ctx.content().len() - 1;
    let body = &ctx.content()[..body_len];
    if inside_string(body) {
        return Scan::Skip;
    }
    let stray = ctx.trimmed_span(body_len).map(|(from, to)| {
        LintError::new(
            ErrorKey::UnexpectedCharacterInBlockContent,
            format!("Unexpected content \"{}\" in block", body.trim()),
            from,
            to,
        )
    });
    let Some(block) = ctx.pop_block() else {
        let at = ctx.position();
        ctx.reset_content();
        return Scan::Error(stray.unwrap_or_else(|| {
            LintError::new(
                ErrorKey::UnexpectedCharacterInBlockContent,
                "Unexpected \"}\" outside of any block",
                at,
                at.next_column(),
            )
        }));
    };
    let end = ctx.next_position();
    trace!(line = end.line, column = end.column, depth = ctx.depth(), "block closed");
    let token = block.finish(end);
    match stray {
        Some(error) => Scan::Recovered(token, error),
        None => Scan::Token(token),
    }
}

fn scan_whitespace(ctx: &mut TokenizerContext, ch: char) -> Scan {
    match ctx.current_type() {
        Some(TokenType::Whitespace) => {
            if ch.is_whitespace() {
                return Scan::Consumed;
            }
            let len = ctx.content().len() - ch.len_utf8();
            let value = ctx.content()[..len].to_string();
            let end = ctx.position();
            let Some(open) = ctx.take_current_token() else {
                return Scan::Skip;
            };
            Scan::Token(open.finish(TokenKind::Whitespace(value), end))
        }
        Some(_) => Scan::Skip,
        None => open_whitespace(ctx, ch),
    }
}

/// Start indentation tracking at the latest line break of whitespace-only
/// pending content, or at the very start of the source.
fn open_whitespace(ctx: &mut TokenizerContext, ch: char) -> Scan {
    if !ch.is_whitespace() || !ctx.is_blank() {
        return Scan::Skip;
    }
    match ctx.last_line_break() {
        Some(at) => ctx.drop_content_before(at),
        None if ctx.content_start() == Some(Position::START) => {}
        None => return Scan::Skip,
    }
    let start = ctx.content_start().unwrap_or_else(|| ctx.position());
    let id = ctx.next_id();
    ctx.set_current_token(OpenToken::new(id, OpenKind::Whitespace, start));
    Scan::Consumed
}

/// Force-close the open token at end of input, building its payload from
/// whatever pending content it accumulated.
pub(crate) fn close_open_token(ctx: &mut TokenizerContext) -> Option<Token> {
    let open = ctx.take_current_token()?;
    let content = ctx.content();
    let kind = match open.kind() {
        OpenKind::Whitespace => TokenKind::Whitespace(content.to_string()),
        OpenKind::Property { name } => TokenKind::Property {
            name: name.clone(),
            value: declaration_value(content),
        },
        OpenKind::AtRule => {
            let (name, value) = split_at_rule(content);
            TokenKind::AtRule {
                name,
                value,
                is_block: false,
            }
        }
    };
    Some(open.finish(kind, ctx.next_position()))
}
