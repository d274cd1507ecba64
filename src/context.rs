//! Mutable scan state shared by the scan rules.
//!
//! The context owns everything the tokenizer has seen but not yet turned
//! into a completed token: the pending content window, the token being
//! built, and the stack of open blocks.

use regex::Regex;

use crate::position::Position;
use crate::token::{OpenBlock, OpenToken, Token, TokenId, TokenKind, TokenType};

/// A comment whose closing `*/` has not been seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenComment {
    /// Byte offset of the opening `/*` in the pending content.
    pub offset: usize,
    pub id: TokenId,
    pub start: Position,
    /// Whether the comment interrupts other pending content. Only
    /// standalone comments become tokens.
    pub embedded: bool,
}

impl OpenComment {
    pub(crate) fn finish(self, value: String, end: Position) -> Token {
        Token::with_id(self.id, TokenKind::Comment(value), self.start, end)
    }
}

/// Summary of the last token a scan rule completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completed {
    pub id: TokenId,
    pub token_type: TokenType,
    pub start: Position,
    /// Position of the character that completed the token.
    pub at: Position,
}

/// Scan state for one tokenizer run.
#[derive(Debug, Default)]
pub struct TokenizerContext {
    content: String,
    positions: Vec<Position>,
    position: Position,
    next_position: Position,
    /// Pending content holds something besides whitespace.
    has_text: bool,
    /// Byte offset of the last line break in the pending content, at the
    /// `\r` of a `\r\n` pair.
    line_break: Option<usize>,
    current_token: Option<OpenToken>,
    comment: Option<OpenComment>,
    blocks: Vec<OpenBlock>,
    last_completed: Option<Completed>,
    last_top_level: Option<TokenId>,
    next_id: u32,
}

impl TokenizerContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Pending content --

    /// Append the next source character, advancing the position.
    pub fn push(&mut self, ch: char) {
        self.position = self.next_position;
        self.advance_column();
        self.append(ch);
    }

    /// Append `ch` again at the current position, after a hand-off reset.
    pub fn push_again(&mut self, ch: char) {
        self.append(ch);
    }

    fn append(&mut self, ch: char) {
        if ch == '\n' {
            let at = self.content.len();
            self.line_break = Some(if self.content.ends_with('\r') { at - 1 } else { at });
        }
        self.has_text |= !ch.is_whitespace();
        self.content.push(ch);
        self.positions.push(self.position);
    }

    /// Recompute the content summary after removing part of the window.
    fn resummarize(&mut self) {
        self.has_text = self.content.chars().any(|ch| !ch.is_whitespace());
        self.line_break = self.content.rfind('\n').map(|at| {
            if self.content[..at].ends_with('\r') {
                at - 1
            } else {
                at
            }
        });
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn is_content_empty(&self) -> bool {
        self.content.is_empty()
    }

    #[must_use]
    pub fn ends_with(&self, suffix: &str) -> bool {
        self.content.ends_with(suffix)
    }

    #[must_use]
    pub fn is_match(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.content)
    }

    /// Whether the pending content is empty or whitespace only.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        !self.has_text
    }

    /// Byte offset of the last line break in the pending content.
    #[must_use]
    pub const fn last_line_break(&self) -> Option<usize> {
        self.line_break
    }

    /// Last character of the pending content.
    #[must_use]
    pub fn last_char(&self) -> Option<char> {
        self.content.chars().next_back()
    }

    /// Clear the pending window; every rule starts over from here.
    pub fn reset_content(&mut self) {
        self.content.clear();
        self.positions.clear();
        self.has_text = false;
        self.line_break = None;
    }

    /// Drop pending content from byte offset `at` onwards.
    pub fn truncate_content(&mut self, at: usize) {
        let Some(prefix) = self.content.get(..at) else {
            return;
        };
        let chars = prefix.chars().count();
        self.content.truncate(at);
        self.positions.truncate(chars);
        self.resummarize();
    }

    /// Drop pending content before byte offset `at`.
    pub fn drop_content_before(&mut self, at: usize) {
        let Some(prefix) = self.content.get(..at) else {
            return;
        };
        let chars = prefix.chars().count();
        self.content.drain(..at);
        self.positions.drain(..chars);
        self.resummarize();
    }

    /// Position of the first pending character.
    #[must_use]
    pub fn content_start(&self) -> Option<Position> {
        self.positions.first().copied()
    }

    /// Position of the pending character at byte offset `at`.
    #[must_use]
    pub fn position_at(&self, at: usize) -> Option<Position> {
        let index = self.content.get(..at)?.chars().count();
        self.positions.get(index).copied()
    }

    /// Span of the non-whitespace text within the first `len` bytes of the
    /// pending content. The end is exclusive.
    #[must_use]
    pub fn trimmed_span(&self, len: usize) -> Option<(Position, Position)> {
        let mut visible = self
            .content
            .char_indices()
            .zip(self.positions.iter().copied())
            .take_while(|((offset, _), _)| *offset < len)
            .filter(|((_, ch), _)| !ch.is_whitespace())
            .map(|(_, position)| position);
        let first = visible.next()?;
        let last = visible.last().unwrap_or(first);
        Some((first, last.next_column()))
    }

    /// Offsets within `content[from..to]` where source positions jump,
    /// e.g. over a stripped comment, paired with the position found there.
    #[must_use]
    pub fn anchors(&self, from: usize, to: usize) -> Vec<(usize, Position)> {
        let mut anchors = Vec::new();
        let mut expected = None;
        for ((offset, ch), position) in self.content.char_indices().zip(self.positions.iter().copied()) {
            if offset >= to {
                break;
            }
            if offset >= from && expected.is_some_and(|expected| expected != position) {
                anchors.push((offset - from, position));
            }
            expected = Some(if ch == '\n' {
                position.next_line()
            } else {
                position.next_column()
            });
        }
        anchors
    }

    // -- Position --

    /// Position of the character being scanned.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Position right after the last scanned character.
    #[must_use]
    pub const fn next_position(&self) -> Position {
        self.next_position
    }

    /// Move past one more column without scanning a character.
    pub const fn advance_column(&mut self) {
        self.next_position = self.next_position.next_column();
    }

    /// Continue scanning on the next line.
    pub const fn advance_line(&mut self) {
        self.next_position = self.position.next_line();
    }

    // -- Tokens --

    #[must_use]
    pub const fn current_token(&self) -> Option<&OpenToken> {
        self.current_token.as_ref()
    }

    /// Type of the open token, if any.
    #[must_use]
    pub fn current_type(&self) -> Option<TokenType> {
        self.current_token.as_ref().map(OpenToken::token_type)
    }

    pub const fn take_current_token(&mut self) -> Option<OpenToken> {
        self.current_token.take()
    }

    pub fn set_current_token(&mut self, token: OpenToken) {
        debug_assert!(self.current_token.is_none(), "a token is already open");
        self.current_token = Some(token);
    }

    #[must_use]
    pub const fn comment(&self) -> Option<&OpenComment> {
        self.comment.as_ref()
    }

    #[must_use]
    pub const fn in_comment(&self) -> bool {
        self.comment.is_some()
    }

    pub fn open_comment(&mut self, comment: OpenComment) {
        self.comment = Some(comment);
    }

    pub const fn take_comment(&mut self) -> Option<OpenComment> {
        self.comment.take()
    }

    /// Allocate an id for a new token.
    pub const fn next_id(&mut self) -> TokenId {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        id
    }

    #[must_use]
    pub const fn last_completed(&self) -> Option<Completed> {
        self.last_completed
    }

    /// Remember `token` as the most recently completed one.
    pub const fn record_completed(&mut self, token: &Token) {
        self.last_completed = Some(Completed {
            id: token.id(),
            token_type: token.token_type(),
            start: token.start(),
            at: self.position,
        });
    }

    /// Link a token accepted at top level to its top-level predecessor.
    pub fn accept_top_level(&mut self, token: Token) -> Token {
        let token = token.linked_after(self.last_top_level);
        self.last_top_level = Some(token.id());
        token
    }

    // -- Blocks --

    #[must_use]
    pub fn current_block(&self) -> Option<&OpenBlock> {
        self.blocks.last()
    }

    pub fn current_block_mut(&mut self) -> Option<&mut OpenBlock> {
        self.blocks.last_mut()
    }

    #[must_use]
    pub fn in_block(&self) -> bool {
        self.current_block().is_some()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.blocks.len()
    }

    pub fn push_block(&mut self, block: OpenBlock) {
        self.blocks.push(block);
    }

    pub fn pop_block(&mut self) -> Option<OpenBlock> {
        self.blocks.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(input: &str) -> TokenizerContext {
        let mut ctx = TokenizerContext::new();
        for ch in input.chars() {
            ctx.push(ch);
            if ch == '\n' {
                ctx.advance_line();
            }
        }
        ctx
    }

    #[test]
    fn push_tracks_positions() {
        let ctx = context_with("ab\ncd");
        assert_eq!(ctx.content(), "ab\ncd");
        assert_eq!(ctx.position(), Position::new(2, 2));
        assert_eq!(ctx.next_position(), Position::new(2, 3));
        assert_eq!(ctx.position_at(3), Some(Position::new(2, 1)));
    }

    #[test]
    fn reset_clears_window_but_keeps_position() {
        let mut ctx = context_with(".a {");
        ctx.reset_content();
        assert!(ctx.is_content_empty());
        assert_eq!(ctx.content_start(), None);
        ctx.push_again('{');
        assert_eq!(ctx.content_start(), Some(Position::new(1, 4)));
    }

    #[test]
    fn trimmed_span_skips_surrounding_whitespace() {
        let ctx = context_with("  .a .b  {");
        let (start, end) = ctx.trimmed_span(ctx.content().len() - 1).expect("span");
        assert_eq!(start, Position::new(1, 3));
        assert_eq!(end, Position::new(1, 8));
    }

    #[test]
    fn truncate_keeps_positions_aligned() {
        let mut ctx = context_with(".a /* x */");
        ctx.truncate_content(3);
        assert_eq!(ctx.content(), ".a ");
        ctx.push('b');
        assert_eq!(ctx.position_at(3), Some(Position::new(1, 11)));
    }

    #[test]
    fn blank_summary_follows_edits() {
        let mut ctx = context_with("  \r\n ");
        assert!(ctx.is_blank());
        assert_eq!(ctx.last_line_break(), Some(2));

        ctx.drop_content_before(2);
        assert_eq!(ctx.content(), "\r\n ");
        assert_eq!(ctx.last_line_break(), Some(0));

        ctx.push('a');
        assert!(!ctx.is_blank());
        ctx.truncate_content(3);
        assert!(ctx.is_blank());

        ctx.reset_content();
        assert!(ctx.is_blank());
        assert_eq!(ctx.last_line_break(), None);
    }

    #[test]
    fn pattern_and_suffix_queries() {
        let ctx = context_with("  @");
        assert!(ctx.is_match(&Regex::new(r"^\s*@$").expect("pattern")));
        assert!(ctx.ends_with(" @"));
        assert!(!ctx.is_match(&Regex::new("^@").expect("pattern")));
    }

    #[test]
    fn anchors_mark_stripped_text() {
        let mut ctx = context_with(".a /* x */");
        ctx.truncate_content(3);
        for ch in " ## .b".chars() {
            ctx.push(ch);
        }
        assert_eq!(ctx.anchors(0, ctx.content().len()), vec![(3, Position::new(1, 11))]);
        assert!(context_with(".a\n.b").anchors(0, 5).is_empty());
    }

    #[test]
    fn block_stack() {
        let mut ctx = TokenizerContext::new();
        assert!(!ctx.in_block());
        let id = ctx.next_id();
        ctx.push_block(OpenBlock::new(id, Position::START, Position::START));
        assert_eq!(ctx.current_block().map(OpenBlock::id), Some(id));
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.pop_block().is_some());
        assert!(!ctx.in_block());
    }

    #[test]
    fn ids_are_sequential() {
        let mut ctx = TokenizerContext::new();
        assert_eq!(ctx.next_id(), TokenId(0));
        assert_eq!(ctx.next_id(), TokenId(1));
    }
}
