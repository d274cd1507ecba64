//! Pull-based CSS tokenizer.
//!
//! Characters are decoded lazily from any [`Read`] source and fed through
//! the [`ScanRule`]s in priority order. Completed top-level tokens and
//! structural errors come out of the [`Tokenizer`] iterator in source order;
//! tokens nested in blocks are delivered as children of the outermost
//! block once it closes.

use std::collections::VecDeque;
use std::io::{self, Read};

use tracing::trace;

use crate::Error;
use crate::context::TokenizerContext;
use crate::error::{ErrorKey, LintError};
use crate::position::Position;
use crate::rules::{self, Scan, ScanRule, clean_comment, hands_off};
use crate::token::{Token, TokenType};

/// Bytes requested from the reader per read call.
const CHUNK_SIZE: usize = 1024;

const BOM: char = '\u{feff}';

/// One item of the tokenizer stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scanned {
    Token(Token),
    Error(LintError),
}

impl Scanned {
    #[must_use]
    pub const fn as_token(&self) -> Option<&Token> {
        match self {
            Self::Token(token) => Some(token),
            Self::Error(_) => None,
        }
    }

    #[must_use]
    pub const fn as_error(&self) -> Option<&LintError> {
        match self {
            Self::Token(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

/// Tokenize an in-memory source.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Scanned> {
    Tokenizer::new(input.as_bytes())
        .filter_map(Result::ok)
        .collect()
}

/// Lazy tokenizer over a byte source.
///
/// The stream is finite and single-pass. A read failure is reported once as
/// [`Error::Io`] and ends the stream.
#[derive(Debug)]
pub struct Tokenizer<R> {
    source: CharSource<R>,
    ctx: TokenizerContext,
    queue: VecDeque<Scanned>,
    done: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            source: CharSource::new(reader),
            ctx: TokenizerContext::new(),
            queue: VecDeque::new(),
            done: false,
        }
    }

    /// Run every scan rule for one input character.
    fn scan_char(&mut self, ch: char) {
        self.ctx.push(ch);
        let mut producer = None;
        let mut index = 0;
        while let Some(&rule) = ScanRule::ORDER.get(index) {
            index += 1;
            if producer == Some(rule) {
                continue;
            }
            let (token, error) = match rule.scan(&mut self.ctx) {
                Scan::Skip => continue,
                Scan::Consumed => return,
                Scan::Error(error) => {
                    self.queue.push_back(Scanned::Error(error));
                    return;
                }
                Scan::Token(token) => (token, None),
                Scan::Recovered(token, error) => (token, Some(error)),
            };
            if let Some(error) = error {
                self.queue.push_back(Scanned::Error(error));
            }

            let token_type = token.token_type();
            trace!(
                rule = %rule,
                kind = %token_type,
                line = token.start().line,
                column = token.start().column,
                "token"
            );
            self.ctx.record_completed(&token);
            self.accept(token);
            self.ctx.reset_content();

            let continues = token_type.is_boundary()
                && ScanRule::ORDER
                    .iter()
                    .any(|&next| next != rule && hands_off(token_type, next, ch));
            if !continues {
                return;
            }
            // The terminator starts the next token: rescan it, skipping the
            // line-ending rule that already counted it.
            self.ctx.push_again(ch);
            producer = Some(rule);
            index = 1;
        }
    }

    /// Attach `token` to the innermost open block, or queue it at top level.
    fn accept(&mut self, token: Token) {
        match self.ctx.current_block_mut() {
            Some(block) => block.add_token(token),
            None => {
                let token = self.ctx.accept_top_level(token);
                self.queue.push_back(Scanned::Token(token));
            }
        }
    }

    fn unclosed(&mut self, token_type: TokenType, start: Position) {
        let end = self.ctx.next_position();
        self.queue.push_back(Scanned::Error(LintError::new(
            ErrorKey::UnclosedToken,
            format!("Unclosed \"{token_type}\" detected"),
            start,
            end,
        )));
    }

    /// Close everything still open once the source is exhausted.
    fn finish(&mut self) {
        if let Some(comment) = self.ctx.take_comment() {
            let start = comment.start;
            self.unclosed(TokenType::Comment, start);
            if comment.embedded {
                self.ctx.truncate_content(comment.offset);
            } else {
                let raw = self.ctx.content().get(comment.offset + 2..).unwrap_or("");
                let value = clean_comment(raw);
                let end = self.ctx.next_position();
                let token = comment.finish(value, end);
                self.accept(token);
                self.ctx.reset_content();
            }
        }

        if let Some(token) = rules::close_open_token(&mut self.ctx) {
            if token.token_type() != TokenType::Whitespace {
                self.unclosed(token.token_type(), token.start());
            }
            self.accept(token);
            self.ctx.reset_content();
        }

        let len = self.ctx.content().len();
        let residue = self.ctx.trimmed_span(len).map(|(start, end)| {
            LintError::new(
                ErrorKey::UnexpectedCharacterEndOfContent,
                format!(
                    "Unexpected content \"{}\" at end of input",
                    self.ctx.content().trim()
                ),
                start,
                end,
            )
        });
        self.ctx.reset_content();

        while let Some(block) = self.ctx.pop_block() {
            self.unclosed(TokenType::Block, block.header_start());
            let end = self.ctx.next_position();
            trace!(depth = self.ctx.depth(), "block force-closed");
            self.accept(block.finish(end));
        }

        if let Some(error) = residue {
            self.queue.push_back(Scanned::Error(error));
        }
    }
}

impl<R: Read> Iterator for Tokenizer<R> {
    type Item = Result<Scanned, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.queue.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            match self.source.next_char() {
                Ok(Some(ch)) => self.scan_char(ch),
                Ok(None) => {
                    self.finish();
                    self.done = true;
                }
                Err(error) => {
                    self.done = true;
                    return Some(Err(Error::Io(error)));
                }
            }
        }
    }
}

/// Incremental UTF-8 decoder reading fixed-size chunks.
///
/// Sequences split across chunks are carried over; invalid bytes decode to
/// U+FFFD. A leading byte-order mark is skipped.
#[derive(Debug)]
struct CharSource<R> {
    reader: R,
    carry: Vec<u8>,
    chars: VecDeque<char>,
    started: bool,
    eof: bool,
}

impl<R: Read> CharSource<R> {
    const fn new(reader: R) -> Self {
        Self {
            reader,
            carry: Vec::new(),
            chars: VecDeque::new(),
            started: false,
            eof: false,
        }
    }

    fn next_char(&mut self) -> io::Result<Option<char>> {
        while self.chars.is_empty() && !self.eof {
            self.fill()?;
        }
        if !self.started && !self.chars.is_empty() {
            self.started = true;
            if self.chars.front() == Some(&BOM) {
                self.chars.pop_front();
                return self.next_char();
            }
        }
        Ok(self.chars.pop_front())
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let read = loop {
            match self.reader.read(&mut chunk) {
                Ok(read) => break read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        };
        if read == 0 {
            self.eof = true;
            if !self.carry.is_empty() {
                self.carry.clear();
                self.chars.push_back(char::REPLACEMENT_CHARACTER);
            }
            return Ok(());
        }
        self.carry.extend_from_slice(&chunk[..read]);
        self.decode();
        Ok(())
    }

    fn decode(&mut self) {
        let mut bytes = self.carry.as_slice();
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    self.chars.extend(text.chars());
                    bytes = &[];
                    break;
                }
                Err(error) => {
                    let (valid, rest) = bytes.split_at(error.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.chars.extend(text.chars());
                    }
                    match error.error_len() {
                        Some(len) => {
                            self.chars.push_back(char::REPLACEMENT_CHARACTER);
                            bytes = &rest[len..];
                        }
                        None => {
                            bytes = rest;
                            break;
                        }
                    }
                }
            }
        }
        self.carry = bytes.to_vec();
    }
}
