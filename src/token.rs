use std::fmt;

use serde::Serialize;

use crate::position::Position;

/// Handle identifying a token within one tokenizer run.
///
/// Used for the non-owning `parent` and `previous` back-references; the
/// owning direction is always `Block` to children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenId(pub(crate) u32);

/// Field-less tag of [`TokenKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenType {
    Selector,
    Property,
    AtRule,
    Comment,
    Whitespace,
    Block,
}

impl TokenType {
    pub const ALL: [Self; 6] = [
        Self::Selector,
        Self::Property,
        Self::AtRule,
        Self::Comment,
        Self::Whitespace,
        Self::Block,
    ];

    /// Name used in serialized output and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selector => "selector",
            Self::Property => "property",
            Self::AtRule => "at-rule",
            Self::Comment => "comment",
            Self::Whitespace => "whitespace",
            Self::Block => "block",
        }
    }

    /// Whether the character terminating this kind of token may also be
    /// claimed by another scan rule.
    #[must_use]
    pub const fn is_boundary(self) -> bool {
        match self {
            Self::Selector | Self::Property | Self::AtRule | Self::Comment | Self::Whitespace => {
                true
            }
            Self::Block => false,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token payload, one variant per token kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum TokenKind {
    /// Selector text preceding a block, e.g. `.button:hover`.
    ///
    /// Embedded comments are stripped from the text; use
    /// [`Token::locate`] to map offsets back to the source.
    Selector(String),
    /// Declaration inside a block, e.g. `display: block`.
    Property { name: String, value: Option<String> },
    /// At-rule statement or block prelude, e.g. `@media screen`.
    AtRule {
        name: String,
        value: Option<String>,
        #[serde(rename = "isBlock")]
        is_block: bool,
    },
    /// Comment text with delimiters stripped.
    Comment(String),
    /// Line break plus indentation.
    Whitespace(String),
    /// `{ ... }` region owning its children.
    Block(Vec<Token>),
}

impl TokenKind {
    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        match self {
            Self::Selector(_) => TokenType::Selector,
            Self::Property { .. } => TokenType::Property,
            Self::AtRule { .. } => TokenType::AtRule,
            Self::Comment(_) => TokenType::Comment,
            Self::Whitespace(_) => TokenType::Whitespace,
            Self::Block(_) => TokenType::Block,
        }
    }
}

/// A completed token with its source span.
///
/// Tokens are immutable once built: the only way to obtain one from the
/// tokenizer is by finishing an [`OpenToken`] or [`OpenBlock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    #[serde(skip)]
    id: TokenId,
    #[serde(skip)]
    parent: Option<TokenId>,
    #[serde(skip)]
    previous: Option<TokenId>,
    /// Value offsets where the source jumps over stripped text, with the
    /// source position of the character found there.
    #[serde(skip)]
    anchors: Vec<(usize, Position)>,
    #[serde(flatten)]
    kind: TokenKind,
    start: Position,
    end: Position,
}

impl Token {
    /// Build a detached, completed token.
    ///
    /// `end` is widened to at least one column past `start`.
    #[must_use]
    pub fn new(kind: TokenKind, start: Position, end: Position) -> Self {
        Self::with_id(TokenId::default(), kind, start, end)
    }

    pub(crate) fn with_id(id: TokenId, kind: TokenKind, start: Position, end: Position) -> Self {
        let end = if end <= start { start.next_column() } else { end };
        Self {
            id,
            parent: None,
            previous: None,
            anchors: Vec::new(),
            kind,
            start,
            end,
        }
    }

    pub(crate) fn with_anchors(mut self, anchors: Vec<(usize, Position)>) -> Self {
        self.anchors = anchors;
        self
    }

    /// Record the token completed right before this one at top level.
    pub(crate) fn linked_after(mut self, previous: Option<TokenId>) -> Self {
        self.previous = previous;
        self
    }

    #[must_use]
    pub const fn id(&self) -> TokenId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> &TokenKind {
        &self.kind
    }

    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        self.kind.token_type()
    }

    #[must_use]
    pub const fn start(&self) -> Position {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Position {
        self.end
    }

    /// Owning block, if the token was attached to one.
    #[must_use]
    pub const fn parent(&self) -> Option<TokenId> {
        self.parent
    }

    /// Token completed immediately before this one in the same scope.
    #[must_use]
    pub const fn previous(&self) -> Option<TokenId> {
        self.previous
    }

    /// Children of a block, empty for every other kind.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.kind {
            TokenKind::Block(children) => children,
            _ => &[],
        }
    }

    /// Source position of byte `offset` within `value`, this token's text
    /// payload.
    #[must_use]
    pub fn locate(&self, value: &str, offset: usize) -> Position {
        let (from, origin) = self
            .anchors
            .iter()
            .rev()
            .find(|(at, _)| *at <= offset)
            .copied()
            .unwrap_or((0, self.start));
        origin.advanced_over(value.get(from..offset).unwrap_or(""))
    }

    /// Find a direct child by id.
    #[must_use]
    pub fn child(&self, id: TokenId) -> Option<&Self> {
        self.children().iter().find(|child| child.id == id)
    }
}

/// Kinds of token that stay open across characters.
///
/// Selectors complete on the character that ends them, blocks live on the
/// block stack and comments are tracked apart from the open token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenKind {
    /// Declaration whose name has been read.
    Property { name: String },
    AtRule,
    Whitespace,
}

impl OpenKind {
    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        match self {
            Self::Property { .. } => TokenType::Property,
            Self::AtRule => TokenType::AtRule,
            Self::Whitespace => TokenType::Whitespace,
        }
    }
}

/// A token still being scanned.
///
/// Owned by the tokenizer context until [`OpenToken::finish`] turns it into
/// an immutable [`Token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenToken {
    id: TokenId,
    kind: OpenKind,
    start: Position,
}

impl OpenToken {
    pub(crate) const fn new(id: TokenId, kind: OpenKind, start: Position) -> Self {
        Self { id, kind, start }
    }

    #[must_use]
    pub const fn token_type(&self) -> TokenType {
        self.kind.token_type()
    }

    #[must_use]
    pub const fn kind(&self) -> &OpenKind {
        &self.kind
    }

    #[must_use]
    pub const fn start(&self) -> Position {
        self.start
    }

    /// Complete the token with its final payload.
    pub(crate) fn finish(self, kind: TokenKind, end: Position) -> Token {
        debug_assert_eq!(kind.token_type(), self.token_type());
        Token::with_id(self.id, kind, self.start, end)
    }
}

/// A `{` that has not been closed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBlock {
    id: TokenId,
    start: Position,
    header_start: Position,
    children: Vec<Token>,
    last_child: Option<TokenId>,
}

impl OpenBlock {
    pub(crate) const fn new(id: TokenId, start: Position, header_start: Position) -> Self {
        Self {
            id,
            start,
            header_start,
            children: Vec::new(),
            last_child: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> TokenId {
        self.id
    }

    #[must_use]
    pub const fn start(&self) -> Position {
        self.start
    }

    /// Start of the selector or at-rule that opened this block, or of the
    /// `{` itself when nothing did.
    #[must_use]
    pub const fn header_start(&self) -> Position {
        self.header_start
    }

    #[must_use]
    pub fn children(&self) -> &[Token] {
        &self.children
    }

    /// Append a completed child, linking it to this block and to the
    /// previously added child.
    pub fn add_token(&mut self, mut token: Token) {
        token.parent = Some(self.id);
        token.previous = self.last_child;
        self.last_child = Some(token.id);
        self.children.push(token);
    }

    /// Close the block; `end` is exclusive.
    pub(crate) fn finish(self, end: Position) -> Token {
        Token::with_id(self.id, TokenKind::Block(self.children), self.start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_token_is_widened() {
        let at = Position::new(3, 7);
        let token = Token::new(TokenKind::Whitespace(String::new()), at, at);
        assert_eq!(token.end(), Position::new(3, 8));
    }

    #[test]
    fn add_token_links_parent_and_previous() {
        let mut block = OpenBlock::new(TokenId(7), Position::new(1, 5), Position::START);
        let first = Token::with_id(
            TokenId(8),
            TokenKind::Property {
                name: "color".into(),
                value: Some("red".into()),
            },
            Position::new(1, 7),
            Position::new(1, 18),
        );
        let second = Token::with_id(
            TokenId(9),
            TokenKind::Property {
                name: "margin".into(),
                value: Some("0".into()),
            },
            Position::new(1, 19),
            Position::new(1, 29),
        );
        block.add_token(first);
        block.add_token(second);

        let token = block.finish(Position::new(1, 31));
        let children = token.children();
        assert_eq!(children[0].parent(), Some(TokenId(7)));
        assert_eq!(children[0].previous(), None);
        assert_eq!(children[1].previous(), Some(TokenId(8)));
        assert_eq!(token.child(TokenId(9)).map(Token::start), Some(Position::new(1, 19)));
    }

    #[test]
    fn serializes_kind_specific_payload() {
        let token = Token::new(
            TokenKind::AtRule {
                name: "import".into(),
                value: Some("\"a.css\"".into()),
                is_block: false,
            },
            Position::START,
            Position::new(1, 17),
        );
        let json = serde_json::to_value(&token).expect("serialize");
        assert_eq!(json["type"], "at-rule");
        assert_eq!(json["value"]["name"], "import");
        assert_eq!(json["value"]["isBlock"], false);
        assert_eq!(json["start"]["line"], 1);
        assert_eq!(json["end"]["column"], 17);
    }

    #[test]
    fn serializes_selector_value_as_string() {
        let token = Token::new(
            TokenKind::Selector(".button".into()),
            Position::START,
            Position::new(1, 8),
        );
        let json = serde_json::to_value(&token).expect("serialize");
        assert_eq!(json["type"], "selector");
        assert_eq!(json["value"], ".button");
    }

    #[test]
    fn locate_follows_anchors() {
        let value = ".a  ## .b";
        let token = Token::new(
            TokenKind::Selector(value.into()),
            Position::START,
            Position::new(1, 17),
        )
        .with_anchors(vec![(3, Position::new(1, 11))]);
        assert_eq!(token.locate(value, 1), Position::new(1, 2));
        assert_eq!(token.locate(value, 4), Position::new(1, 12));

        let plain = Token::new(TokenKind::Selector("a\nb".into()), Position::START, Position::new(2, 2));
        assert_eq!(plain.locate("a\nb", 2), Position::new(2, 1));
    }

    #[test]
    fn open_kinds_map_to_token_types() {
        let open = OpenToken::new(
            TokenId(1),
            OpenKind::Property {
                name: "color".into(),
            },
            Position::START,
        );
        assert_eq!(open.token_type(), TokenType::Property);
        assert_eq!(OpenKind::AtRule.token_type(), TokenType::AtRule);
        assert_eq!(OpenKind::Whitespace.token_type(), TokenType::Whitespace);
    }

    #[test]
    fn boundary_capability() {
        assert!(TokenType::Selector.is_boundary());
        assert!(TokenType::Whitespace.is_boundary());
        assert!(!TokenType::Block.is_boundary());
    }
}
