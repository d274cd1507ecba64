//! Tokenizer behaviour and structural errors.

mod common;

use common::{assert_well_formed, structural_errors, top_level};
use csslint_rs::{ErrorKey, Position, Scanned, TokenKind, TokenType, Tokenizer, tokenize};
use pretty_assertions::assert_eq;

fn kinds(tokens: &[csslint_rs::Token]) -> Vec<TokenType> {
    tokens.iter().map(csslint_rs::Token::token_type).collect()
}

// -----------------------------------------------------------
// Token shapes and spans.
// -----------------------------------------------------------

#[test]
fn empty_input() {
    assert!(tokenize("").is_empty());
}

#[test]
fn whitespace_only_input() {
    let items = tokenize("  \n  ");
    assert_eq!(items.len(), 1);
    let Scanned::Token(token) = &items[0] else {
        panic!("expected a token, got {items:?}");
    };
    assert_eq!(token.kind(), &TokenKind::Whitespace("  \n  ".to_string()));
    assert_eq!(token.start(), Position::START);
}

#[test]
fn declaration_closed_by_brace() {
    let tokens = top_level("a { color: red }");
    let block = &tokens[1];
    assert_eq!(block.start(), Position::new(1, 3));
    assert_eq!(block.end(), Position::new(1, 17));

    let property = &block.children()[0];
    assert_eq!(
        property.kind(),
        &TokenKind::Property {
            name: "color".to_string(),
            value: Some("red".to_string()),
        }
    );
    assert_eq!(property.start(), Position::new(1, 5));
    assert_eq!(property.end(), Position::new(1, 15));
}

#[test]
fn statement_at_rule_span() {
    let tokens = top_level("@charset \"UTF-8\";");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].start(), Position::new(1, 1));
    assert_eq!(tokens[0].end(), Position::new(1, 18));
}

#[test]
fn layer_statement_keeps_name_list() {
    let tokens = top_level("@layer base, components;");
    assert_eq!(
        tokens[0].kind(),
        &TokenKind::AtRule {
            name: "layer".to_string(),
            value: Some("base, components".to_string()),
            is_block: false,
        }
    );
}

#[test]
fn selector_list_across_lines() {
    let tokens = top_level("h1,\nh2 {\n}");
    assert_eq!(tokens[0].kind(), &TokenKind::Selector("h1,\nh2".to_string()));
    assert_eq!(tokens[0].start(), Position::new(1, 1));
    assert_eq!(tokens[0].end(), Position::new(2, 3));
    assert_eq!(tokens[1].start(), Position::new(2, 4));
    assert_eq!(tokens[1].end(), Position::new(3, 2));
}

#[test]
fn comment_between_declarations() {
    let tokens = top_level(".a {\n  /* c */\n  color: red;\n}");
    let block = &tokens[1];
    assert_eq!(
        kinds(block.children()),
        vec![
            TokenType::Whitespace,
            TokenType::Comment,
            TokenType::Whitespace,
            TokenType::Property,
            TokenType::Whitespace,
        ]
    );
    assert_eq!(block.children()[1].kind(), &TokenKind::Comment("c".to_string()));
}

#[test]
fn braces_inside_strings_do_not_open_blocks() {
    let tokens = top_level(".a { content: \"}\"; }");
    let block = &tokens[1];
    assert_eq!(block.children().len(), 1);
    assert_eq!(
        block.children()[0].kind(),
        &TokenKind::Property {
            name: "content".to_string(),
            value: Some("\"}\"".to_string()),
        }
    );
}

#[test]
fn crlf_line_endings() {
    let tokens = top_level(".a {\r\n  color: red;\r\n}");
    let property = tokens[1]
        .children()
        .iter()
        .find(|child| child.token_type() == TokenType::Property)
        .expect("property");
    assert_eq!(property.start(), Position::new(2, 3));
}

#[test]
fn deep_nesting_is_well_formed() {
    let source = "@supports (display: grid) {\n  @media screen {\n    .a { color: red; }\n  }\n}";
    assert!(structural_errors(source).is_empty());
    let tokens = top_level(source);
    assert_eq!(kinds(&tokens), vec![TokenType::AtRule, TokenType::Block]);
    assert_eq!(
        tokens[0].kind(),
        &TokenKind::AtRule {
            name: "supports".to_string(),
            value: Some("(display: grid)".to_string()),
            is_block: true,
        }
    );
    assert_well_formed(&tokens[1]);
}

#[test]
fn back_references() {
    let tokens = top_level(".a { color: red; margin: 0; }");
    let block = &tokens[1];
    assert_eq!(block.previous(), Some(tokens[0].id()));
    assert_eq!(block.parent(), None);

    let children = block.children();
    assert_eq!(children[0].previous(), None);
    assert_eq!(children[1].previous(), Some(children[0].id()));
    assert!(children.iter().all(|child| child.parent() == Some(block.id())));
    assert_eq!(block.child(children[1].id()), Some(&children[1]));
}

// -----------------------------------------------------------
// Structural errors.
// -----------------------------------------------------------

#[test]
fn unclosed_at_rule() {
    let errors = structural_errors("@import url(a.css)");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, ErrorKey::UnclosedToken);
    assert_eq!(errors[0].message, "Unclosed \"at-rule\" detected");
    assert_eq!(errors[0].start, Position::new(1, 1));
    assert_eq!(errors[0].end, Position::new(1, 19));

    let tokens = top_level("@import url(a.css)");
    assert_eq!(
        tokens[0].kind(),
        &TokenKind::AtRule {
            name: "import".to_string(),
            value: Some("url(a.css)".to_string()),
            is_block: false,
        }
    );
}

#[test]
fn declaration_outside_block_is_residue() {
    let errors = structural_errors("color: red;");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, ErrorKey::UnexpectedCharacterEndOfContent);
    assert_eq!(errors[0].start, Position::new(1, 1));
    assert_eq!(errors[0].end, Position::new(1, 12));
}

#[test]
fn unclaimed_block_header() {
    let errors = structural_errors(".a & .b { }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, ErrorKey::UnexpectedSelectorCharacter);
    assert!(errors[0].message.contains("\"&\""));

    let tokens = top_level(".a & .b { }");
    assert_eq!(kinds(&tokens), vec![TokenType::Block]);
}

#[test]
fn malformed_header_inside_block_keeps_nesting() {
    let source = "@media print {\n  a:hover & b { color: red; }\n  .c { color: blue; }\n}";
    let errors = structural_errors(source);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, ErrorKey::UnexpectedSelectorCharacter);
    assert_eq!(errors[0].start, Position::new(2, 3));
    assert_eq!(errors[0].end, Position::new(2, 14));

    let tokens = top_level(source);
    assert_eq!(kinds(&tokens), vec![TokenType::AtRule, TokenType::Block]);
    assert_eq!(
        kinds(tokens[1].children()),
        vec![
            TokenType::Whitespace,
            TokenType::Block,
            TokenType::Whitespace,
            TokenType::Selector,
            TokenType::Block,
            TokenType::Whitespace,
        ]
    );
    assert_well_formed(&tokens[1]);
}

#[test]
fn long_inline_whitespace_runs() {
    let trailing = format!(".a {{}}{}", " ".repeat(200_000));
    assert_eq!(kinds(&top_level(&trailing)), vec![TokenType::Selector, TokenType::Block]);
    assert!(structural_errors(&trailing).is_empty());

    let inside = format!(".a {{{}}}", " ".repeat(200_000));
    let tokens = top_level(&inside);
    assert!(tokens[1].children().is_empty());
    assert_eq!(tokens[1].end(), Position::new(1, 200_006));
}

#[test]
fn comment_marker_inside_url() {
    let tokens = top_level(".a { background: url(/img/*.png); }");
    assert_eq!(
        tokens[1].children()[0].kind(),
        &TokenKind::Property {
            name: "background".to_string(),
            value: Some("url(/img/*.png)".to_string()),
        }
    );
}

#[test]
fn stray_content_before_closing_brace() {
    let errors = structural_errors(".a { color }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, ErrorKey::UnexpectedCharacterInBlockContent);
    assert_eq!(errors[0].start, Position::new(1, 6));
    assert_eq!(errors[0].end, Position::new(1, 11));
}

#[test]
fn nested_unclosed_blocks_report_innermost_first() {
    let errors = structural_errors("@media print {\n  .a {");
    let starts: Vec<_> = errors.iter().map(|error| error.start).collect();
    assert_eq!(starts, vec![Position::new(2, 3), Position::new(1, 1)]);
    assert!(errors.iter().all(|error| error.key == ErrorKey::UnclosedToken));

    let tokens = top_level("@media print {\n  .a {");
    assert_eq!(tokens[1].children().len(), 3);
    assert_well_formed(&tokens[1]);
}

// -----------------------------------------------------------
// Sources and serialization.
// -----------------------------------------------------------

#[test]
fn reader_and_string_sources_agree() {
    let source = ".a {\n  color: red;\n}\n";
    let from_reader: Vec<_> = Tokenizer::new(std::io::Cursor::new(source.as_bytes().to_vec()))
        .collect::<Result<_, _>>()
        .expect("tokenize");
    assert_eq!(from_reader, tokenize(source));
}

#[test]
fn token_json_shape() {
    let tokens = top_level(".a { color: red; }");
    let json = serde_json::to_value(&tokens[0]).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "type": "selector",
            "value": ".a",
            "start": { "line": 1, "column": 1 },
            "end": { "line": 1, "column": 3 },
        })
    );

    let block = serde_json::to_value(&tokens[1]).expect("serialize");
    assert_eq!(block["type"], "block");
    assert_eq!(block["value"][0]["type"], "property");
    assert_eq!(block["value"][0]["value"]["name"], "color");
}
