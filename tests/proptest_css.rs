//! Property-based tests with proptest.
//!
//! Generate stylesheets from known vocabulary and check that they lint
//! clean, and throw arbitrary CSS-like noise at the tokenizer to check the
//! shape of the token tree it builds.

mod common;

use common::{assert_well_formed, lint};
use csslint_rs::{Scanned, tokenize};
use proptest::prelude::*;

// -- Leaf strategies --

const PROPERTIES: &[&str] = &[
    "background",
    "border",
    "color",
    "display",
    "height",
    "margin",
    "opacity",
    "padding",
    "width",
    "z-index",
];

/// Class or id selector.
fn selector() -> impl Strategy<Value = String> {
    "[.#][a-z][a-z0-9-]{0,8}".prop_map(|s| s)
}

fn declaration() -> impl Strategy<Value = (String, String)> {
    (
        prop::sample::select(PROPERTIES).prop_map(str::to_string),
        "[a-z0-9]{1,8}".prop_map(|s| s),
    )
}

/// A style rule indented by `indent` spaces.
fn rule(indent: usize) -> impl Strategy<Value = String> {
    (selector(), prop::collection::vec(declaration(), 0..=4)).prop_map(move |(sel, decls)| {
        let pad = " ".repeat(indent);
        let mut out = format!("{pad}{sel} {{\n");
        for (name, value) in decls {
            out.push_str(&format!("{pad}  {name}: {value};\n"));
        }
        out.push_str(&format!("{pad}}}\n"));
        out
    })
}

/// Either a plain rule or a `@media` block wrapping a few rules.
fn item() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => rule(0),
        1 => prop::collection::vec(rule(2), 0..=3)
            .prop_map(|rules| format!("@media screen {{\n{}}}\n", rules.concat())),
    ]
}

fn stylesheet() -> impl Strategy<Value = String> {
    prop::collection::vec(item(), 0..=5).prop_map(|items| items.concat())
}

/// Noise built from the characters the scan rules react to.
fn noise() -> impl Strategy<Value = String> {
    "[a-z.#:;{} \n\t/*@\"(),-]{0,80}".prop_map(|s| s)
}

// -- Property tests --

proptest! {
    /// Stylesheets built only from known names lint clean.
    #[test]
    fn generated_stylesheets_are_valid(css in stylesheet()) {
        let errors = lint(&css);
        prop_assert!(errors.is_empty(), "{errors:#?}\n--- input ---\n{css}");
    }

    /// Two fresh tokenizers agree on the same input.
    #[test]
    fn tokenizing_is_idempotent(input in noise()) {
        prop_assert_eq!(tokenize(&input), tokenize(&input));
    }

    /// Blocks contain their children, which are ordered by start.
    #[test]
    fn blocks_are_well_formed(input in noise()) {
        for item in tokenize(&input) {
            if let Scanned::Token(token) = item {
                assert_well_formed(&token);
            }
        }
    }

    /// Every token and error has a non-empty span.
    #[test]
    fn spans_are_never_empty(input in noise()) {
        for item in tokenize(&input) {
            match item {
                Scanned::Token(token) => prop_assert!(token.start() < token.end()),
                Scanned::Error(error) => prop_assert!(error.start < error.end),
            }
        }
    }
}
