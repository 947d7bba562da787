//! Common helpers for the end-to-end tests.

use gridform_formula::{parse_formula, ParseResult, Parser, ParserOptions, Unit};

/// Parse with default options, panicking on invalid input.
pub fn parse_valid(formula: &str) -> ParseResult {
    let result = parse_formula(formula);
    assert!(
        result.valid,
        "expected {formula:?} to parse, got {:?}",
        result.error
    );
    result
}

/// The tree of a formula that must parse.
pub fn tree(formula: &str) -> Unit {
    parse_valid(formula)
        .root
        .unwrap_or_else(|| panic!("{formula:?} has no tree"))
}

/// Canonical text of a formula under default options.
pub fn canonical(formula: &str) -> String {
    tree(formula).to_string()
}

pub fn r1c1_parser() -> Parser {
    Parser::new(ParserOptions::default().with_r1c1(true))
}
