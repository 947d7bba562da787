//! Property tests: parsing always terminates with a usable result, and
//! canonical text survives a parse/render cycle.

use gridform_formula::{parse_formula, render, Locale, Parser, ParserOptions, RenderOptions};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..10_000).prop_map(|n| n.to_string()),
        (0u32..1000, 1u32..100).prop_map(|(whole, fraction)| format!("{whole}.{fraction}")),
        (
            any::<bool>(),
            proptest::char::range('A', 'Z'),
            any::<bool>(),
            1u32..10_000
        )
            .prop_map(|(abs_column, column, abs_row, row)| {
                let column_dollar = if abs_column { "$" } else { "" };
                let row_dollar = if abs_row { "$" } else { "" };
                format!("{column_dollar}{column}{row_dollar}{row}")
            }),
        (1u32..50, 50u32..100).prop_map(|(top, bottom)| format!("B{top}:D{bottom}")),
        "[a-z ]{0,6}".prop_map(|text| format!("\"{text}\"")),
        Just("TRUE".to_string()),
        Just("#N/A".to_string()),
    ]
}

/// Formulas already in canonical form
fn formula() -> impl Strategy<Value = String> {
    let operators = prop::sample::select(vec!["+", "-", "*", "/", "^", "&", "=", "<>", "<=", ">"]);
    leaf().prop_recursive(4, 32, 3, move |inner| {
        prop_oneof![
            (inner.clone(), operators.clone(), inner.clone())
                .prop_map(|(left, operator, right)| format!("{left} {operator} {right}")),
            inner.clone().prop_map(|expression| format!("({expression})")),
            (
                prop::sample::select(vec!["SUM", "IF", "F"]),
                prop::collection::vec(inner, 0..4)
            )
                .prop_map(|(name, arguments)| format!("{name}({})", arguments.join(", "))),
        ]
    })
}

proptest! {
    #[test]
    fn parsing_arbitrary_text_terminates(text in ".{0,64}") {
        let result = parse_formula(&text);
        if !result.valid {
            let position = result.error_position();
            prop_assert!(position.is_some());
            prop_assert!(position.unwrap_or(0) <= text.chars().count());
        }
    }

    #[test]
    fn parsing_formula_like_text_terminates(
        text in "[-+*/^&=<>():;,{}'\"#@$!%. A-Z0-9\\[\\]]{0,48}"
    ) {
        for parser in [
            Parser::default(),
            Parser::new(ParserOptions::default().with_r1c1(true).with_fractions(true)),
            Parser::new(ParserOptions::default().with_locale(Locale::european())),
        ] {
            let result = parser.parse(&text);
            prop_assert_eq!(result.valid, result.error.is_none());
            if let Some(root) = &result.root {
                // Rendering a partial tree must not panic either
                let _ = render(root, &RenderOptions::default());
            }
        }
    }

    #[test]
    fn canonical_formulas_round_trip(text in formula()) {
        let result = parse_formula(&text);
        prop_assert!(result.valid, "{:?} failed: {:?}", text, result.error);
        let root = result.root.unwrap();
        prop_assert_eq!(root.to_string(), text);
    }

    #[test]
    fn locale_conversion_is_reversible(text in formula()) {
        let root = parse_formula(&text).root.unwrap();
        let european = render(&root, &RenderOptions::for_locale(Locale::european()));

        let parser = Parser::new(ParserOptions::default().with_locale(Locale::european()));
        let back = parser.parse(&european);
        prop_assert!(back.valid, "{:?} failed: {:?}", european, back.error);
        prop_assert_eq!(back.root.unwrap().to_string(), text);
    }
}
