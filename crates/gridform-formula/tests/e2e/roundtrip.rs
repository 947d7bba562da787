//! Parse then render: canonical text survives, trees have the expected shape.

use gridform_formula::{
    render, LiteralValue, Locale, Operator, Parser, ParserOptions, ReferenceKind, RenderOptions,
    UnitKind,
};
use pretty_assertions::assert_eq;

use crate::{canonical, parse_valid, r1c1_parser, tree};

const MIXED: &str = "2.2 + (3 / foo(bar(\"1\"), 8))";

#[test]
fn test_canonical_text_round_trips() {
    for formula in [
        MIXED,
        "A1 + $B2 - C$3 - $ZZ$40",
        "SUM(A1:B10) * 2",
        "IF(A1 > 0, \"yes\", \"no\")",
        "-A1 ^ 2",
        "2 + -3",
        "Sheet2!A1 & 'My Data'!$C$3",
        "SUM(A:C) + SUM(5:10)",
        "{1,2;3,4}",
        "#N/A",
        "IF(A1, , 3)",
        "Sales[@Qty] * Sales[[#All],[Price]]",
        "A1#",
        "@A1:A10",
        "1.50E+3 + 25%",
        "TRUE <> FALSE",
        "foo()",
    ] {
        assert_eq!(canonical(formula), formula, "round trip of {formula:?}");
        assert_eq!(canonical(&format!("={formula}")), formula);
    }
}

#[test]
fn test_whitespace_is_normalized() {
    assert_eq!(canonical("=  SUM( A1 ,B2 )*2 "), "SUM(A1, B2) * 2");
    assert_eq!(canonical("=a1+b2"), "A1 + B2");
}

#[test]
fn test_locale_conversion() {
    let root = tree(MIXED);
    let european = RenderOptions::for_locale(Locale::european());
    assert_eq!(render(&root, &european), "2,2 + (3 / foo(bar(\"1\"); 8))");

    // And back again
    let parser = Parser::new(ParserOptions::default().with_locale(Locale::european()));
    let result = parser.parse("2,2 + (3 / foo(bar(\"1\"); 8))");
    assert!(result.valid);
    assert_eq!(
        render(&result.root.unwrap(), &RenderOptions::default()),
        MIXED
    );
}

#[test]
fn test_multiplication_tree() {
    let root = tree("10 * 8");
    let UnitKind::Binary(binary) = &root.kind else {
        panic!("expected a binary node, got {:?}", root.kind);
    };
    assert_eq!(binary.operator, Operator::Multiply);
    assert_eq!(binary.left.as_number(), Some(10.0));
    assert_eq!(binary.right.as_number(), Some(8.0));
}

#[test]
fn test_nested_groups() {
    let root = tree("(2 / (1 + (2 * 3))) * 4");
    let UnitKind::Binary(binary) = &root.kind else {
        panic!("expected a binary node");
    };
    assert_eq!(binary.operator, Operator::Multiply);
    assert_eq!(binary.right.as_number(), Some(4.0));
    let UnitKind::Group(group) = &binary.left.kind else {
        panic!("expected a group on the left");
    };
    assert!(group.explicit);
    assert_eq!(group.elements.len(), 1);
}

#[test]
fn test_unary_absorption() {
    let root = tree("2 + -3");
    let UnitKind::Binary(binary) = &root.kind else {
        panic!("expected a binary node");
    };
    assert_eq!(binary.operator, Operator::Add);
    let UnitKind::Unary(unary) = &binary.right.kind else {
        panic!("expected a unary right operand");
    };
    assert_eq!(unary.operator, Operator::Subtract);
    assert_eq!(unary.operand.as_number(), Some(3.0));
}

#[test]
fn test_absolute_flags_follow_dollar_signs() {
    let result = parse_valid("=A1 + $B2 - C$3 - $ZZ$40");
    let flags = |label: &str| {
        let address = &result.addresses[label];
        (address.absolute_column, address.absolute_row)
    };
    assert_eq!(flags("A1"), (false, false));
    assert_eq!(flags("$B2"), (true, false));
    assert_eq!(flags("C$3"), (false, true));
    assert_eq!(flags("$ZZ$40"), (true, true));

    let zz = &result.addresses["$ZZ$40"];
    assert_eq!((zz.row, zz.column), (39, 701));
}

#[test]
fn test_call_arguments() {
    let root = tree("foo()");
    let UnitKind::Call(call) = &root.kind else {
        panic!("expected a call");
    };
    assert_eq!(call.name, "foo");
    assert!(call.arguments.is_empty());

    let root = tree("oof(1, \"bar\", 3.3)");
    let UnitKind::Call(call) = &root.kind else {
        panic!("expected a call");
    };
    let values: Vec<_> = call
        .arguments
        .iter()
        .map(|argument| argument.as_literal().map(|literal| literal.value.clone()))
        .collect();
    assert_eq!(
        values,
        [
            Some(LiteralValue::Number(1.0)),
            Some(LiteralValue::String("bar".to_string())),
            Some(LiteralValue::Number(3.3)),
        ]
    );
}

#[test]
fn test_missing_arguments_keep_positions() {
    let root = tree("F(, 2, , )");
    let UnitKind::Call(call) = &root.kind else {
        panic!("expected a call");
    };
    let missing: Vec<bool> = call
        .arguments
        .iter()
        .map(|argument| matches!(argument.kind, UnitKind::Missing))
        .collect();
    assert_eq!(missing, [true, false, true, true]);
}

#[test]
fn test_references_in_source_order() {
    let result = parse_valid("=SUM(A1:B2) + C3 + Rate + T[Qty]");
    let kinds: Vec<&str> = result
        .references
        .iter()
        .map(|reference| match &reference.kind {
            ReferenceKind::Address(_) => "address",
            ReferenceKind::Range(_) => "range",
            ReferenceKind::Identifier(_) => "name",
            ReferenceKind::StructuredReference(_) => "table",
        })
        .collect();
    assert_eq!(kinds, ["range", "address", "name", "table"]);
    assert!(matches!(
        &result.references[2].kind,
        ReferenceKind::Identifier(name) if name == "Rate"
    ));

    // Range corners are not standalone dependencies
    assert_eq!(result.addresses.len(), 1);
    assert!(result.addresses.contains_key("C3"));
    assert!(result.ranges.contains_key("A1:B2"));
}

#[test]
fn test_address_shaped_function_names() {
    // LOG10 would be a cell address without the parenthesis
    let root = tree("LOG10(100)");
    assert!(matches!(&root.kind, UnitKind::Call(call) if call.name == "LOG10"));
    assert!(tree("LOG10").as_address().is_some());
}

#[test]
fn test_r1c1_round_trip() {
    let parser = r1c1_parser();
    let result = parser.parse("=SUM(R[-1]C:R1C[2]) + RC");
    assert!(result.valid);
    let options = RenderOptions::default().with_r1c1(None);
    assert_eq!(
        render(&result.root.unwrap(), &options),
        "SUM(R[-1]C:R1C[2]) + RC"
    );
}

#[test]
fn test_invalid_input_still_has_a_tree() {
    let result = gridform_formula::parse_formula("=SUM(A1, 2");
    assert!(!result.valid);
    assert!(result.root.is_some());
    assert!(result.error_message().is_some());
}

#[test]
fn test_long_formulas_parse_and_render() {
    // A long sum of cells, still well inside the spreadsheet length limit
    let cells: Vec<String> = (1..=150).map(|row| format!("A{row}")).collect();
    let sum = cells.join(" + ");
    assert_eq!(canonical(&sum), sum);

    for formula in [
        format!("={}1", "1+".repeat(4000)),
        format!("={}1", "- ".repeat(1000)),
        format!("=({}1)*2", "2^".repeat(3000)),
    ] {
        let result = gridform_formula::parse_formula(&formula);
        assert!(!result.valid);
        let root = result.root.unwrap();
        let _ = render(&root, &RenderOptions::for_locale(Locale::european()));
    }
}
