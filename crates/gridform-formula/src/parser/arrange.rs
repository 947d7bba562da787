//! Arrangement of a flat unit sequence into a tree

use super::context::ParseContext;
use super::Parser;
use crate::ast::{
    Binary, Dimensioned, Group, ImplicitCall, Literal, LiteralValue, Operator, Span, Unary, Unit,
    UnitId, UnitKind,
};
use crate::error::{ParseError, ParseErrorKind};

/// How many operator levels a sequence may stack per allowed nesting level
const OPERATOR_NESTING: usize = 4;

impl Parser {
    /// Arrange one separator-free sequence into a single unit
    ///
    /// On failure the error is recorded and the raw units come back wrapped
    /// in a non-explicit group.
    pub(super) fn arrange(&self, ctx: &mut ParseContext, units: Vec<Unit>) -> Unit {
        let mut units = self.bind_ranges(ctx, units);
        if self.options.fractions {
            units = fold_fractions(ctx, units);
        }
        if self.options.dimensioned {
            units = fold_dimensions(ctx, units);
        }
        let units = fold_implicit_calls(ctx, units);

        let limit = self.options.max_depth.saturating_mul(OPERATOR_NESTING);
        match check_height(&units, limit).and_then(|()| climb(ctx, &units)) {
            Ok(tree) => tree,
            Err(error) => {
                ctx.fail(error.kind, error.position);
                let span = match (units.first(), units.last()) {
                    (Some(first), Some(last)) => first.span.to(last.span),
                    _ => Span::default(),
                };
                ctx.unit(
                    span,
                    UnitKind::Group(Group {
                        explicit: false,
                        elements: units,
                    }),
                )
            }
        }
    }
}

/// `1 1/2` -> one literal worth 1.5
fn fold_fractions(ctx: &mut ParseContext, units: Vec<Unit>) -> Vec<Unit> {
    let mut folded = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        if let Some(fraction) = fraction_at(ctx, &units[i..]) {
            folded.push(fraction);
            i += 4;
        } else {
            folded.push(units[i].clone());
            i += 1;
        }
    }
    folded
}

fn fraction_at(ctx: &mut ParseContext, units: &[Unit]) -> Option<Unit> {
    let [whole, numerator, slash, denominator, ..] = units else {
        return None;
    };
    if !matches!(slash.kind, UnitKind::Operator(Operator::Divide)) {
        return None;
    }
    let (whole_value, whole_text) = integer_literal(whole)?;
    let (numerator_value, numerator_text) = integer_literal(numerator)?;
    let (denominator_value, denominator_text) = integer_literal(denominator)?;
    if numerator_text.starts_with('-') || denominator_text.starts_with('-') || denominator_value == 0.0
    {
        return None;
    }

    let part = numerator_value / denominator_value;
    let value = if whole_text.starts_with('-') {
        whole_value - part
    } else {
        whole_value + part
    };
    let text = format!("{whole_text} {numerator_text}/{denominator_text}");

    Some(ctx.unit(
        whole.span.to(denominator.span),
        UnitKind::Literal(Literal {
            value: LiteralValue::Number(value),
            text: Some(text),
        }),
    ))
}

fn integer_literal(unit: &Unit) -> Option<(f64, &str)> {
    match &unit.kind {
        UnitKind::Literal(Literal {
            value: LiteralValue::Number(value),
            text: Some(text),
        }) => {
            let digits = text.strip_prefix('-').unwrap_or(text);
            (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .then_some((*value, text.as_str()))
        }
        _ => None,
    }
}

/// `3 ft lbs` -> a value with unit `ft lbs`
fn fold_dimensions(ctx: &mut ParseContext, units: Vec<Unit>) -> Vec<Unit> {
    let mut folded: Vec<Unit> = Vec::with_capacity(units.len());
    for unit in units {
        let UnitKind::Identifier(name) = &unit.kind else {
            folded.push(unit);
            continue;
        };

        match folded.last_mut() {
            Some(Unit {
                span,
                kind: UnitKind::Dimensioned(dimensioned),
                ..
            }) => {
                dimensioned.unit.push(' ');
                dimensioned.unit.push_str(name);
                *span = span.to(unit.span);
                ctx.forget_reference(unit.id);
            }
            Some(last) if takes_dimension(last) => {
                let span = last.span.to(unit.span);
                let name = name.clone();
                ctx.forget_reference(unit.id);
                if let Some(value) = folded.pop() {
                    let dimensioned = ctx.unit(
                        span,
                        UnitKind::Dimensioned(Dimensioned {
                            value: Box::new(value),
                            unit: name,
                        }),
                    );
                    folded.push(dimensioned);
                }
            }
            _ => folded.push(unit),
        }
    }
    folded
}

fn takes_dimension(unit: &Unit) -> bool {
    matches!(
        unit.kind,
        UnitKind::Literal(Literal {
            value: LiteralValue::Number(_),
            ..
        }) | UnitKind::Group(_)
            | UnitKind::Call(_)
    )
}

/// `LAMBDA(x, x + 1)(2)` -> the call applied to `(2)`
fn fold_implicit_calls(ctx: &mut ParseContext, units: Vec<Unit>) -> Vec<Unit> {
    let mut folded: Vec<Unit> = Vec::with_capacity(units.len());
    for unit in units {
        let applies = matches!(&unit.kind, UnitKind::Group(group) if group.explicit)
            && folded.last().map_or(false, is_callable);
        if !applies {
            folded.push(unit);
            continue;
        }

        let Unit { span, kind, .. } = unit;
        if let (Some(callee), UnitKind::Group(group)) = (folded.pop(), kind) {
            let span = callee.span.to(span);
            let call = ctx.unit(
                span,
                UnitKind::ImplicitCall(ImplicitCall {
                    callee: Box::new(callee),
                    arguments: group.elements,
                }),
            );
            folded.push(call);
        }
    }
    folded
}

fn is_callable(unit: &Unit) -> bool {
    matches!(
        unit.kind,
        UnitKind::Address(_) | UnitKind::Call(_) | UnitKind::Identifier(_) | UnitKind::ImplicitCall(_)
    )
}

/// Every operator adds at most one level on top of the tallest operand, so
/// their sum bounds the height of the climbed tree
fn check_height(units: &[Unit], limit: usize) -> Result<(), ParseError> {
    let mut operators = 0;
    let mut tallest = 0;
    for unit in units {
        match unit.kind {
            UnitKind::Operator(_) => operators += 1,
            _ => tallest = tallest.max(height(unit)),
        }
        if operators + tallest > limit {
            return Err(ParseError::new(
                ParseErrorKind::TooDeep(limit),
                unit.span.start,
            ));
        }
    }
    Ok(())
}

/// Number of levels in `unit`, counted without recursion
fn height<'a>(unit: &'a Unit) -> usize {
    let mut tallest = 0;
    let mut pending = vec![(unit, 1)];
    while let Some((unit, level)) = pending.pop() {
        tallest = tallest.max(level);
        let mut push = |child: &'a Unit| pending.push((child, level + 1));
        match &unit.kind {
            UnitKind::Binary(binary) => {
                push(binary.left.as_ref());
                push(binary.right.as_ref());
            }
            UnitKind::Unary(unary) => push(unary.operand.as_ref()),
            UnitKind::Group(Group { elements, .. }) => elements.iter().for_each(push),
            UnitKind::Call(call) => call.arguments.iter().for_each(push),
            UnitKind::ImplicitCall(call) => {
                push(call.callee.as_ref());
                call.arguments.iter().for_each(push);
            }
            UnitKind::Dimensioned(dimensioned) => push(dimensioned.value.as_ref()),
            _ => {}
        }
    }
    tallest
}

/// Climb operators into a tree by precedence
///
/// Scans left to right keeping the tree built so far. A binary operator is
/// inserted down the right spine of that tree past every operator it binds
/// tighter than. Operators with nothing on their left are unary and apply
/// to the leftmost operand of everything after them.
fn climb(ctx: &mut ParseContext, units: &[Unit]) -> Result<Unit, ParseError> {
    let mut prefixes: Vec<(&Unit, Operator)> = Vec::new();
    let mut index = 0;
    while let Some(unit) = units.get(index) {
        let UnitKind::Operator(operator) = unit.kind else {
            break;
        };
        if !operator.is_unary() || index + 1 >= units.len() {
            return Err(missing_operand(operator, unit));
        }
        prefixes.push((unit, operator));
        index += 1;
    }

    let mut tree: Option<Unit> = None;
    while let Some(unit) = units.get(index) {
        index += 1;
        match &unit.kind {
            UnitKind::Operator(operator) => {
                let operator = *operator;
                let Some(left) = tree.take() else {
                    return Err(missing_operand(operator, unit));
                };
                if !operator.is_binary() {
                    return Err(missing_operand(operator, unit));
                }
                let (right, next) = prefixed_operand(ctx, units, index, operator, unit)?;
                index = next;
                tree = Some(insert_binary(ctx, left, operator, right));
            }
            UnitKind::GroupSeparator => {
                return Err(ParseError::new(
                    ParseErrorKind::MultipleExpressions,
                    unit.span.start,
                ));
            }
            _ => {
                if tree.is_some() {
                    return Err(ParseError::new(
                        ParseErrorKind::MultipleExpressions,
                        unit.span.start,
                    ));
                }
                tree = Some(unit.clone());
            }
        }
    }

    let mut tree = tree.ok_or_else(|| {
        ParseError::new(ParseErrorKind::MissingOperand(String::new()), ctx.stream.pos())
    })?;
    for (unit, operator) in prefixes.into_iter().rev() {
        tree = attach_unary(ctx, unit, operator, tree);
    }
    Ok(tree)
}

fn missing_operand(operator: Operator, at: &Unit) -> ParseError {
    ParseError::new(
        ParseErrorKind::MissingOperand(operator.symbol().to_string()),
        at.span.start,
    )
}

/// The operand right of a binary operator, with any prefix operators
fn prefixed_operand(
    ctx: &mut ParseContext,
    units: &[Unit],
    mut index: usize,
    operator: Operator,
    at: &Unit,
) -> Result<(Unit, usize), ParseError> {
    let mut prefixes: Vec<(&Unit, Operator)> = Vec::new();

    while let Some(unit) = units.get(index) {
        index += 1;
        match &unit.kind {
            UnitKind::Operator(prefix) if prefix.is_unary() => prefixes.push((unit, *prefix)),
            UnitKind::Operator(other) => return Err(missing_operand(*other, unit)),
            UnitKind::GroupSeparator => break,
            _ => {
                let mut operand = unit.clone();
                for (prefix_unit, prefix) in prefixes.into_iter().rev() {
                    operand = unary(ctx, prefix_unit, prefix, operand);
                }
                return Ok((operand, index));
            }
        }
    }

    Err(missing_operand(operator, at))
}

fn unary(ctx: &mut ParseContext, at: &Unit, operator: Operator, operand: Unit) -> Unit {
    let span = at.span.to(operand.span);
    ctx.unit(
        span,
        UnitKind::Unary(Unary {
            operator,
            operand: Box::new(operand),
        }),
    )
}

/// Apply a leading unary operator to the leftmost leaf of `operand`
///
/// Binary nodes on the way down widen their spans to cover the operator.
fn attach_unary(ctx: &mut ParseContext, at: &Unit, operator: Operator, operand: Unit) -> Unit {
    let mut spine: Vec<(UnitId, Span, Operator, Box<Unit>)> = Vec::new();
    let mut leaf = operand;
    loop {
        match leaf.kind {
            UnitKind::Binary(binary) => {
                spine.push((leaf.id, leaf.span, binary.operator, binary.right));
                leaf = *binary.left;
            }
            kind => {
                leaf.kind = kind;
                break;
            }
        }
    }

    let mut tree = unary(ctx, at, operator, leaf);
    for (id, span, binary_operator, right) in spine.into_iter().rev() {
        tree = Unit::new(
            id,
            at.span.to(span),
            UnitKind::Binary(Binary {
                operator: binary_operator,
                left: Box::new(tree),
                right,
            }),
        );
    }
    tree
}

fn insert_binary(ctx: &mut ParseContext, left: Unit, operator: Operator, right: Unit) -> Unit {
    let Unit { id, span, kind } = left;
    match kind {
        UnitKind::Binary(mut binary) if operator.precedence() > binary.operator.precedence() => {
            let inner = insert_binary(ctx, *binary.right, operator, right);
            let span = span.to(inner.span);
            binary.right = Box::new(inner);
            Unit::new(id, span, UnitKind::Binary(binary))
        }
        kind => {
            let left = Unit::new(id, span, kind);
            let span = left.span.to(right.span);
            ctx.unit(
                span,
                UnitKind::Binary(Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{LiteralValue, Operator, UnitKind};
    use crate::{ParseErrorKind, Parser, ParserOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fractions() {
        let parser = Parser::new(ParserOptions::default().with_fractions(true));
        let root = parser.parse("=1 1/2").root.unwrap();
        assert_eq!(root.as_number(), Some(1.5));
        assert_eq!(root.as_literal().unwrap().text.as_deref(), Some("1 1/2"));

        let root = parser.parse("=-2 1/4").root.unwrap();
        assert_eq!(root.as_number(), Some(-2.25));

        // Without the option it is a syntax error
        assert!(!Parser::default().parse("=1 1/2").valid);
    }

    #[test]
    fn test_fraction_inside_expression() {
        let parser = Parser::new(ParserOptions::default().with_fractions(true));
        let root = parser.parse("=2 * 3 3/4").root.unwrap();
        let UnitKind::Binary(binary) = &root.kind else {
            panic!("expected binary");
        };
        assert_eq!(binary.operator, Operator::Multiply);
        assert_eq!(binary.right.as_number(), Some(3.75));
    }

    #[test]
    fn test_dimensions() {
        let parser = Parser::new(ParserOptions::default().with_dimensioned(true));
        let result = parser.parse("=3 ft lbs + (2) m");
        assert!(result.valid, "{:?}", result.error);
        assert!(result.references.is_empty());

        let UnitKind::Binary(binary) = &result.root.unwrap().kind else {
            panic!("expected binary");
        };
        let UnitKind::Dimensioned(left) = &binary.left.kind else {
            panic!("expected dimensioned value");
        };
        assert_eq!(left.unit, "ft lbs");
        assert_eq!(left.value.as_number(), Some(3.0));
        assert!(matches!(binary.right.kind, UnitKind::Dimensioned(_)));
    }

    #[test]
    fn test_implicit_call() {
        let result = Parser::default().parse("=LAMBDA(x, x + 1)(2)");
        assert!(result.valid, "{:?}", result.error);
        let UnitKind::ImplicitCall(call) = &result.root.unwrap().kind else {
            panic!("expected implicit call");
        };
        assert!(matches!(call.callee.kind, UnitKind::Call(_)));
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(call.arguments[0].as_number(), Some(2.0));
    }

    #[test]
    fn test_failed_arrangement_keeps_units() {
        let result = Parser::default().parse("=1 2 3");
        assert!(!result.valid);
        let UnitKind::Group(group) = &result.root.unwrap().kind else {
            panic!("expected group");
        };
        assert!(!group.explicit);
        assert_eq!(group.elements.len(), 3);
        assert_eq!(
            group.elements[2].as_literal().unwrap().value,
            LiteralValue::Number(3.0)
        );
    }

    #[test]
    fn test_chained_prefix_operators() {
        let result = Parser::default().parse("=1 - -+2");
        assert!(result.valid, "{:?}", result.error);
        let UnitKind::Binary(binary) = &result.root.unwrap().kind else {
            panic!("expected binary");
        };
        let UnitKind::Unary(outer) = &binary.right.kind else {
            panic!("expected unary");
        };
        assert_eq!(outer.operator, Operator::Subtract);
        assert!(matches!(outer.operand.kind, UnitKind::Unary(_)));
    }

    #[test]
    fn test_leading_prefixes_apply_to_first_operand() {
        let root = Parser::default().parse("=--A1 * 2").root.unwrap();
        assert_eq!(root.to_string(), "--A1 * 2");
        let UnitKind::Binary(binary) = &root.kind else {
            panic!("expected binary");
        };
        assert_eq!(binary.operator, Operator::Multiply);
        let UnitKind::Unary(outer) = &binary.left.kind else {
            panic!("expected unary");
        };
        assert!(matches!(outer.operand.kind, UnitKind::Unary(_)));
        assert_eq!(root.span.start, 1);
    }

    #[test]
    fn test_operator_chains_are_bounded() {
        let parser = Parser::default();
        let limit = ParserOptions::default().max_depth * super::OPERATOR_NESTING;

        let result = parser.parse(&format!("={}1", "1+".repeat(200)));
        assert!(result.valid, "{:?}", result.error);

        for formula in [
            format!("={}1", "1+".repeat(3000)),
            format!("={}1", "- ".repeat(1000)),
            format!("=SUM({}1)", "-".repeat(5000)),
        ] {
            let result = parser.parse(&formula);
            assert_eq!(result.error.unwrap().kind, ParseErrorKind::TooDeep(limit));
            // The flat fallback renders without recursing per operator
            let root = result.root.unwrap();
            assert!(!root.to_string().is_empty());
        }
    }

    #[test]
    fn test_intersection_prefix() {
        let result = Parser::default().parse("=@A1:A10");
        assert!(result.valid);
        let UnitKind::Unary(unary) = &result.root.unwrap().kind else {
            panic!("expected unary");
        };
        assert_eq!(unary.operator, Operator::Intersect);
        assert!(unary.operand.as_range().is_some());

        assert!(!Parser::default().parse("=A1 @ B1").valid);
    }
}
