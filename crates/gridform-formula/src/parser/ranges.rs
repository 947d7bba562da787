//! Binding of `x : y` windows into range units

use super::context::ParseContext;
use super::resolve::parse_line;
use super::Parser;
use crate::ast::{Literal, LiteralValue, Operator, Range, Span, Unit, UnitKind};

impl Parser {
    /// Replace every `corner : corner` window with a single range unit
    ///
    /// Windows whose operands are not valid corners are left alone and end up
    /// as a binary `:` in the tree.
    pub(super) fn bind_ranges(&self, ctx: &mut ParseContext, mut units: Vec<Unit>) -> Vec<Unit> {
        let mut i = 0;
        while i + 2 < units.len() {
            if matches!(units[i + 1].kind, UnitKind::Operator(Operator::Range)) {
                if let Some(bound) = bind(ctx, &units[i], &units[i + 2]) {
                    let width = bound.len();
                    units.splice(i..i + 3, bound);
                    i += width;
                    continue;
                }
            }
            i += 1;
        }
        units
    }
}

fn bind(ctx: &mut ParseContext, left: &Unit, right: &Unit) -> Option<Vec<Unit>> {
    if let (UnitKind::Address(start), UnitKind::Address(end)) = (&left.kind, &right.kind) {
        let span = left.span.to(right.span);
        ctx.release_address(start);
        ctx.release_address(end);
        let range = Range {
            start: start.clone(),
            end: end.clone(),
            label: ctx.stream.slice(span),
        };
        let unit = ctx.unit(span, UnitKind::Range(range));
        ctx.bind_range(left.id, right.id, &unit);
        return Some(vec![unit]);
    }

    // Whole rows (`5:10`) and whole columns (`A:C`)
    let (negated, start_text) = line_text(left)?;
    let (false, end_text) = line_text(right)? else {
        return None;
    };
    let start = parse_line(start_text)?;
    let end = parse_line(end_text)?;
    if start.is_whole_row() != end.is_whole_row() {
        return None;
    }

    // `-14:15` lexed the sign into the number; it negates the range
    let mut start_span = left.span;
    if negated {
        start_span.start += 1;
    }
    let span = start_span.to(right.span);
    let range = Range {
        start,
        end,
        label: ctx.stream.slice(span),
    };
    let unit = ctx.unit(span, UnitKind::Range(range));
    ctx.bind_range(left.id, right.id, &unit);

    if negated {
        let minus = ctx.unit(
            Span::new(left.span.start, left.span.start + 1),
            UnitKind::Operator(Operator::Subtract),
        );
        Some(vec![minus, unit])
    } else {
        Some(vec![unit])
    }
}

/// Text of a unit that could be a row or column corner, and whether a
/// leading minus was stripped from it
fn line_text(unit: &Unit) -> Option<(bool, &str)> {
    match &unit.kind {
        UnitKind::Identifier(name) => Some((false, name)),
        UnitKind::Literal(Literal {
            value: LiteralValue::Number(_),
            text: Some(text),
        }) => {
            let (negated, digits) = match text.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, text.as_str()),
            };
            (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .then_some((negated, digits))
        }
        _ => None,
    }
}
