//! Composition of complex literals over a finished tree

use crate::ast::{Binary, Complex, Literal, LiteralValue, Operator, Unary, Unit, UnitKind};
use crate::render::format_number;

/// Fold `2 + 3i`, `2 - 3i` and `-3i` into single complex literals, bottom-up
pub(crate) fn compose(unit: Unit) -> Unit {
    let Unit { id, span, kind } = unit.map_children(&mut compose);
    let kind = match kind {
        UnitKind::Unary(unary) => compose_unary(unary),
        UnitKind::Binary(binary) => compose_binary(binary),
        other => other,
    };
    Unit::new(id, span, kind)
}

fn compose_unary(unary: Unary) -> UnitKind {
    let Unary { operator, operand } = unary;
    let Unit { id, span, kind } = *operand;
    match (operator, kind) {
        (Operator::Add | Operator::Subtract, UnitKind::Complex(complex)) if !complex.composited => {
            let sign = if operator == Operator::Subtract { -1.0 } else { 1.0 };
            UnitKind::Complex(Complex {
                real: complex.real,
                imaginary: sign * complex.imaginary,
                composited: false,
                text: Some(format!("{}{}", operator.symbol(), imaginary_text(&complex))),
            })
        }
        (operator, kind) => UnitKind::Unary(Unary {
            operator,
            operand: Box::new(Unit::new(id, span, kind)),
        }),
    }
}

fn compose_binary(binary: Binary) -> UnitKind {
    if let (
        Operator::Add | Operator::Subtract,
        UnitKind::Literal(Literal {
            value: LiteralValue::Number(real),
            text,
        }),
        UnitKind::Complex(complex),
    ) = (binary.operator, &binary.left.kind, &binary.right.kind)
    {
        if !complex.composited {
            let sign = if binary.operator == Operator::Subtract { -1.0 } else { 1.0 };
            let real_text = text.clone().unwrap_or_else(|| format_number(*real));
            return UnitKind::Complex(Complex {
                real: *real + complex.real,
                imaginary: sign * complex.imaginary,
                composited: true,
                text: Some(format!(
                    "{real_text} {} {}",
                    binary.operator.symbol(),
                    imaginary_text(complex)
                )),
            });
        }
    }
    UnitKind::Binary(binary)
}

fn imaginary_text(complex: &Complex) -> String {
    complex
        .text
        .clone()
        .unwrap_or_else(|| format!("{}i", format_number(complex.imaginary)))
}
