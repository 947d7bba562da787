//! Rendering a tree back to formula text
//!
//! Output is canonical rather than a copy of the input: binary operators get
//! single spaces (except `:`), argument lists get `", "`, and numbers keep
//! their source spelling. Locale, copy/paste offsets and R1C1 output are
//! controlled by [`RenderOptions`].

use std::borrow::Cow;
use std::fmt;

use gridform_core::{quote_sheet_name, sheet_names_eq, CellAddress, CellError, MAX_COLS, MAX_ROWS};

use crate::ast::{
    Address, ArrayLiteral, Complex, Literal, LiteralValue, Operator, Range, StructuredReference,
    StructuredScope, Unit, UnitKind, UNBOUNDED,
};
use crate::options::RenderOptions;

/// Render a tree as formula text, without a leading `=`
///
/// ```rust
/// use gridform_formula::{parse_formula, render, Locale, RenderOptions};
///
/// let root = parse_formula("=foo(bar(\"1\"),2.5)").root.unwrap();
/// let options = RenderOptions::for_locale(Locale::european());
/// assert_eq!(render(&root, &options), "foo(bar(\"1\"); 2,5)");
/// ```
pub fn render(unit: &Unit, options: &RenderOptions) -> String {
    let mut out = String::new();
    write_unit(&mut out, unit, options);
    out
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self, &RenderOptions::default()))
    }
}

fn write_unit(out: &mut String, unit: &Unit, options: &RenderOptions) {
    match &unit.kind {
        UnitKind::Literal(literal) => out.push_str(&literal_text(literal, options)),
        UnitKind::Complex(complex) => out.push_str(&complex_text(complex, options)),
        UnitKind::Array(array) => write_array(out, array, options),
        UnitKind::Missing => out.push_str(&options.missing),
        UnitKind::Identifier(name) => out.push_str(name),
        UnitKind::Address(address) => out.push_str(&address_text(address, options)),
        UnitKind::Range(range) => out.push_str(&range_text(range, options)),
        UnitKind::StructuredReference(reference) => {
            out.push_str(&structured_text(reference, options));
        }
        UnitKind::Group(group) => {
            if group.explicit {
                out.push('(');
                write_list(out, &group.elements, options);
                out.push(')');
            } else {
                for (i, element) in group.elements.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    write_unit(out, element, options);
                }
            }
        }
        UnitKind::Binary(binary) => {
            write_unit(out, &binary.left, options);
            if binary.operator == Operator::Range {
                out.push(':');
            } else {
                out.push(' ');
                out.push_str(binary.operator.symbol());
                out.push(' ');
            }
            write_unit(out, &binary.right, options);
        }
        UnitKind::Unary(unary) => {
            out.push_str(unary.operator.symbol());
            write_unit(out, &unary.operand, options);
        }
        UnitKind::Call(call) => {
            out.push_str(&call.name);
            out.push('(');
            write_list(out, &call.arguments, options);
            out.push(')');
        }
        UnitKind::ImplicitCall(call) => {
            write_unit(out, &call.callee, options);
            out.push('(');
            write_list(out, &call.arguments, options);
            out.push(')');
        }
        UnitKind::Dimensioned(dimensioned) => {
            write_unit(out, &dimensioned.value, options);
            out.push(' ');
            out.push_str(&dimensioned.unit);
        }
        UnitKind::Operator(operator) => out.push_str(operator.symbol()),
        UnitKind::GroupSeparator => out.push(options.locale.argument_separator),
    }
}

fn write_list(out: &mut String, units: &[Unit], options: &RenderOptions) {
    for (i, unit) in units.iter().enumerate() {
        if i > 0 {
            out.push(options.locale.argument_separator);
            out.push(' ');
        }
        write_unit(out, unit, options);
    }
}

fn write_array(out: &mut String, array: &ArrayLiteral, options: &RenderOptions) {
    out.push('{');
    for (r, row) in array.rows().into_iter().enumerate() {
        if r > 0 {
            out.push(';');
        }
        for (c, literal) in row.into_iter().enumerate() {
            if c > 0 {
                out.push(options.locale.array_column_separator);
            }
            out.push_str(&literal_text(literal, options));
        }
    }
    out.push('}');
}

/// Integers without a fraction, everything else as Rust formats it
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn localize(text: &str, decimal_mark: char) -> Cow<'_, str> {
    if decimal_mark == '.' {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.replace('.', &decimal_mark.to_string()))
    }
}

fn literal_text(literal: &Literal, options: &RenderOptions) -> String {
    let locale = &options.locale;
    match &literal.value {
        LiteralValue::Number(value) => match &literal.text {
            Some(text) => localize(text, locale.decimal_mark).into_owned(),
            None => localize(&format_number(*value), locale.decimal_mark).into_owned(),
        },
        LiteralValue::String(value) => format!("\"{}\"", value.replace('"', "\"\"")),
        LiteralValue::Boolean(value) => locale.boolean_name(*value).to_string(),
        LiteralValue::Error(error) => error.as_str().to_string(),
    }
}

fn complex_text(complex: &Complex, options: &RenderOptions) -> String {
    let text = match &complex.text {
        Some(text) => text.clone(),
        None if complex.composited || complex.real != 0.0 => {
            let sign = if complex.imaginary < 0.0 { '-' } else { '+' };
            format!(
                "{} {sign} {}i",
                format_number(complex.real),
                format_number(complex.imaginary.abs())
            )
        }
        None => format!("{}i", format_number(complex.imaginary)),
    };
    localize(&text, options.locale.decimal_mark).into_owned()
}

fn ref_error() -> String {
    CellError::Ref.as_str().to_string()
}

/// Text of a single address, sheet prefix included
pub(crate) fn address_text(address: &Address, options: &RenderOptions) -> String {
    match coordinate_text(address, options) {
        Some(coordinates) => match &address.sheet {
            Some(sheet) => format!("{}!{coordinates}", quote_sheet_name(sheet)),
            None => coordinates,
        },
        None => ref_error(),
    }
}

/// Coordinates of an address, or `None` when it renders as `#REF!`
fn coordinate_text(address: &Address, options: &RenderOptions) -> Option<String> {
    if address.is_invalid() || (address.row == UNBOUNDED && address.column == UNBOUNDED) {
        return None;
    }

    let row = shifted(
        address.row,
        address.absolute_row || address.offset_row,
        options.row_offset,
        i64::from(MAX_ROWS),
    )?;
    let column = shifted(
        address.column,
        address.absolute_column || address.offset_column,
        options.column_offset,
        i64::from(MAX_COLS),
    )?;

    if options.r1c1 {
        return Some(r1c1_text(address, row, column, options.base));
    }

    // Relative R1C1 offsets need a base cell to become A1 coordinates
    let (row, column) = match (address.offset_row || address.offset_column, options.base) {
        (false, _) => (row, column),
        (true, Some(base)) => (
            if address.offset_row { row.checked_add(base.row.into())? } else { row },
            if address.offset_column { column.checked_add(base.col.into())? } else { column },
        ),
        (true, None) => return Some(r1c1_text(address, row, column, None)),
    };
    if !in_bounds(row, MAX_ROWS.into()) || !in_bounds(column, MAX_COLS.into()) {
        return None;
    }

    let mut text = String::new();
    if column != UNBOUNDED {
        if address.absolute_column {
            text.push('$');
        }
        text.push_str(&CellAddress::column_to_letters(column as u32));
    }
    if row != UNBOUNDED {
        if address.absolute_row {
            text.push('$');
        }
        text.push_str(&(row + 1).to_string());
    }
    if address.spill {
        text.push('#');
    }
    Some(text)
}

fn in_bounds(value: i64, limit: i64) -> bool {
    value == UNBOUNDED || (0..limit).contains(&value)
}

/// Apply a copy/paste offset to a relative coordinate
fn shifted(value: i64, fixed: bool, offset: i64, limit: i64) -> Option<i64> {
    if value == UNBOUNDED || fixed {
        return Some(value);
    }
    let value = value.checked_add(offset)?;
    in_bounds(value, limit).then_some(value)
}

fn r1c1_text(address: &Address, row: i64, column: i64, base: Option<CellAddress>) -> String {
    let mut text = String::new();
    if row != UNBOUNDED {
        text.push('R');
        text.push_str(&r1c1_part(
            row,
            address.absolute_row,
            address.offset_row,
            base.map(|b| i64::from(b.row)),
        ));
    }
    if column != UNBOUNDED {
        text.push('C');
        text.push_str(&r1c1_part(
            column,
            address.absolute_column,
            address.offset_column,
            base.map(|b| i64::from(b.col)),
        ));
    }
    if address.spill {
        text.push('#');
    }
    text
}

fn r1c1_part(value: i64, absolute: bool, offset: bool, base: Option<i64>) -> String {
    let relative = if offset {
        Some(value)
    } else if absolute {
        None
    } else {
        base.map(|base| value - base)
    };
    match relative {
        Some(0) => String::new(),
        Some(delta) => format!("[{delta}]"),
        None => (value + 1).to_string(),
    }
}

fn range_text(range: &Range, options: &RenderOptions) -> String {
    let (Some(start), Some(end)) = (
        coordinate_text(&range.start, options),
        coordinate_text(&range.end, options),
    ) else {
        return ref_error();
    };

    let mut text = String::new();
    if let Some(sheet) = &range.start.sheet {
        text.push_str(&quote_sheet_name(sheet));
        text.push('!');
    }
    text.push_str(&start);
    text.push(':');
    match (&range.start.sheet, &range.end.sheet) {
        (Some(first), Some(second)) if !sheet_names_eq(first, second) => {
            text.push_str(&quote_sheet_name(second));
            text.push('!');
        }
        (None, Some(second)) => {
            text.push_str(&quote_sheet_name(second));
            text.push('!');
        }
        _ => {}
    }
    text.push_str(&end);
    text
}

fn structured_text(reference: &StructuredReference, options: &RenderOptions) -> String {
    let table = reference
        .table
        .as_deref()
        .or(options.implied_table.as_deref())
        .unwrap_or("");
    let column = &reference.column;
    match reference.scope {
        StructuredScope::Column => format!("{table}[{column}]"),
        StructuredScope::All => format!("{table}[[#All],[{column}]]"),
        StructuredScope::Row if options.verbose_structured_references => {
            format!("{table}[[#This Row],[{column}]]")
        }
        StructuredScope::Row => {
            if column.chars().all(|c| c.is_alphanumeric() || c == '_') {
                format!("{table}[@{column}]")
            } else {
                format!("{table}[@[{column}]]")
            }
        }
    }
}
