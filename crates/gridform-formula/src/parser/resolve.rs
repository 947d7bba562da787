//! Classification of bare tokens into literals, references and names

use gridform_core::{unquote_sheet_name, CellAddress, CellError, MAX_COLS, MAX_ROWS};
use lazy_regex::regex_captures;

use super::context::ParseContext;
use super::Parser;
use crate::ast::{
    Address, Literal, StructuredReference, StructuredScope, Unit, UnitKind, UNBOUNDED,
};
use crate::lexer::BareToken;

impl Parser {
    /// Turn a bare token into a unit, recording any reference it holds
    pub(super) fn resolve_bare(&self, ctx: &mut ParseContext, token: BareToken) -> Unit {
        let BareToken {
            text,
            span,
            bracketed,
        } = token;

        if text.starts_with('#') {
            let kind = match CellError::parse(&text) {
                Some(error) => UnitKind::Literal(Literal::error(error)),
                None => UnitKind::Identifier(text),
            };
            let unit = ctx.unit(span, kind);
            ctx.note(&unit);
            return unit;
        }

        let kind = if let Some(address) = parse_address(&text, self.options.r1c1) {
            UnitKind::Address(address)
        } else if let Some(reference) = bracketed
            .then(|| parse_structured_reference(&text))
            .flatten()
        {
            UnitKind::StructuredReference(reference)
        } else if let Some(value) = self.options.locale.boolean(&text) {
            UnitKind::Literal(Literal::boolean(value))
        } else {
            UnitKind::Identifier(text)
        };

        let unit = ctx.unit(span, kind);
        ctx.note(&unit);
        unit
    }
}

/// Split an optional sheet prefix off a reference
///
/// Returns `None` when the prefix is malformed.
fn split_sheet(text: &str) -> Option<(Option<String>, &str)> {
    if text.starts_with('\'') {
        let mut chars = text.char_indices().skip(1).peekable();
        let mut close = None;
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                } else {
                    close = Some(i);
                    break;
                }
            }
        }
        let close = close?;
        let sheet = unquote_sheet_name(&text[..=close])?;
        let rest = text[close + 1..].strip_prefix('!')?;
        return Some((Some(sheet), rest));
    }

    match text.rfind('!') {
        Some(i) => {
            let sheet = &text[..i];
            if sheet.is_empty() || sheet.contains(|c: char| matches!(c, '!' | '[' | ']')) {
                return None;
            }
            Some((Some(sheet.to_string()), &text[i + 1..]))
        }
        None => Some((None, text)),
    }
}

/// Parse a single-cell reference, A1 or R1C1 depending on `r1c1`
pub(crate) fn parse_address(text: &str, r1c1: bool) -> Option<Address> {
    let (sheet, rest) = split_sheet(text)?;
    let mut address = if r1c1 {
        parse_r1c1(rest)?
    } else {
        parse_a1(rest)?
    };
    address.sheet = sheet;
    Some(address)
}

fn parse_a1(text: &str) -> Option<Address> {
    let (_, column_dollar, letters, row_dollar, digits, spill) =
        regex_captures!(r"^(\$?)([A-Za-z]{1,3})(\$?)([0-9]{1,7})(#?)$", text)?;

    let column = CellAddress::letters_to_column(letters).ok()?;
    let row = CellAddress::parse_row_number(digits).ok()?;

    Some(Address {
        absolute_row: !row_dollar.is_empty(),
        absolute_column: !column_dollar.is_empty(),
        spill: !spill.is_empty(),
        ..Address::new(i64::from(row), i64::from(column))
    })
}

/// `R1C1`, `R[-1]C[2]`, `RC[3]`, `R2C`; a bare `R`/`C` part means offset 0
fn parse_r1c1(text: &str) -> Option<Address> {
    let (_, row_number, row_offset, column_number, column_offset, spill) = regex_captures!(
        r"^[Rr](?:([0-9]+)|\[([+-]?[0-9]+)\])?[Cc](?:([0-9]+)|\[([+-]?[0-9]+)\])?(#?)$",
        text
    )?;

    let mut address = Address::new(0, 0);
    address.spill = !spill.is_empty();

    if row_number.is_empty() {
        address.offset_row = true;
        address.row = parse_offset(row_offset, MAX_ROWS.into())?;
    } else {
        address.absolute_row = true;
        address.row = i64::from(CellAddress::parse_row_number(row_number).ok()?);
    }

    if column_number.is_empty() {
        address.offset_column = true;
        address.column = parse_offset(column_offset, MAX_COLS.into())?;
    } else {
        let column: i64 = column_number.parse().ok()?;
        if !(1..=i64::from(MAX_COLS)).contains(&column) {
            return None;
        }
        address.absolute_column = true;
        address.column = column - 1;
    }

    Some(address)
}

/// A bracketed offset; its magnitude must stay below the sheet size
fn parse_offset(text: &str, limit: i64) -> Option<i64> {
    if text.is_empty() {
        return Some(0);
    }
    let offset: i64 = text.parse().ok()?;
    (offset.abs() < limit).then_some(offset)
}

/// A whole-row (`5`, `$5`) or whole-column (`A`, `$A`) range corner
///
/// The unbounded coordinate is set to [`UNBOUNDED`].
pub(crate) fn parse_line(text: &str) -> Option<Address> {
    let (sheet, rest) = split_sheet(text)?;

    let mut address = if let Some((_, dollar, digits)) = regex_captures!(r"^(\$?)([0-9]{1,7})$", rest)
    {
        let row = CellAddress::parse_row_number(digits).ok()?;
        Address {
            absolute_row: !dollar.is_empty(),
            ..Address::new(i64::from(row), UNBOUNDED)
        }
    } else if let Some((_, dollar, letters)) = regex_captures!(r"^(\$?)([A-Za-z]{1,3})$", rest) {
        let column = CellAddress::letters_to_column(letters).ok()?;
        Address {
            absolute_column: !dollar.is_empty(),
            ..Address::new(UNBOUNDED, i64::from(column))
        }
    } else {
        return None;
    };

    address.sheet = sheet;
    Some(address)
}

/// `Table[Col]`, `Table[@Col]`, `Table[[#This Row],[Col]]`, `[@Col]`, ...
pub(crate) fn parse_structured_reference(text: &str) -> Option<StructuredReference> {
    let open = text.find('[')?;
    let table = &text[..open];
    if table.contains(|c: char| matches!(c, '!' | '\'' | '$')) {
        return None;
    }
    let inner = text[open..].strip_prefix('[')?.strip_suffix(']')?.trim();

    let (column, scope) = if let Some(rest) = inner.strip_prefix('@') {
        (strip_brackets(rest.trim()), StructuredScope::Row)
    } else if inner.starts_with('[') {
        match bracketed_parts(inner)?.as_slice() {
            [column] if !column.starts_with('#') => (*column, StructuredScope::Column),
            [specifier, column] => {
                let scope = match specifier.to_ascii_lowercase().as_str() {
                    "#this row" => StructuredScope::Row,
                    "#all" => StructuredScope::All,
                    "#data" => StructuredScope::Column,
                    _ => return None,
                };
                (*column, scope)
            }
            _ => return None,
        }
    } else {
        (inner, StructuredScope::Column)
    };

    if column.is_empty() || column.contains(|c: char| matches!(c, '[' | ']')) {
        return None;
    }

    Some(StructuredReference {
        table: (!table.is_empty()).then(|| table.to_string()),
        column: column.to_string(),
        scope,
    })
}

fn strip_brackets(text: &str) -> &str {
    text.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(text)
}

/// `[a],[b]` -> `["a", "b"]`
fn bracketed_parts(text: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut rest = text.trim();
    loop {
        let body = rest.strip_prefix('[')?;
        let close = body.find(']')?;
        parts.push(body[..close].trim());
        rest = body[close + 1..].trim_start();
        if rest.is_empty() {
            return Some(parts);
        }
        rest = rest.strip_prefix(',')?.trim_start();
    }
}
