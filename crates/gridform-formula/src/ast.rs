//! Formula expression tree
//!
//! A parsed formula is a tree of [`Unit`]s. Every unit carries an id that is
//! unique within one parse and the character span it was read from.

use gridform_core::CellError;

/// Identifier of a unit, unique within one parse invocation
pub type UnitId = u32;

/// Coordinate value meaning "the whole row" or "the whole column"
pub const UNBOUNDED: i64 = i64::MAX;

/// Coordinate value of a reference that no longer points anywhere
pub const INVALID: i64 = i64::MIN;

/// Character span in the formula text, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// One node of the expression tree
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    pub id: UnitId,
    pub span: Span,
    pub kind: UnitKind,
}

impl Unit {
    pub fn new(id: UnitId, span: Span, kind: UnitKind) -> Self {
        Self { id, span, kind }
    }

    /// Same id and span, different payload
    pub(crate) fn with_kind(&self, kind: UnitKind) -> Self {
        Self {
            id: self.id,
            span: self.span,
            kind,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            UnitKind::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match &self.kind {
            UnitKind::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&Range> {
        match &self.kind {
            UnitKind::Range(range) => Some(range),
            _ => None,
        }
    }

    /// Numeric value of a number literal
    pub fn as_number(&self) -> Option<f64> {
        match self.as_literal()?.value {
            LiteralValue::Number(n) => Some(n),
            _ => None,
        }
    }
}

/// The tagged payload of a [`Unit`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitKind {
    // === Values ===
    Literal(Literal),
    Complex(Complex),
    Array(ArrayLiteral),
    /// Placeholder for an omitted call argument
    Missing,

    // === Names and references ===
    Identifier(String),
    Address(Address),
    Range(Range),
    StructuredReference(StructuredReference),

    // === Structure ===
    Group(Group),
    Binary(Binary),
    Unary(Unary),
    Call(Call),
    ImplicitCall(ImplicitCall),
    Dimensioned(Dimensioned),

    // === Transient, consumed while arranging ===
    Operator(Operator),
    GroupSeparator,
}

/// A scalar literal
///
/// `text` keeps the source spelling of numbers (with `.` as decimal mark) so
/// rendering does not reformat them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Literal {
    pub value: LiteralValue,
    pub text: Option<String>,
}

impl Literal {
    pub fn number(value: f64) -> Self {
        Self {
            value: LiteralValue::Number(value),
            text: None,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: LiteralValue::String(value.into()),
            text: None,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            value: LiteralValue::Boolean(value),
            text: None,
        }
    }

    pub fn error(value: CellError) -> Self {
        Self {
            value: LiteralValue::Error(value),
            text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
}

/// A complex number literal
///
/// A lone `3i` is a non-composited complex with zero real part; `2 + 3i`
/// composes into one composited literal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Complex {
    pub real: f64,
    pub imaginary: f64,
    pub composited: bool,
    pub text: Option<String>,
}

/// A brace-delimited array of scalar literals, stored column-major
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayLiteral {
    pub columns: Vec<Vec<Literal>>,
}

impl ArrayLiteral {
    /// Build from row-major data; rows must all have the same length
    pub fn from_rows(rows: Vec<Vec<Literal>>) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let mut columns: Vec<Vec<Literal>> = (0..width).map(|_| Vec::new()).collect();
        for row in rows {
            for (column, literal) in columns.iter_mut().zip(row) {
                column.push(literal);
            }
        }
        Self { columns }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Row-major view, the order the literal is written in
    pub fn rows(&self) -> Vec<Vec<&Literal>> {
        (0..self.height())
            .map(|r| self.columns.iter().map(|column| &column[r]).collect())
            .collect()
    }
}

/// Ordered children; `explicit` when the user wrote the parentheses
///
/// Each element is one separator-delimited segment. A non-explicit group is
/// what a failed arrangement hands back.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub explicit: bool,
    pub elements: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Binary {
    pub operator: Operator,
    pub left: Box<Unit>,
    pub right: Box<Unit>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unary {
    pub operator: Operator,
    pub operand: Box<Unit>,
}

/// A named function applied to arguments
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Call {
    pub name: String,
    pub arguments: Vec<Unit>,
}

/// A callable expression applied to arguments, e.g. `LAMBDA(x, x * 2)(4)`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImplicitCall {
    pub callee: Box<Unit>,
    pub arguments: Vec<Unit>,
}

/// A value with a unit of measure, e.g. `3 ft lbs`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensioned {
    pub value: Box<Unit>,
    pub unit: String,
}

/// A cell reference
///
/// `row`/`column` are 0-based. When an offset flag is set the coordinate is
/// an R1C1 relative offset instead. [`UNBOUNDED`] marks whole rows/columns
/// and [`INVALID`] marks a reference broken by a structural edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    pub sheet: Option<String>,
    /// Resolved sheet id, filled in by callers that know the document
    pub sheet_id: Option<usize>,
    pub row: i64,
    pub column: i64,
    pub absolute_row: bool,
    pub absolute_column: bool,
    pub spill: bool,
    pub offset_row: bool,
    pub offset_column: bool,
}

impl Address {
    /// Relative address at 0-based coordinates
    pub fn new(row: i64, column: i64) -> Self {
        Self {
            sheet: None,
            sheet_id: None,
            row,
            column,
            absolute_row: false,
            absolute_column: false,
            spill: false,
            offset_row: false,
            offset_column: false,
        }
    }

    pub fn on_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn is_invalid(&self) -> bool {
        self.row == INVALID && self.column == INVALID
    }

    pub fn invalidate(&mut self) {
        self.row = INVALID;
        self.column = INVALID;
        self.offset_row = false;
        self.offset_column = false;
    }

    /// Whole-row reference (`5` in `5:10`)
    pub fn is_whole_row(&self) -> bool {
        self.column == UNBOUNDED && self.row != UNBOUNDED
    }

    /// Whole-column reference (`A` in `A:F`)
    pub fn is_whole_column(&self) -> bool {
        self.row == UNBOUNDED && self.column != UNBOUNDED
    }

    /// Canonical label: uppercased, sheet-qualified when a sheet is present
    pub fn label(&self) -> String {
        crate::render::address_text(self, &crate::RenderOptions::default()).to_uppercase()
    }
}

/// Two corners joined by `:`; `label` is the source text of the range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub start: Address,
    pub end: Address,
    pub label: String,
}

impl Range {
    /// Sheet of the range (the end corner inherits the start's sheet)
    pub fn sheet(&self) -> Option<&str> {
        self.start.sheet.as_deref()
    }

    pub fn is_invalid(&self) -> bool {
        self.start.is_invalid() || self.end.is_invalid()
    }
}

/// Which rows of a table column a structured reference covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructuredScope {
    /// `Table[@Column]` / `Table[[#This Row],[Column]]`
    Row,
    /// `Table[Column]`
    Column,
    /// `Table[[#All],[Column]]`
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructuredReference {
    /// `None` for `[@Column]` inside a table
    pub table: Option<String>,
    pub column: String,
    pub scope: StructuredScope,
}

/// Formula operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Additive and text
    Add,
    Subtract,
    Concat,

    // Multiplicative
    Multiply,
    Divide,

    Power,
    Range,

    /// `@`, implicit intersection (prefix only)
    Intersect,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::LessEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterEqual => ">=",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Concat => "&",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Power => "^",
            Operator::Range => ":",
            Operator::Intersect => "@",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => Operator::Equal,
            "<>" => Operator::NotEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterEqual,
            "+" => Operator::Add,
            "-" => Operator::Subtract,
            "&" => Operator::Concat,
            "*" => Operator::Multiply,
            "/" => Operator::Divide,
            "^" => Operator::Power,
            ":" => Operator::Range,
            "@" => Operator::Intersect,
            _ => return None,
        })
    }

    /// Binding strength as a binary operator, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Equal
            | Operator::NotEqual
            | Operator::LessThan
            | Operator::LessEqual
            | Operator::GreaterThan
            | Operator::GreaterEqual => 1,
            Operator::Add | Operator::Subtract | Operator::Concat => 2,
            Operator::Multiply | Operator::Divide => 3,
            Operator::Power => 4,
            Operator::Range => 5,
            Operator::Intersect => 6,
        }
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Add | Operator::Subtract | Operator::Intersect)
    }

    pub fn is_binary(&self) -> bool {
        !matches!(self, Operator::Intersect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_table() {
        assert!(Operator::Range.precedence() > Operator::Power.precedence());
        assert!(Operator::Power.precedence() > Operator::Multiply.precedence());
        assert!(Operator::Multiply.precedence() > Operator::Add.precedence());
        assert_eq!(Operator::Add.precedence(), Operator::Concat.precedence());
        assert!(Operator::Add.precedence() > Operator::LessEqual.precedence());
        assert_eq!(Operator::from_symbol("<>"), Some(Operator::NotEqual));
        assert!(!Operator::Intersect.is_binary());
    }

    #[test]
    fn test_array_is_column_major() {
        let array = ArrayLiteral::from_rows(vec![
            vec![Literal::number(1.0), Literal::number(2.0)],
            vec![Literal::number(3.0), Literal::number(4.0)],
        ]);
        assert_eq!(array.width(), 2);
        assert_eq!(array.height(), 2);
        assert_eq!(array.columns[0], vec![Literal::number(1.0), Literal::number(3.0)]);
        assert_eq!(array.rows()[0], vec![&Literal::number(1.0), &Literal::number(2.0)]);
    }
}
