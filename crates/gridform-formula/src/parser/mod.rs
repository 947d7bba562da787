//! Formula parser
//!
//! Parsing runs in stages over one pass of the input:
//!
//! 1. the builder reads characters into a flat sequence of units, recursing
//!    for groups, calls and arrays;
//! 2. each flat sequence is arranged: range operands are bound, optional
//!    folds run, then operators are climbed into a tree by precedence;
//! 3. complex literals are composed over the finished tree.
//!
//! Errors never abort a parse. The first one is recorded and the builder
//! carries on so that callers still get a best-effort tree.

mod arrange;
mod complex;
mod context;
mod ranges;
mod resolve;

pub use context::{ParseResult, Reference, ReferenceKind};

use gridform_core::CellError;

use crate::ast::{
    ArrayLiteral, Call, Complex, Group, Literal, LiteralValue, Operator, Span, Unit, UnitKind,
};
use crate::error::ParseErrorKind;
use crate::lexer::{classify, BareToken, CharClass, NumberToken};
use crate::options::ParserOptions;
use context::ParseContext;

/// Parse a formula with default (en-US) options
///
/// # Example
/// ```rust
/// use gridform_formula::parse_formula;
///
/// let result = parse_formula("=SUM(A1:A10) * 2");
/// assert!(result.valid);
/// assert_eq!(result.root.unwrap().to_string(), "SUM(A1:A10) * 2");
/// ```
pub fn parse_formula(formula: &str) -> ParseResult {
    Parser::default().parse(formula)
}

/// Formula parser
///
/// Holds configuration only, so one parser can serve any number of calls.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse formula text, with or without a leading `=`
    pub fn parse(&self, formula: &str) -> ParseResult {
        log::trace!("parsing {formula:?}");
        let mut ctx = ParseContext::new(formula);

        ctx.stream.skip_whitespace();
        if ctx.stream.peek() == Some('=') {
            ctx.stream.advance();
        }

        let (units, _) = self.build_sequence(&mut ctx, &[]);
        debug_assert!(ctx.stream.is_at_end(), "top level stopped early");
        let root = if units.is_empty() {
            None
        } else {
            let tree = self.arrange(&mut ctx, units);
            Some(complex::compose(tree))
        };

        ctx.finish(root, self.options.locale.clone())
    }

    /// Read units until input ends or one of `exits` is consumed
    fn build_sequence(&self, ctx: &mut ParseContext, exits: &[char]) -> (Vec<Unit>, Option<char>) {
        let locale = &self.options.locale;
        let mut units: Vec<Unit> = Vec::new();

        loop {
            ctx.stream.skip_whitespace();
            let Some(c) = ctx.stream.peek() else {
                return (units, None);
            };
            if exits.contains(&c) {
                ctx.stream.advance();
                return (units, Some(c));
            }

            let start = ctx.stream.pos();
            // Signs bind to numbers only where no operand can precede them
            let naked = units
                .last()
                .map_or(true, |unit| matches!(unit.kind, UnitKind::GroupSeparator));

            if ctx.stream.at_number(locale.decimal_mark, naked) {
                let number = ctx.stream.scan_number(locale.decimal_mark, naked);
                units.push(number_unit(ctx, number));
            } else if c == locale.argument_separator {
                ctx.stream.advance();
                units.push(ctx.unit(Span::new(start, start + 1), UnitKind::GroupSeparator));
            } else {
                match classify(c) {
                    CharClass::DoubleQuote => match ctx.stream.scan_string() {
                        Ok((value, span)) => {
                            units.push(ctx.unit(span, UnitKind::Literal(Literal::string(value))));
                        }
                        Err((kind, position)) => ctx.fail(kind, position),
                    },
                    CharClass::OpenBrace => units.push(self.build_array(ctx)),
                    CharClass::OpenParen => units.push(self.build_group(ctx)),
                    CharClass::Letter
                    | CharClass::Dollar
                    | CharClass::Hash
                    | CharClass::SingleQuote
                    | CharClass::OpenBracket => {
                        if let Some(unit) = self.build_bare(ctx) {
                            units.push(unit);
                        }
                    }
                    CharClass::Operator => units.push(operator_unit(ctx)),
                    CharClass::Digit
                    | CharClass::CloseParen
                    | CharClass::CloseBracket
                    | CharClass::CloseBrace
                    | CharClass::Whitespace
                    | CharClass::Other => {
                        ctx.fail(ParseErrorKind::UnexpectedCharacter(c), start);
                        ctx.stream.advance();
                    }
                }
            }

            debug_assert!(ctx.stream.pos() > start, "no progress at {start}");
        }
    }

    /// Enter a nesting level, or give up on the rest of the input
    fn enter(&self, ctx: &mut ParseContext, position: usize) -> bool {
        if ctx.depth >= self.options.max_depth {
            ctx.fail(ParseErrorKind::TooDeep(self.options.max_depth), position);
            ctx.stream.seek_end();
            return false;
        }
        ctx.depth += 1;
        true
    }

    fn build_group(&self, ctx: &mut ParseContext) -> Unit {
        let start = ctx.stream.pos();
        ctx.stream.advance();

        let mut elements = Vec::new();
        if self.enter(ctx, start) {
            let (inner, exit) = self.build_sequence(ctx, &[')']);
            ctx.depth -= 1;
            if exit.is_none() {
                ctx.fail(ParseErrorKind::UnbalancedParenthesis, start);
            }
            elements = self.arrange_segments(ctx, inner);
        }

        let span = Span::new(start, ctx.stream.pos());
        ctx.unit(
            span,
            UnitKind::Group(Group {
                explicit: true,
                elements,
            }),
        )
    }

    /// Split a group's contents at separators and arrange each segment
    fn arrange_segments(&self, ctx: &mut ParseContext, units: Vec<Unit>) -> Vec<Unit> {
        if units.is_empty() {
            return Vec::new();
        }

        let mut segments = Vec::new();
        let mut current = Vec::new();
        for unit in units {
            if matches!(unit.kind, UnitKind::GroupSeparator) {
                let position = unit.span.start;
                let segment = std::mem::take(&mut current);
                segments.push(self.arrange_or_missing(ctx, segment, position));
            } else {
                current.push(unit);
            }
        }
        let position = ctx.stream.pos().saturating_sub(1);
        segments.push(self.arrange_or_missing(ctx, current, position));
        segments
    }

    fn arrange_or_missing(&self, ctx: &mut ParseContext, units: Vec<Unit>, position: usize) -> Unit {
        if units.is_empty() {
            ctx.unit(Span::new(position, position), UnitKind::Missing)
        } else {
            self.arrange(ctx, units)
        }
    }

    fn build_call(&self, ctx: &mut ParseContext, name: BareToken) -> Unit {
        let open = ctx.stream.pos();
        ctx.stream.advance();

        let mut arguments = Vec::new();
        if self.enter(ctx, open) {
            let separator = self.options.locale.argument_separator;
            let mut separated = false;
            loop {
                let (units, exit) = self.build_sequence(ctx, &[separator, ')']);
                let position = ctx.stream.pos().saturating_sub(1);
                match exit {
                    Some(')') => {
                        if !units.is_empty() || separated {
                            arguments.push(self.arrange_or_missing(ctx, units, position));
                        }
                        break;
                    }
                    Some(_) => {
                        arguments.push(self.arrange_or_missing(ctx, units, position));
                        separated = true;
                    }
                    None => {
                        ctx.fail(ParseErrorKind::UnbalancedParenthesis, open);
                        if !units.is_empty() {
                            arguments.push(self.arrange(ctx, units));
                        }
                        break;
                    }
                }
            }
            ctx.depth -= 1;
        }

        let span = Span::new(name.span.start, ctx.stream.pos());
        ctx.unit(
            span,
            UnitKind::Call(Call {
                name: name.text,
                arguments,
            }),
        )
    }

    /// `{1,2;3,4}`: rows split by `;`, columns by the locale's separator
    fn build_array(&self, ctx: &mut ParseContext) -> Unit {
        let start = ctx.stream.pos();
        ctx.stream.advance();

        let locale = &self.options.locale;
        let mut rows: Vec<Vec<Literal>> = vec![Vec::new()];
        let mut row_breaks: Vec<usize> = Vec::new();
        let mut closed = false;

        loop {
            ctx.stream.skip_whitespace();
            let Some(c) = ctx.stream.peek() else {
                break;
            };
            let at = ctx.stream.pos();

            if c == '}' {
                ctx.stream.advance();
                closed = true;
                break;
            }
            if c == ';' {
                ctx.stream.advance();
                row_breaks.push(at);
                rows.push(Vec::new());
                continue;
            }
            if c == locale.array_column_separator {
                ctx.stream.advance();
                continue;
            }

            if ctx.stream.at_number(locale.decimal_mark, true) {
                let number = ctx.stream.scan_number(locale.decimal_mark, true);
                if number.imaginary {
                    ctx.fail(ParseErrorKind::InvalidArrayValue(number.text), at);
                } else if let Some(row) = rows.last_mut() {
                    row.push(Literal {
                        value: LiteralValue::Number(number.value),
                        text: Some(number.text),
                    });
                }
                continue;
            }

            let literal = match classify(c) {
                CharClass::DoubleQuote => match ctx.stream.scan_string() {
                    Ok((value, _)) => Some(Literal::string(value)),
                    Err((kind, position)) => {
                        ctx.fail(kind, position);
                        None
                    }
                },
                CharClass::Letter | CharClass::Hash => match ctx.stream.scan_bare() {
                    Ok(token) => {
                        let literal = self.scalar_literal(&token.text);
                        if literal.is_none() {
                            ctx.fail(ParseErrorKind::InvalidArrayValue(token.text), at);
                        }
                        literal
                    }
                    Err((kind, position)) => {
                        ctx.fail(kind, position);
                        None
                    }
                },
                _ => {
                    ctx.fail(ParseErrorKind::InvalidArrayCharacter(c), at);
                    ctx.stream.advance();
                    None
                }
            };
            if let (Some(literal), Some(row)) = (literal, rows.last_mut()) {
                row.push(literal);
            }
        }

        if !closed {
            ctx.fail(ParseErrorKind::UnterminatedArray, start);
        }

        // `{}` is an empty array, but `{1;}` and `{;1}` have a row break with
        // nothing on one side
        if rows.len() > 1 {
            if let Some(empty) = rows.iter().position(Vec::is_empty) {
                if let Some(&at) = row_breaks.get(empty).or(row_breaks.last()) {
                    ctx.fail(ParseErrorKind::InvalidArrayCharacter(';'), at);
                }
            }
        }
        rows.retain(|row| !row.is_empty());
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.iter().any(|row| row.len() != width) {
            ctx.fail(ParseErrorKind::RaggedArray, start);
            for row in &mut rows {
                row.resize(width, Literal::error(CellError::Na));
            }
        }

        let span = Span::new(start, ctx.stream.pos());
        ctx.unit(span, UnitKind::Array(ArrayLiteral::from_rows(rows)))
    }

    /// Booleans and error literals allowed inside arrays
    fn scalar_literal(&self, text: &str) -> Option<Literal> {
        if let Some(value) = self.options.locale.boolean(text) {
            return Some(Literal::boolean(value));
        }
        CellError::parse(text).map(Literal::error)
    }

    /// A name, reference, literal keyword, or the head of a call
    fn build_bare(&self, ctx: &mut ParseContext) -> Option<Unit> {
        let token = match ctx.stream.scan_bare() {
            Ok(token) => token,
            Err((kind, position)) => {
                ctx.fail(kind, position);
                return None;
            }
        };

        if ctx.stream.peek() == Some('(') && !token.text.starts_with('#') {
            return Some(self.build_call(ctx, token));
        }
        Some(self.resolve_bare(ctx, token))
    }
}

fn number_unit(ctx: &mut ParseContext, number: NumberToken) -> Unit {
    let kind = if number.imaginary {
        UnitKind::Complex(Complex {
            real: 0.0,
            imaginary: number.value,
            composited: false,
            text: Some(number.text),
        })
    } else {
        UnitKind::Literal(Literal {
            value: LiteralValue::Number(number.value),
            text: Some(number.text),
        })
    };
    ctx.unit(number.span, kind)
}

fn operator_unit(ctx: &mut ParseContext) -> Unit {
    let start = ctx.stream.pos();
    let c = ctx.stream.peek();
    let next = ctx.stream.peek_at(1);
    ctx.stream.advance();

    let operator = match (c, next) {
        (Some('<'), Some('=')) => Operator::LessEqual,
        (Some('<'), Some('>')) => Operator::NotEqual,
        (Some('>'), Some('=')) => Operator::GreaterEqual,
        (Some('<'), _) => Operator::LessThan,
        (Some('>'), _) => Operator::GreaterThan,
        (Some('+'), _) => Operator::Add,
        (Some('-'), _) => Operator::Subtract,
        (Some('*'), _) => Operator::Multiply,
        (Some('/'), _) => Operator::Divide,
        (Some('^'), _) => Operator::Power,
        (Some('&'), _) => Operator::Concat,
        (Some(':'), _) => Operator::Range,
        (Some('@'), _) => Operator::Intersect,
        _ => Operator::Equal,
    };
    if operator.symbol().len() == 2 {
        ctx.stream.advance();
    }

    ctx.unit(Span::new(start, ctx.stream.pos()), UnitKind::Operator(operator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Binary, Unary, UNBOUNDED};
    use pretty_assertions::assert_eq;

    fn root(formula: &str) -> Unit {
        let result = parse_formula(formula);
        assert!(result.valid, "{formula}: {:?}", result.error);
        result.root.unwrap()
    }

    fn binary(unit: &Unit) -> &Binary {
        match &unit.kind {
            UnitKind::Binary(binary) => binary,
            other => panic!("expected binary, got {other:?}"),
        }
    }

    fn unary(unit: &Unit) -> &Unary {
        match &unit.kind {
            UnitKind::Unary(unary) => unary,
            other => panic!("expected unary, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(root("=42").as_number(), Some(42.0));
        assert_eq!(root("2.75").as_number(), Some(2.75));
        assert_eq!(root("  =  7 ").as_number(), Some(7.0));
    }

    #[test]
    fn test_empty_formula() {
        let result = parse_formula("=");
        assert!(result.valid);
        assert!(result.root.is_none());
        assert!(parse_formula("").root.is_none());
    }

    #[test]
    fn test_precedence() {
        let tree = root("=1+2*3");
        let add = binary(&tree);
        assert_eq!(add.operator, Operator::Add);
        assert_eq!(binary(&add.right).operator, Operator::Multiply);

        let tree = root("=1*2+3");
        let add = binary(&tree);
        assert_eq!(add.operator, Operator::Add);
        assert_eq!(binary(&add.left).operator, Operator::Multiply);

        let tree = root("=1=2&3");
        assert_eq!(binary(&tree).operator, Operator::Equal);
    }

    #[test]
    fn test_left_associativity() {
        let tree = root("=10-4-3");
        let outer = binary(&tree);
        assert_eq!(outer.right.as_number(), Some(3.0));
        assert_eq!(binary(&outer.left).left.as_number(), Some(10.0));
    }

    #[test]
    fn test_unary_after_binary_operator() {
        let tree = root("=2 + -3");
        let add = binary(&tree);
        let negation = unary(&add.right);
        assert_eq!(negation.operator, Operator::Subtract);
        assert_eq!(negation.operand.as_number(), Some(3.0));
    }

    #[test]
    fn test_leading_sign_is_part_of_the_number() {
        assert_eq!(root("=-5").as_number(), Some(-5.0));
        let tree = root("=-A1");
        assert_eq!(unary(&tree).operator, Operator::Subtract);
    }

    #[test]
    fn test_leading_unary_binds_tightest() {
        let tree = root("=-A1^2");
        let power = binary(&tree);
        assert_eq!(power.operator, Operator::Power);
        assert_eq!(unary(&power.left).operator, Operator::Subtract);
    }

    #[test]
    fn test_spans_index_source_text() {
        let tree = root("=SUM(1, 2) + B3");
        assert_eq!(tree.span, Span::new(1, 15));
        let add = binary(&tree);
        assert_eq!(add.left.span, Span::new(1, 10));
        assert_eq!(add.right.span, Span::new(13, 15));
    }

    #[test]
    fn test_unit_ids_are_unique() {
        let tree = root("=IF(A1>0, SUM(B1:B3), -C1)");
        let mut ids = Vec::new();
        crate::walk(&tree, |unit| {
            ids.push(unit.id);
            true
        });
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn test_call_arguments() {
        let tree = root("=IF(A1 > 0, \"yes\", )");
        let UnitKind::Call(call) = &tree.kind else {
            panic!("expected call");
        };
        assert_eq!(call.name, "IF");
        assert_eq!(call.arguments.len(), 3);
        assert_eq!(call.arguments[2].kind, UnitKind::Missing);

        let tree = root("=NOW()");
        let UnitKind::Call(call) = &tree.kind else {
            panic!("expected call");
        };
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_group_elements() {
        let tree = root("=(1, 2)");
        let UnitKind::Group(group) = &tree.kind else {
            panic!("expected group");
        };
        assert!(group.explicit);
        assert_eq!(group.elements.len(), 2);
    }

    #[test]
    fn test_array_literal() {
        let tree = root("={1, 2; 3, 4}");
        let UnitKind::Array(array) = &tree.kind else {
            panic!("expected array");
        };
        assert_eq!(array.width(), 2);
        assert_eq!(array.height(), 2);
        assert_eq!(array.columns[1][1].value, LiteralValue::Number(4.0));

        let tree = root("={\"a\", TRUE; #N/A, -1}");
        let UnitKind::Array(array) = &tree.kind else {
            panic!("expected array");
        };
        assert_eq!(array.columns[0][1], Literal::error(CellError::Na));
        assert_eq!(array.columns[1][0], Literal::boolean(true));
    }

    #[test]
    fn test_array_errors() {
        let result = parse_formula("={1,2;3}");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::RaggedArray);

        let result = parse_formula("={1,A1}");
        assert_eq!(
            result.error.unwrap().kind,
            ParseErrorKind::InvalidArrayValue("A1".into())
        );

        let result = parse_formula("={1,(2)}");
        assert_eq!(
            result.error.unwrap().kind,
            ParseErrorKind::InvalidArrayCharacter('(')
        );

        let result = parse_formula("={1,2");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::UnterminatedArray);
    }

    #[test]
    fn test_array_empty_rows() {
        for (formula, position) in [("={1;}", 3), ("={;1}", 2), ("={1;;2}", 4), ("={1, 2; }", 6)] {
            let result = parse_formula(formula);
            let error = result.error.unwrap();
            assert_eq!(error.kind, ParseErrorKind::InvalidArrayCharacter(';'), "{formula}");
            assert_eq!(error.position, position, "{formula}");

            // The rows that were there are kept
            let UnitKind::Array(array) = &result.root.unwrap().kind else {
                panic!("expected array");
            };
            assert!(array.height() >= 1);
        }
        assert!(parse_formula("={}").valid);
    }

    #[test]
    fn test_error_literal() {
        let tree = root("=#DIV/0!");
        assert_eq!(tree.as_literal(), Some(&Literal::error(CellError::Div0)));
    }

    #[test]
    fn test_unbalanced_input_is_reported() {
        let result = parse_formula("=SUM(1, 2");
        assert!(!result.valid);
        assert_eq!(
            result.error_message().unwrap(),
            "Unexpected end of formula, missing ')'"
        );
        assert_eq!(result.error_position(), Some(4));
        assert!(result.root.is_some());

        let result = parse_formula("=(1 + 2");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::UnbalancedParenthesis);

        let result = parse_formula("=\"abc");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::UnbalancedQuote);
    }

    #[test]
    fn test_stray_characters() {
        let result = parse_formula("=1 + 2)");
        assert_eq!(
            result.error.unwrap().kind,
            ParseErrorKind::UnexpectedCharacter(')')
        );

        let result = parse_formula("=1 2");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::MultipleExpressions);

        let result = parse_formula("=1 +");
        assert!(matches!(
            result.error.unwrap().kind,
            ParseErrorKind::MissingOperand(_)
        ));
    }

    #[test]
    fn test_first_error_wins() {
        let result = parse_formula("=1 + ) + ]");
        let error = result.error.unwrap();
        assert_eq!(error.kind, ParseErrorKind::UnexpectedCharacter(')'));
        assert_eq!(error.position, 5);
    }

    #[test]
    fn test_depth_limit() {
        let parser = Parser::new(ParserOptions {
            max_depth: 3,
            ..ParserOptions::default()
        });
        assert!(parser.parse("=((1))").valid);

        let result = parser.parse("=((((1))))");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::TooDeep(3));
    }

    #[test]
    fn test_european_locale() {
        let parser = Parser::new(
            ParserOptions::default().with_locale(crate::Locale::european()),
        );
        let result = parser.parse("=foo(1,5; 2)");
        assert!(result.valid, "{:?}", result.error);
        let UnitKind::Call(call) = &result.root.unwrap().kind else {
            panic!("expected call");
        };
        assert_eq!(call.arguments[0].as_number(), Some(1.5));
        assert_eq!(call.arguments[1].as_number(), Some(2.0));
    }

    #[test]
    fn test_whole_row_range_after_leading_minus() {
        let tree = root("=-14:15");
        let negation = unary(&tree);
        let range = negation.operand.as_range().unwrap();
        assert_eq!(range.start.row, 13);
        assert_eq!(range.start.column, UNBOUNDED);
        assert_eq!(range.end.row, 14);
    }

    #[test]
    fn test_parser_is_reusable() {
        let parser = Parser::default();
        let first = parser.parse("=A1+B2");
        let second = parser.parse("=C3");
        assert_eq!(first.addresses.len(), 2);
        assert_eq!(second.addresses.len(), 1);
        assert_eq!(second.root.unwrap().id, 0);
    }
}
