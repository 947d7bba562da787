//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors surfaced by the `Result`-returning formula APIs
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// What went wrong while parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseErrorKind {
    /// A character that cannot start any token here
    #[error("Unexpected character '{0}'")]
    UnexpectedCharacter(char),

    /// Input ended inside a group or argument list
    #[error("Unexpected end of formula, missing ')'")]
    UnbalancedParenthesis,

    /// Quoted sheet name without its closing quote
    #[error("Unbalanced single quote in sheet name")]
    UnbalancedQuote,

    /// Structured reference or R1C1 token without its closing bracket
    #[error("Unbalanced bracket")]
    UnbalancedBracket,

    /// Array literal without its closing brace
    #[error("Unterminated array literal")]
    UnterminatedArray,

    /// Character that cannot appear inside an array literal
    #[error("Invalid character '{0}' in array literal")]
    InvalidArrayCharacter(char),

    /// Non-scalar value inside an array literal
    #[error("Invalid value '{0}' in array literal")]
    InvalidArrayValue(String),

    /// Array literal rows of different lengths
    #[error("Array literal rows have different lengths")]
    RaggedArray,

    /// Operator without a usable operand
    #[error("Operator '{0}' has no valid operand")]
    MissingOperand(String),

    /// Several expressions where one was expected
    #[error("Multiple expressions where one was expected")]
    MultipleExpressions,

    /// Nesting deeper than the configured limit
    #[error("Formula is nested deeper than {0} levels")]
    TooDeep(usize),
}

/// A parse error with the character offset it was found at
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at position {position}")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Character offset into the formula text (including any leading `=`)
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: usize) -> Self {
        Self { kind, position }
    }
}
