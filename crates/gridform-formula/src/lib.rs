//! # gridform-formula
//!
//! Spreadsheet formula front end.
//!
//! This crate provides:
//! - Parsing (text → tree), locale-aware and error-tolerant
//! - Rendering (tree → text) with locale conversion, copy/paste offsets and
//!   R1C1 output
//! - Reference extraction for dependency tracking
//! - Reference patching for row/column edits, sheet renames and deletions
//! - Tree traversal and copy-on-write substitution
//!
//! ## Example
//!
//! ```rust
//! use gridform_formula::{parse_formula, ReferencePatcher, StructuralEdit};
//!
//! let result = parse_formula("=SUM(A1:A10) + B2");
//! assert!(result.valid);
//! assert!(result.ranges.contains_key("A1:A10"));
//! assert!(result.addresses.contains_key("B2"));
//!
//! let patcher = ReferencePatcher::default();
//! let edit = StructuralEdit::insert_rows("Sheet1", 0, 1);
//! let moved = patcher.shift_formula("=SUM(A1:A10) + B2", "Sheet1", &edit);
//! assert_eq!(moved.as_deref(), Some("=SUM(A2:A11) + B3"));
//! ```

pub mod ast;
pub mod error;
mod lexer;
pub mod options;
pub mod parser;
pub mod patch;
pub mod render;
pub mod walk;

pub use ast::{
    Address, ArrayLiteral, Binary, Call, Complex, Dimensioned, Group, ImplicitCall, Literal,
    LiteralValue, Operator, Range, Span, StructuredReference, StructuredScope, Unary, Unit,
    UnitId, UnitKind, INVALID, UNBOUNDED,
};
pub use error::{FormulaError, FormulaResult, ParseError, ParseErrorKind};
pub use options::{Locale, ParserOptions, RenderOptions};
pub use parser::{parse_formula, ParseResult, Parser, Reference, ReferenceKind};
pub use patch::{
    assign_sheet_ids, invalidate_sheet, rename_sheet, resolve_relative, shift_references, Axis,
    FormulaCell, FormulaStore, ReferencePatcher, StructuralEdit,
};
pub use render::render;
pub use walk::{substitute, walk, walk_mut};
