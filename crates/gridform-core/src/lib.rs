//! # gridform-core
//!
//! Core types shared by the gridform formula front end.
//!
//! This crate provides:
//! - [`CellAddress`] - A1-style cell addressing with absolute/relative flags
//! - [`CellError`] - The spreadsheet error literals (`#REF!`, `#DIV/0!`, ...)
//! - Sheet-name helpers for quoting and case-insensitive comparison
//!
//! ## Example
//!
//! ```rust
//! use gridform_core::{CellAddress, CellError};
//!
//! let addr = CellAddress::parse("$B$2").unwrap();
//! assert_eq!(addr.row, 1);
//! assert_eq!(addr.col, 1);
//!
//! assert_eq!(CellError::parse("#ref!"), Some(CellError::Ref));
//! ```

pub mod cell;
pub mod error;
pub mod sheet;

pub use cell::{CellAddress, CellError};
pub use error::{Error, Result};
pub use sheet::{
    quote_sheet_name, sheet_name_needs_quotes, sheet_names_eq, unquote_sheet_name,
    validate_sheet_name,
};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)  
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
