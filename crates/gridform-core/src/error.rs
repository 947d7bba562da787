//! Error types for gridform-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from address parsing and sheet-name checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// 0-based row index and the last valid index
    #[error("Row {0} is past the last row ({1})")]
    RowOutOfBounds(u32, u32),

    /// 0-based column index and the last valid index
    #[error("Column {0} is past the last column ({1})")]
    ColumnOutOfBounds(u32, u16),

    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),
}
