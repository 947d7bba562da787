//! Cell-related types
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellError`] - Error values a formula can spell out literally

mod address;
mod value;

pub use address::CellAddress;
pub use value::CellError;
