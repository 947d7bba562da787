//! Sheet-name helpers
//!
//! Sheet names appear in formulas either bare (`Sheet1!A1`) or single-quoted
//! (`'Q1 Sales'!A1`, with `'` doubled inside the quotes).

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::{CellAddress, MAX_SHEET_NAME_LEN};

/// Compare two sheet names the way spreadsheets do (case-insensitive)
pub fn sheet_names_eq(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Check a name against the workbook rules before it is used for a sheet
///
/// Names are 1 to 31 characters, contain none of `[]:*?/\`, and do not
/// start or end with `'`.
pub fn validate_sheet_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Err(Error::InvalidSheetName(format!("'{name}' {reason}")));
    let len = name.chars().count();
    if len == 0 {
        return invalid("is empty");
    }
    if len > MAX_SHEET_NAME_LEN {
        return invalid("is longer than 31 characters");
    }
    if let Some(c) = name.chars().find(|c| "[]:*?/\\".contains(*c)) {
        return invalid(&format!("contains '{c}'"));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return invalid("starts or ends with a quote");
    }
    Ok(())
}

/// Whether a sheet name must be single-quoted when written in a formula
///
/// ```
/// use gridform_core::sheet_name_needs_quotes;
///
/// assert!(!sheet_name_needs_quotes("Sheet1"));
/// assert!(sheet_name_needs_quotes("Q1 Sales"));
/// assert!(sheet_name_needs_quotes("A1"));
/// ```
pub fn sheet_name_needs_quotes(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if !(first.is_alphabetic() || first == '_') {
        return true;
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return true;
    }
    // A bare name that reads as a cell address would be ambiguous
    CellAddress::parse(name).is_ok()
}

/// Quote a sheet name for use in a formula, if needed
pub fn quote_sheet_name(name: &str) -> Cow<'_, str> {
    if sheet_name_needs_quotes(name) {
        Cow::Owned(format!("'{}'", name.replace('\'', "''")))
    } else {
        Cow::Borrowed(name)
    }
}

/// Strip the quotes from a quoted sheet name, undoubling inner quotes
///
/// Returns `None` when `quoted` is not a complete quoted name.
pub fn unquote_sheet_name(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('\'')?.strip_suffix('\'')?;

    let mut name = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            // Inner quotes must come in pairs
            if chars.next() != Some('\'') {
                return None;
            }
        }
        name.push(c);
    }
    Some(name)
}
