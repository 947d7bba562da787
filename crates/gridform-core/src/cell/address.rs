//! A1 cell addresses

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A single cell on a sheet, such as `B3` or `$A$1`
///
/// Coordinates are 0-based; text forms are 1-based with column letters
/// `A` through `XFD`. Formula trees carry their own richer address type, and
/// this one is used where a concrete cell is needed: the anchor cell of a
/// formula or the base of R1C1 output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
    /// `$` before the row number
    pub row_absolute: bool,
    /// `$` before the column letters
    pub col_absolute: bool,
}

impl CellAddress {
    /// A relative address at `row`, `col`
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Read an A1 address, with optional `$` markers
    ///
    /// ```
    /// use gridform_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("A1").unwrap();
    /// assert_eq!((addr.row, addr.col), (0, 0));
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let invalid = |what: &str| Error::InvalidAddress(format!("{what} in '{text}'"));

        let (col_absolute, rest) = strip_dollar(text);
        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(letters_end);
        if letters.is_empty() {
            return Err(invalid("no column letters"));
        }
        let col = Self::letters_to_column(letters)?;

        let (row_absolute, digits) = strip_dollar(rest);
        if digits.is_empty() {
            return Err(invalid("no row number"));
        }
        let row = Self::parse_row_number(digits).map_err(|err| match err {
            Error::RowOutOfBounds(..) => err,
            _ => invalid("invalid row number"),
        })?;

        Ok(Self::with_absolute(row, col, row_absolute, col_absolute))
    }

    /// 1-based row text to a 0-based row index
    ///
    /// ```
    /// use gridform_core::CellAddress;
    ///
    /// assert_eq!(CellAddress::parse_row_number("10").unwrap(), 9);
    /// assert!(CellAddress::parse_row_number("0").is_err());
    /// ```
    pub fn parse_row_number(digits: &str) -> Result<u32> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number '{digits}'")));
        }
        // Leading zeros are allowed, so compare numerically rather than by length
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            return Err(Error::InvalidAddress("row numbers start at 1".into()));
        }
        match trimmed.parse::<u32>() {
            Ok(row) if row <= MAX_ROWS => Ok(row - 1),
            Ok(row) => Err(Error::RowOutOfBounds(row - 1, MAX_ROWS - 1)),
            Err(_) => Err(Error::RowOutOfBounds(u32::MAX, MAX_ROWS - 1)),
        }
    }

    /// Bijective base-26 letters for a 0-based column (`0` is `A`, `26` is `AA`)
    pub fn column_to_letters(col: u32) -> String {
        let mut letters = Vec::new();
        let mut n = u64::from(col) + 1;
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.iter().rev().map(|&b| char::from(b)).collect()
    }

    /// 0-based column for letters, case-insensitive; rejects anything past `XFD`
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }
        let mut number: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("invalid column letter '{c}'")));
            }
            number = number * 26 + u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
            if number > u32::from(MAX_COLS) {
                return Err(Error::ColumnOutOfBounds(number - 1, MAX_COLS - 1));
            }
        }
        // At least one letter was read, so number >= 1
        Ok((number - 1) as u16)
    }

    pub fn to_a1_string(&self) -> String {
        let dollar = |absolute: bool| if absolute { "$" } else { "" };
        format!(
            "{}{}{}{}",
            dollar(self.col_absolute),
            Self::column_to_letters(u32::from(self.col)),
            dollar(self.row_absolute),
            self.row + 1
        )
    }
}

fn strip_dollar(text: &str) -> (bool, &str) {
    match text.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, text),
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
