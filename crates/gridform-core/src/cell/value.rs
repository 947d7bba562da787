//! Error literals

use std::fmt;

/// Spreadsheet error values
///
/// These are the only error spellings a formula may contain literally; the
/// reference patcher also produces [`CellError::Ref`] for broken references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellError {
    /// `#NULL!`, empty intersection
    Null,
    /// `#DIV/0!`
    Div0,
    /// `#VALUE!`
    Value,
    /// `#REF!`, a reference that no longer points at a cell
    Ref,
    /// `#NAME?`
    Name,
    /// `#NUM!`
    Num,
    /// `#N/A`
    Na,
    /// `#GETTING_DATA`
    GettingData,
    /// `#SPILL!`
    Spill,
    /// `#CALC!`
    Calc,
}

/// Every error literal with its canonical spelling
const SPELLINGS: [(CellError, &str); 10] = [
    (CellError::Null, "#NULL!"),
    (CellError::Div0, "#DIV/0!"),
    (CellError::Value, "#VALUE!"),
    (CellError::Ref, "#REF!"),
    (CellError::Name, "#NAME?"),
    (CellError::Num, "#NUM!"),
    (CellError::Na, "#N/A"),
    (CellError::GettingData, "#GETTING_DATA"),
    (CellError::Spill, "#SPILL!"),
    (CellError::Calc, "#CALC!"),
];

impl CellError {
    /// Canonical (upper-case) spelling
    pub fn as_str(&self) -> &'static str {
        SPELLINGS
            .iter()
            .find(|(error, _)| error == self)
            .map_or("#N/A", |(_, text)| text)
    }

    /// Look up an error literal, ignoring case
    pub fn parse(text: &str) -> Option<Self> {
        SPELLINGS
            .iter()
            .find(|(_, spelling)| spelling.eq_ignore_ascii_case(text))
            .map(|(error, _)| *error)
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_literals() {
        assert_eq!(CellError::parse("#DIV/0!"), Some(CellError::Div0));
        assert_eq!(CellError::parse("#n/a"), Some(CellError::Na));
        assert_eq!(CellError::parse("#getting_data"), Some(CellError::GettingData));
        assert_eq!(CellError::parse("#NOPE!"), None);
        assert_eq!(CellError::parse("REF!"), None);
        assert_eq!(CellError::Ref.to_string(), "#REF!");
    }

    #[test]
    fn test_every_spelling_parses_back() {
        for (error, text) in SPELLINGS {
            assert_eq!(error.as_str(), text);
            assert_eq!(CellError::parse(text), Some(error));
        }
    }
}
