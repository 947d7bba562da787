//! Parser and renderer configuration

use gridform_core::CellAddress;

/// Locale-dependent punctuation and names
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Locale {
    pub decimal_mark: char,
    pub argument_separator: char,
    /// Separates columns inside `{...}`; rows are always separated by `;`
    pub array_column_separator: char,
    pub true_name: String,
    pub false_name: String,
}

impl Locale {
    /// `.` decimal mark, `,` argument separator
    pub fn en_us() -> Self {
        Self {
            decimal_mark: '.',
            argument_separator: ',',
            array_column_separator: ',',
            true_name: "TRUE".into(),
            false_name: "FALSE".into(),
        }
    }

    /// `,` decimal mark, `;` argument separator
    pub fn european() -> Self {
        Self {
            decimal_mark: ',',
            argument_separator: ';',
            array_column_separator: '\\',
            ..Self::en_us()
        }
    }

    /// Boolean named by `name` in this locale, if any (case-insensitive)
    pub fn boolean(&self, name: &str) -> Option<bool> {
        if name.eq_ignore_ascii_case(&self.true_name) {
            Some(true)
        } else if name.eq_ignore_ascii_case(&self.false_name) {
            Some(false)
        } else {
            None
        }
    }

    pub fn boolean_name(&self, value: bool) -> &str {
        if value {
            &self.true_name
        } else {
            &self.false_name
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::en_us()
    }
}

/// Parser configuration
///
/// A [`crate::Parser`] holds only this; all per-call state lives in the
/// parse context, so one parser can be shared.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserOptions {
    pub locale: Locale,
    /// Recognize `R1C1` / `R[-1]C[2]` addresses
    pub r1c1: bool,
    /// Fold `1 1/2` into one literal
    pub fractions: bool,
    /// Fold `3 ft` into a dimensioned value
    pub dimensioned: bool,
    /// Maximum nesting of groups, calls and arrays; a run of operators
    /// between them may stack four times as deep
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            locale: Locale::en_us(),
            r1c1: false,
            fractions: false,
            dimensioned: false,
            max_depth: 64,
        }
    }
}

impl ParserOptions {
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_r1c1(mut self, r1c1: bool) -> Self {
        self.r1c1 = r1c1;
        self
    }

    pub fn with_fractions(mut self, fractions: bool) -> Self {
        self.fractions = fractions;
        self
    }

    pub fn with_dimensioned(mut self, dimensioned: bool) -> Self {
        self.dimensioned = dimensioned;
        self
    }

    /// Read options from JSON; missing fields take their defaults
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::FormulaResult<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| crate::FormulaError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reject locales whose punctuation would be ambiguous
    pub fn validate(&self) -> crate::FormulaResult<()> {
        let locale = &self.locale;
        if locale.decimal_mark == locale.argument_separator {
            return Err(crate::FormulaError::Config(format!(
                "decimal mark and argument separator are both '{}'",
                locale.decimal_mark
            )));
        }
        if locale.array_column_separator == ';' || locale.array_column_separator == locale.decimal_mark
        {
            return Err(crate::FormulaError::Config(format!(
                "array column separator '{}' is ambiguous",
                locale.array_column_separator
            )));
        }
        if self.max_depth == 0 {
            return Err(crate::FormulaError::Config("max_depth must be positive".into()));
        }
        Ok(())
    }
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderOptions {
    pub locale: Locale,
    /// Added to relative rows (copy/paste, fill)
    pub row_offset: i64,
    /// Added to relative columns
    pub column_offset: i64,
    /// Text written for omitted call arguments
    pub missing: String,
    pub r1c1: bool,
    /// Cell that R1C1 relative offsets are measured from
    pub base: Option<CellAddress>,
    /// `Table[[#This Row],[Col]]` instead of `Table[@Col]`
    pub verbose_structured_references: bool,
    /// Table name written for structured references that carry none
    pub implied_table: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            locale: Locale::en_us(),
            row_offset: 0,
            column_offset: 0,
            missing: String::new(),
            r1c1: false,
            base: None,
            verbose_structured_references: false,
            implied_table: None,
        }
    }
}

impl RenderOptions {
    pub fn for_locale(locale: Locale) -> Self {
        Self {
            locale,
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, rows: i64, columns: i64) -> Self {
        self.row_offset = rows;
        self.column_offset = columns;
        self
    }

    pub fn with_missing(mut self, missing: impl Into<String>) -> Self {
        self.missing = missing.into();
        self
    }

    pub fn with_r1c1(mut self, base: Option<CellAddress>) -> Self {
        self.r1c1 = true;
        self.base = base;
        self
    }

    pub fn with_verbose_structured_references(mut self, verbose: bool) -> Self {
        self.verbose_structured_references = verbose;
        self
    }

    pub fn with_implied_table(mut self, table: impl Into<String>) -> Self {
        self.implied_table = Some(table.into());
        self
    }
}
