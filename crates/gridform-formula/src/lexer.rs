//! Character stream and primitive lexing operations
//!
//! The stream works on a `char` array so that positions are character
//! offsets. Every scanning routine consumes at least one character.

use crate::ast::Span;
use crate::error::ParseErrorKind;

/// Closed classification of a character, driving the builder's dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    Digit,
    /// Letters (any script) and `_`
    Letter,
    Dollar,
    Hash,
    DoubleQuote,
    SingleQuote,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    /// `+ - * / ^ & = < > : @`
    Operator,
    Whitespace,
    /// Separators, decimal marks and anything else
    Other,
}

pub(crate) fn classify(c: char) -> CharClass {
    match c {
        '0'..='9' => CharClass::Digit,
        '$' => CharClass::Dollar,
        '#' => CharClass::Hash,
        '"' => CharClass::DoubleQuote,
        '\'' => CharClass::SingleQuote,
        '[' => CharClass::OpenBracket,
        ']' => CharClass::CloseBracket,
        '{' => CharClass::OpenBrace,
        '}' => CharClass::CloseBrace,
        '(' => CharClass::OpenParen,
        ')' => CharClass::CloseParen,
        '+' | '-' | '*' | '/' | '^' | '&' | '=' | '<' | '>' | ':' | '@' => CharClass::Operator,
        c if c.is_whitespace() => CharClass::Whitespace,
        c if c == '_' || c.is_alphabetic() => CharClass::Letter,
        _ => CharClass::Other,
    }
}

/// Characters that may continue a bare token
pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '$')
}

/// A lexed number
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumberToken {
    pub value: f64,
    /// Source spelling with `.` as decimal mark
    pub text: String,
    pub imaginary: bool,
    pub span: Span,
}

/// A lexed bare token (name, address, structured reference, error literal)
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BareToken {
    pub text: String,
    pub span: Span,
    pub bracketed: bool,
}

pub(crate) struct CharStream {
    chars: Vec<char>,
    pos: usize,
}

impl CharStream {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    pub fn advance(&mut self) {
        if self.pos < self.chars.len() {
            self.pos += 1;
        }
    }

    /// Jump to the end of input, abandoning the rest
    pub fn seek_end(&mut self) {
        self.pos = self.chars.len();
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    /// Source text of a span
    pub fn slice(&self, span: Span) -> String {
        let end = span.end.min(self.chars.len());
        let start = span.start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Whether a number starts here
    ///
    /// With `allow_sign`, a leading `+`/`-` directly followed by a number
    /// also counts.
    pub fn at_number(&self, decimal_mark: char, allow_sign: bool) -> bool {
        let offset = match self.peek() {
            Some('+' | '-') if allow_sign => 1,
            _ => 0,
        };
        match self.peek_at(offset) {
            Some(c) if c.is_ascii_digit() => true,
            Some(c) if c == decimal_mark => self.peek_at(offset + 1).map_or(false, |d| d.is_ascii_digit()),
            _ => false,
        }
    }

    /// Scan a number; call only when [`CharStream::at_number`] holds
    pub fn scan_number(&mut self, decimal_mark: char, allow_sign: bool) -> NumberToken {
        let start = self.pos;
        let mut text = String::new();

        if allow_sign {
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.advance();
            }
        }

        self.scan_digits(&mut text);

        // Decimal part
        if self.peek() == Some(decimal_mark) && self.peek_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            text.push('.');
            self.advance();
            self.scan_digits(&mut text);
        }

        // Exponent part
        if let Some(e @ ('e' | 'E')) = self.peek() {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                text.push(e);
                self.advance();
                if signed {
                    if let Some(sign) = self.peek() {
                        text.push(sign);
                    }
                    self.advance();
                }
                self.scan_digits(&mut text);
            }
        }

        let mut value = parse_decimal(&text);

        if self.peek() == Some('%') {
            text.push('%');
            self.advance();
            value /= 100.0;
        }

        // `3i` is imaginary, `3if` is a number followed by a name
        let imaginary = self.peek() == Some('i')
            && !self.peek_at(1).map_or(false, is_identifier_char);
        if imaginary {
            text.push('i');
            self.advance();
        }

        NumberToken {
            value,
            text,
            imaginary,
            span: Span::new(start, self.pos),
        }
    }

    fn scan_digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            text.push(c);
            self.advance();
        }
    }

    /// Scan a double-quoted string, returning its unescaped value
    ///
    /// On a missing closing quote the stream is left at the end of input.
    pub fn scan_string(&mut self) -> Result<(String, Span), (ParseErrorKind, usize)> {
        let start = self.pos;
        self.advance(); // opening quote

        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.advance();
            if c == '"' {
                if self.peek() == Some('"') {
                    value.push('"');
                    self.advance();
                } else {
                    return Ok((value, Span::new(start, self.pos)));
                }
            } else {
                value.push(c);
            }
        }

        Err((ParseErrorKind::UnbalancedQuote, start))
    }

    /// Scan a bare token
    ///
    /// Covers names, sheet-qualified addresses (`'My Sheet'!$A$1`), spill
    /// references (`A1#`), bracketed forms (`Table[@Col]`, `R[-1]C[2]`) and
    /// error literals (`#DIV/0!`).
    pub fn scan_bare(&mut self) -> Result<BareToken, (ParseErrorKind, usize)> {
        let start = self.pos;
        let mut text = String::new();
        let mut bracketed = false;

        if self.peek() == Some('#') {
            text.push('#');
            self.advance();
            while let Some(c) = self
                .peek()
                .filter(|c| c.is_alphanumeric() || matches!(c, '/' | '!' | '?' | '_'))
            {
                text.push(c);
                self.advance();
            }
            return Ok(BareToken {
                text,
                span: Span::new(start, self.pos),
                bracketed,
            });
        }

        if self.peek() == Some('\'') {
            self.scan_quoted(&mut text)?;
        }

        while let Some(c) = self.peek() {
            match c {
                '[' => {
                    bracketed = true;
                    self.scan_brackets(&mut text)?;
                }
                '!' => {
                    text.push(c);
                    self.advance();
                }
                '#' => {
                    // Spill marker ends the token
                    text.push(c);
                    self.advance();
                    break;
                }
                c if is_identifier_char(c) => {
                    text.push(c);
                    self.advance();
                }
                _ => break,
            }
        }

        Ok(BareToken {
            text,
            span: Span::new(start, self.pos),
            bracketed,
        })
    }

    /// `'...'` with `''` as an escaped quote, kept verbatim in `text`
    fn scan_quoted(&mut self, text: &mut String) -> Result<(), (ParseErrorKind, usize)> {
        let start = self.pos;
        text.push('\'');
        self.advance();
        loop {
            match self.peek() {
                None => return Err((ParseErrorKind::UnbalancedQuote, start)),
                Some('\'') if self.peek_at(1) == Some('\'') => {
                    text.push_str("''");
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    text.push('\'');
                    self.advance();
                    return Ok(());
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Balanced `[...]`, nested brackets included
    fn scan_brackets(&mut self, text: &mut String) -> Result<(), (ParseErrorKind, usize)> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            text.push(c);
            self.advance();
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err((ParseErrorKind::UnbalancedBracket, start))
    }
}

/// Parse `.`-normalized decimal text, ignoring any `%`/`i` suffix
fn parse_decimal(text: &str) -> f64 {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    let value = if digits.starts_with('.') {
        format!("0{digits}").parse::<f64>()
    } else {
        digits.parse::<f64>()
    };
    sign * value.unwrap_or(0.0)
}
