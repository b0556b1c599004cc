//! SQL literal token extraction.
//!
//! A minimal cursor over statement text that pulls single literal tokens
//! (numbers, quoted strings, bare words) for parameter parsing. This is not
//! a SQL parser: grammar, identifiers and expressions are someone else's
//! problem.

use crate::error::ProtocolError;

/// A parsed numeric token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberLiteral {
    Int(i128),
    Float(f64),
}

impl NumberLiteral {
    pub fn as_f64(self) -> f64 {
        match self {
            NumberLiteral::Int(v) => v as f64,
            NumberLiteral::Float(v) => v,
        }
    }
}

/// Cursor over SQL text yielding one literal token at a time.
pub struct SqlLexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SqlLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Consumes `symbol` if it is the next non-whitespace character.
    pub fn eat_symbol(&mut self, symbol: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(symbol) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes `keyword` case-insensitively if it is the next bare word.
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        if let Some(head) = rest.get(..keyword.len()) {
            if head.eq_ignore_ascii_case(keyword) {
                // Must not be a prefix of a longer word.
                let after = rest[keyword.len()..].chars().next();
                if !matches!(after, Some(c) if c.is_alphanumeric() || c == '_') {
                    self.pos += keyword.len();
                    return true;
                }
            }
        }
        false
    }

    pub fn is_eof(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    fn literal_error(&self, expected: &str) -> ProtocolError {
        let found: String = self.rest().chars().take(20).collect();
        ProtocolError::LiteralFormat {
            expected: expected.to_string(),
            found,
        }
    }

    /// Parses a numeric literal: optional sign, decimal or `0x` hex integer,
    /// or a float with fraction and/or exponent.
    pub fn number_literal(&mut self) -> Result<NumberLiteral, ProtocolError> {
        self.skip_whitespace();
        let start = self.pos;

        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        if self.rest().starts_with("0x") || self.rest().starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.input[digits_start..self.pos];
            let value = i128::from_str_radix(digits, 16)
                .map_err(|_| self.error_at(start, "numeric literal"))?;
            return Ok(NumberLiteral::Int(if negative { -value } else { value }));
        }

        let mut is_float = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }

        let token = &self.input[start..self.pos];
        if token.is_empty() || token == "-" || token == "+" {
            return Err(self.error_at(start, "numeric literal"));
        }
        if is_float {
            token
                .parse::<f64>()
                .map(NumberLiteral::Float)
                .map_err(|_| self.error_at(start, "numeric literal"))
        } else {
            token
                .parse::<i128>()
                .map(NumberLiteral::Int)
                .map_err(|_| self.error_at(start, "numeric literal"))
        }
    }

    /// Parses a single-quoted string literal with `''` and backslash escapes.
    pub fn string_literal(&mut self) -> Result<String, ProtocolError> {
        self.skip_whitespace();
        if self.peek() != Some('\'') {
            return Err(self.literal_error("string literal"));
        }
        self.bump();

        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') => {
                    // Doubled quote is an escaped quote.
                    if self.peek() == Some('\'') {
                        self.bump();
                        out.push('\'');
                    } else {
                        return Ok(out);
                    }
                }
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c) => out.push(c),
                    None => return Err(self.literal_error("string literal")),
                },
                Some(c) => out.push(c),
                None => return Err(self.literal_error("string literal")),
            }
        }
    }

    /// Parses an unquoted word, e.g. `NULL` or `true`.
    pub fn bare_word(&mut self) -> Result<&'a str, ProtocolError> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        if self.pos == start {
            return Err(self.literal_error("bare word"));
        }
        Ok(&self.input[start..self.pos])
    }

    fn error_at(&self, start: usize, expected: &str) -> ProtocolError {
        let found: String = self.input[start..].chars().take(20).collect();
        ProtocolError::LiteralFormat {
            expected: expected.to_string(),
            found,
        }
    }
}
