//! Token reader over a single line of text.

use super::ReadError;

/// Splits a line into tokens for the extended text format.
///
/// Tokens are separated by whitespace. `(`, `)`, `:` and `,` always form
/// tokens of their own, `+/-` is a single token, and a sign directly followed
/// by a digit or `.` starts a number. `//` begins a comment that runs to the
/// end of the line.
#[derive(Debug, Clone)]
pub struct LineParser<'a> {
    line: &'a str,
    pos: usize,
}

const PUNCTUATION: [char; 4] = ['(', ')', ':', ','];

impl<'a> LineParser<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// True when only whitespace or a comment remains.
    pub fn at_eol(&mut self) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        rest.is_empty() || rest.starts_with("//")
    }

    /// Discard the remainder of the line.
    pub fn zap_to_end(&mut self) {
        self.pos = self.line.len();
    }

    /// Consume and return everything left on the line, trimmed.
    pub fn read_line(&mut self) -> &'a str {
        let rest = self.rest().trim();
        self.zap_to_end();
        rest
    }

    /// Next token, or `None` at end of line.
    pub fn read_token(&mut self) -> Option<&'a str> {
        if self.at_eol() {
            return None;
        }
        let rest = self.rest();
        let first = rest.chars().next()?;

        let len = if rest.starts_with("+/-") {
            3
        } else if PUNCTUATION.contains(&first) {
            1
        } else if (first == '+' || first == '-') && !starts_number(&rest[1..]) {
            1
        } else {
            let mut len = first.len_utf8();
            let mut prev = first;
            for c in rest[len..].chars() {
                let exponent_sign = (c == '+' || c == '-') && (prev == 'e' || prev == 'E');
                if c.is_whitespace() || PUNCTUATION.contains(&c) || ((c == '+' || c == '-') && !exponent_sign) {
                    break;
                }
                len += c.len_utf8();
                prev = c;
            }
            len
        };

        let token = &rest[..len];
        self.pos += len;
        Some(token)
    }

    pub fn read_double(&mut self) -> Result<f64, ReadError> {
        let token = self.read_token().ok_or(ReadError::UnexpectedEol)?;
        convert_to_double(token)
    }

    pub fn read_integer(&mut self) -> Result<i64, ReadError> {
        let token = self.read_token().ok_or(ReadError::UnexpectedEol)?;
        token.parse::<i64>().map_err(|_| ReadError::InvalidNumber(token.to_string()))
    }

    /// Consume the next token and fail unless it equals `expected`.
    pub fn expect_token(&mut self, expected: &str) -> Result<(), ReadError> {
        match self.read_token() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ReadError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.to_string(),
            }),
            None => Err(ReadError::UnexpectedEol),
        }
    }
}

fn starts_number(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
}

/// Parse a token as a floating-point number.
pub fn convert_to_double(token: &str) -> Result<f64, ReadError> {
    token
        .parse::<f64>()
        .map_err(|_| ReadError::InvalidNumber(token.to_string()))
}
