//! Expression parser for formula nodes.
//!
//! Supports:
//! - Numbers (integers, floats, scientific notation)
//! - Variable references, bare (`x`) or prefixed (`@x`)
//! - Arithmetic operators (+, -, *, /, ^)
//! - Parentheses for grouping
//! - Function calls with one or more comma separated arguments
//! - Built-in constants (pi, PI, E)

/// Parse error with location info
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at position {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// Variable reference (name without @)
    VarRef(String),
    /// Built-in constant (PI, E)
    Constant(String),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    FnCall {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Names of all variables referenced by this expression, in order of
    /// first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut Vec<String>) {
        match self {
            Expr::VarRef(name) => {
                if !names.iter().any(|n| n == name) {
                    names.push(name.clone());
                }
            }
            Expr::Number(_) | Expr::Constant(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_variables(names),
            Expr::FnCall { args, .. } => {
                for arg in args {
                    arg.collect_variables(names);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    /// `at` marks the `@name` form, which is never a constant or a call.
    Name { name: String, at: bool },
    /// One of `+ - * / ^ ( ) ,`
    Punct(char),
}

const PUNCTUATION: &str = "+-*/^(),";

/// Split `input` into tokens tagged with their byte offset.
fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(c) = input[pos..].chars().next() {
        let rest = &input[pos..];
        if c.is_whitespace() {
            pos += c.len_utf8();
        } else if PUNCTUATION.contains(c) {
            tokens.push((pos, Token::Punct(c)));
            pos += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let text = &rest[..number_len(rest)];
            let value = text.parse::<f64>().map_err(|_| ParseError {
                message: format!("Invalid number: '{}'", text),
                position: pos,
            })?;
            tokens.push((pos, Token::Number(value)));
            pos += text.len();
        } else if c == '@' || c == '_' || c.is_ascii_alphabetic() {
            let at = c == '@';
            let body = if at { &rest[1..] } else { rest };
            let len = body
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                .unwrap_or(body.len());
            if len == 0 {
                return Err(ParseError {
                    message: "Expected variable name after @".to_string(),
                    position: pos,
                });
            }
            tokens.push((
                pos,
                Token::Name {
                    name: body[..len].to_string(),
                    at,
                },
            ));
            pos += len + usize::from(at);
        } else {
            return Err(ParseError {
                message: format!("Unexpected character: '{}'", c),
                position: pos,
            });
        }
    }
    Ok(tokens)
}

/// Length of the numeric literal at the start of `s`: digits with at most
/// one dot, then an optional exponent that has at least one digit.
fn number_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut len = 0;
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(len) {
        if b.is_ascii_digit() || (b == b'.' && !seen_dot) {
            seen_dot |= b == b'.';
            len += 1;
        } else {
            break;
        }
    }
    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let mut end = len + 1;
        if matches!(bytes.get(end), Some(b'+' | b'-')) {
            end += 1;
        }
        let digits = bytes[end.min(bytes.len())..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits > 0 {
            len = end + digits;
        }
    }
    len
}

fn binary_operator(c: char) -> Option<(BinaryOperator, u8)> {
    match c {
        '+' => Some((BinaryOperator::Add, 1)),
        '-' => Some((BinaryOperator::Sub, 1)),
        '*' => Some((BinaryOperator::Mul, 2)),
        '/' => Some((BinaryOperator::Div, 2)),
        '^' => Some((BinaryOperator::Pow, 3)),
        _ => None,
    }
}

/// Precedence-climbing parser over a token list.
struct Parser {
    tokens: Vec<(usize, Token)>,
    next: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.next).map(|(_, t)| t)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.next).map(|(_, t)| t.clone());
        self.next += 1;
        token
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.next += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let position = self.tokens.get(self.next).map_or(self.end, |(pos, _)| *pos);
        ParseError {
            message: message.into(),
            position,
        }
    }

    fn expect(&mut self, c: char, context: &str) -> Result<(), ParseError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}' {}", c, context)))
        }
    }

    /// Operands are unary expressions, so `-2^2` reads as `(-2)^2`.
    /// `^` is right associative.
    fn binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        while let Some(&Token::Punct(c)) = self.peek() {
            let Some((op, prec)) = binary_operator(c) else { break };
            if prec < min_prec {
                break;
            }
            self.next += 1;
            let next_min = if op == BinaryOperator::Pow { prec } else { prec + 1 };
            let right = self.binary(next_min)?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat('-') {
            let operand = self.unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Neg,
                operand: Box::new(operand),
            });
        }
        if self.eat('+') {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.next;
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Name { name, at: true }) => Ok(Expr::VarRef(name)),
            Some(Token::Name { name, at: false }) => {
                if self.eat('(') {
                    let mut args = vec![self.binary(1)?];
                    while self.eat(',') {
                        args.push(self.binary(1)?);
                    }
                    self.expect(')', "after function arguments")?;
                    return Ok(Expr::FnCall { name, args });
                }
                Ok(match name.as_str() {
                    "PI" | "pi" => Expr::Constant("PI".to_string()),
                    "E" => Expr::Constant("E".to_string()),
                    _ => Expr::VarRef(name),
                })
            }
            Some(Token::Punct('(')) => {
                let expr = self.binary(1)?;
                self.expect(')', "to close the group")?;
                Ok(expr)
            }
            _ => {
                self.next = start;
                Err(self.error("Expected a number, name or '('"))
            }
        }
    }
}

/// Parse an expression string into an AST
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError {
            message: "Empty expression".to_string(),
            position: 0,
        });
    }
    let mut parser = Parser {
        tokens,
        next: 0,
        end: input.len(),
    };
    let expr = parser.binary(1)?;
    if parser.peek().is_some() {
        return Err(parser.error("Unexpected token after expression"));
    }
    Ok(expr)
}
