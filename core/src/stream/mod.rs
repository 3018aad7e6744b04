//! Line-oriented text serialization of real-valued nodes.
//!
//! Every node type implements [`Serializable`] in one of two modes: a compact
//! form carrying only the value, and an extended form carrying the value plus
//! its metadata on a single line.

pub mod parser;

pub use parser::{convert_to_double, LineParser};

use crate::formula::FormulaError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// A single token holding the bare value.
    Compact,
    /// Value and metadata tokens on one line.
    #[default]
    Extended,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    #[error("Unexpected end of line")]
    UnexpectedEol,
    #[error("Invalid number: '{0}'")]
    InvalidNumber(String),
    #[error("Expected '{expected}', found '{found}'")]
    UnexpectedToken { expected: String, found: String },
    #[error("Value {value} is outside of the fit range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("Cannot read in {0:?} mode")]
    Unsupported(Mode),
    #[error(transparent)]
    Formula(#[from] FormulaError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("Cannot write in {0:?} mode")]
    Unsupported(Mode),
}

/// Read/write capability of a node in the line text format.
pub trait Serializable {
    /// Apply the tokens of one line. Tokens consumed before an error keep
    /// their effect.
    fn read(&mut self, parser: &mut LineParser<'_>, mode: Mode) -> Result<(), ReadError>;

    fn write(&self, mode: Mode) -> Result<String, WriteError>;

    fn read_str(&mut self, line: &str, mode: Mode) -> Result<(), ReadError> {
        let mut parser = LineParser::new(line);
        self.read(&mut parser, mode)
    }
}
