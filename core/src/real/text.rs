//! Line text format for scalars and formula nodes.
//!
//! Extended scalar line:
//! `<value> [+/- <error>] [C] P(<min> - <max> : <bins>) [F(<min> - <max>)] [// [<unit>]]`

use super::{BoundedScalar, FormulaNode, RealValued};
use crate::stream::{convert_to_double, LineParser, Mode, ReadError, Serializable, WriteError};
use tracing::warn;

impl BoundedScalar {
    fn read_compact(&mut self, parser: &mut LineParser<'_>) -> Result<(), ReadError> {
        let value = parser.read_double()?;
        if !self.is_valid_value(value, true) {
            let range = self.fit_range();
            return Err(ReadError::OutOfRange {
                value,
                min: range.min,
                max: range.max,
            });
        }
        self.set_value(value);
        Ok(())
    }

    /// The value token is applied after the loop, even when a later token
    /// fails, so that range tokens on the same line still govern its clamping.
    fn read_extended(&mut self, parser: &mut LineParser<'_>) -> Result<(), ReadError> {
        let mut value = None;
        let outcome = self.read_extended_tokens(parser, &mut value);
        if let Some(value) = value {
            self.set_value(value);
        }
        outcome
    }

    fn read_extended_tokens(&mut self, parser: &mut LineParser<'_>, value: &mut Option<f64>) -> Result<(), ReadError> {
        while let Some(token) = parser.read_token() {
            match token {
                "+/-" => {
                    let error = parser.read_double()?;
                    self.set_error(error);
                }
                "C" => self.set_constant(true),
                "P" => {
                    parser.expect_token("(")?;
                    let min = parser.read_double()?;
                    parser.expect_token("-")?;
                    let max = parser.read_double()?;
                    parser.expect_token(":")?;
                    let bins = parser.read_integer()?;
                    parser.expect_token(")")?;
                    let bins = u32::try_from(bins).map_err(|_| ReadError::InvalidNumber(bins.to_string()))?;
                    self.set_plot_range(min, max);
                    self.set_plot_bins(bins);
                }
                "F" => {
                    parser.expect_token("(")?;
                    let min = parser.read_double()?;
                    parser.expect_token("-")?;
                    let max = parser.read_double()?;
                    parser.expect_token(")")?;
                    self.set_fit_range(min, max);
                }
                other => *value = Some(convert_to_double(other)?),
            }
        }
        Ok(())
    }
}

impl Serializable for BoundedScalar {
    fn read(&mut self, parser: &mut LineParser<'_>, mode: Mode) -> Result<(), ReadError> {
        let result = match mode {
            Mode::Compact => self.read_compact(parser),
            Mode::Extended => self.read_extended(parser),
        };
        if let Err(e) = &result {
            warn!("{}: {}", self.name(), e);
            parser.zap_to_end();
        }
        result
    }

    fn write(&self, mode: Mode) -> Result<String, WriteError> {
        if mode == Mode::Compact {
            return Ok(self.value().to_string());
        }

        let mut line = format!("{} ", self.value());
        if self.error() != 0.0 {
            line.push_str(&format!("+/- {} ", self.error()));
        }
        if self.is_constant() {
            line.push_str("C ");
        }
        let plot = self.plot_range();
        line.push_str(&format!("P({} - {} : {}) ", plot.min, plot.max, plot.bins));
        if self.has_fit_limits() {
            let fit = self.fit_range();
            line.push_str(&format!("F({} - {}) ", fit.min, fit.max));
        }
        if !self.unit().is_empty() {
            line.push_str(&format!("// [{}]", self.unit()));
        }
        Ok(line)
    }
}

impl Serializable for FormulaNode {
    fn read(&mut self, parser: &mut LineParser<'_>, mode: Mode) -> Result<(), ReadError> {
        if mode == Mode::Compact {
            warn!("{}: can't read in compact mode", self.name());
            return Err(ReadError::Unsupported(mode));
        }
        let expression = parser.read_line();
        self.recompile(expression).map_err(|e| {
            warn!("{}: {}", self.name(), e);
            ReadError::from(e)
        })
    }

    fn write(&self, mode: Mode) -> Result<String, WriteError> {
        if mode == Mode::Compact {
            warn!("{}: can't write in compact mode", self.name());
            return Err(WriteError::Unsupported(mode));
        }
        Ok(self.expression().to_string())
    }
}
