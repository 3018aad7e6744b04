//! Scalar fit parameter with a clamping fit range.

use super::format::{format_value, FormatOptions, ValueDisplay};
use super::range::FitRange;
use super::{PlotRange, PrintStyle, RealCore, RealValued};
use crate::table::{Attachment, ColumnType, Table, TableError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A real-valued parameter whose value is kept inside its fit range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedScalar {
    #[serde(flatten)]
    core: RealCore,
    value: f64,
    /// Symmetric uncertainty, 0 when unset
    #[serde(default)]
    error: f64,
    #[serde(default)]
    fit: FitRange,
    #[serde(default)]
    constant: bool,
}

impl BoundedScalar {
    /// A fixed value without fit limits.
    pub fn constant(name: &str, title: &str, value: f64, unit: &str) -> Self {
        Self {
            core: RealCore::new(name, title, unit),
            value,
            error: 0.0,
            fit: FitRange::unbounded(),
            constant: true,
        }
    }

    /// A free parameter on `[min, max]`, starting at the midpoint.
    pub fn with_range(name: &str, title: &str, min: f64, max: f64, unit: &str) -> Self {
        Self::new(name, title, 0.5 * (min + max), min, max, unit)
    }

    /// A free parameter on `[min, max]` starting at `value` (clamped).
    pub fn new(name: &str, title: &str, value: f64, min: f64, max: f64, unit: &str) -> Self {
        let mut core = RealCore::new(name, title, unit);
        core.plot = PlotRange::new(min, max);
        let mut scalar = Self {
            core,
            value,
            error: 0.0,
            fit: FitRange::new(min, max),
            constant: false,
        };
        if min > max {
            scalar.set_fit_range(min, max);
        }
        scalar.reclamp();
        scalar
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn fit_range(&self) -> FitRange {
        self.fit
    }

    pub fn has_fit_limits(&self) -> bool {
        self.fit.has_limits()
    }

    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Clip `value` into the fit range. Returns the clipped value and whether
    /// the input was already in range. A warning is logged only when the
    /// input lies outside by more than the round-off tolerance.
    pub fn clamp(&self, value: f64) -> (f64, bool) {
        let clip = self.fit.clip(value);
        if clip.beyond_tolerance {
            let direction = if value > self.fit.max { "down to max" } else { "up to min" };
            warn!(
                "{}: value {} rounded {} limit {}",
                self.core.name, value, direction, clip.value
            );
        }
        (clip.value, clip.in_range)
    }

    /// Store `value` clipped into the fit range and mark the value dirty.
    pub fn set_value(&mut self, value: f64) {
        let (clipped, _) = self.clamp(value);
        self.value = clipped;
        self.mark_value_dirty();
    }

    pub fn set_error(&mut self, error: f64) {
        self.error = error;
    }

    pub fn set_constant(&mut self, constant: bool) {
        self.constant = constant;
    }

    /// Set both fit bounds. An inverted range collapses onto `min`.
    pub fn set_fit_range(&mut self, min: f64, max: f64) {
        if min > max {
            warn!(
                "{}: proposed fit max {} smaller than min {}, setting max to min",
                self.core.name, max, min
            );
            self.fit = FitRange::new(min, min);
        } else {
            self.fit = FitRange::new(min, max);
        }
        self.reclamp();
        self.mark_shape_dirty();
    }

    /// Set the lower fit bound; a bound above the current max collapses onto it.
    pub fn set_fit_min(&mut self, min: f64) {
        if min > self.fit.max {
            warn!(
                "{}: proposed fit min {} larger than max {}, setting min to max",
                self.core.name, min, self.fit.max
            );
            self.fit.min = self.fit.max;
        } else {
            self.fit.min = min;
        }
        self.reclamp();
        self.mark_shape_dirty();
    }

    /// Set the upper fit bound; a bound below the current min collapses onto it.
    pub fn set_fit_max(&mut self, max: f64) {
        if max < self.fit.min {
            warn!(
                "{}: proposed fit max {} smaller than min {}, setting max to min",
                self.core.name, max, self.fit.min
            );
            self.fit.max = self.fit.min;
        } else {
            self.fit.max = max;
        }
        self.reclamp();
        self.mark_shape_dirty();
    }

    fn reclamp(&mut self) {
        let (clipped, in_range) = self.clamp(self.value);
        if !in_range {
            self.value = clipped;
            self.mark_value_dirty();
        }
    }

    /// Whether `value` lies in the fit range; `verbose` logs rejections.
    pub fn is_valid_value(&self, value: f64, verbose: bool) -> bool {
        if !self.fit.contains(value) {
            if verbose {
                warn!("{}: value {} out of range", self.core.name, value);
            }
            return false;
        }
        true
    }

    /// Render the value with `sig_digits` significant digits.
    pub fn format(&self, sig_digits: i32, opts: FormatOptions) -> String {
        let display = ValueDisplay {
            label: &self.core.name,
            value: self.value,
            error: self.error,
            constant: self.constant,
            unit: &self.core.unit,
        };
        format_value(&display, sig_digits, opts)
    }

    pub fn print(&self, style: PrintStyle) -> String {
        let unit = if self.core.unit.is_empty() {
            String::new()
        } else {
            format!(" {}", self.core.unit)
        };
        match style {
            PrintStyle::Verbose => format!(
                "{} = {} +/- {}{}",
                self.core.name, self.value, self.error, unit
            ),
            PrintStyle::Shape => {
                let detail = if self.constant {
                    format!(", fixed at {}", self.value)
                } else {
                    format!(", range is ({},{})", self.fit.min, self.fit.max)
                };
                format!("{}: {}{}{}", self.core.name, self.core.title, detail, unit)
            }
            PrintStyle::Standard => {
                let mut text = format!(
                    "BoundedScalar: {} = {}{} : {}",
                    self.core.name, self.value, unit, self.core.title
                );
                if self.constant {
                    text.push_str(" Constant");
                } else if self.has_fit_limits() {
                    text.push_str(&format!(" ({},{})", self.fit.min, self.fit.max));
                }
                text
            }
        }
    }

    /// Bind this scalar to the `F64` column carrying its name, creating the
    /// column with `buffer_size` if needed.
    pub fn attach_to_table(&self, table: &mut Table, buffer_size: usize) -> Result<Attachment, TableError> {
        table.attach(&self.core.name, ColumnType::F64, buffer_size)
    }

    /// Load the value stored in `row` of the attached column.
    pub fn load_from(&mut self, table: &Table, row: usize) -> Result<(), TableError> {
        let value = table.get(&self.core.name, row)?;
        self.set_value(value);
        Ok(())
    }
}

impl RealValued for BoundedScalar {
    fn core(&self) -> &RealCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RealCore {
        &mut self.core
    }

    fn is_valid(&self) -> bool {
        self.is_valid_value(self.value, false)
    }
}
