//! Real-valued nodes: bounded fit parameters and formula nodes.
//!
//! Both node kinds share a [`RealCore`] (identity, unit, plot range and dirty
//! flags) and expose it through the [`RealValued`] trait.

pub mod range;
pub mod format;
pub mod scalar;
pub mod formula_node;
pub mod text;


pub use format::{format_value, FormatOptions, ValueDisplay};
pub use formula_node::FormulaNode;
pub use range::{Clip, FitRange, PlotRange, UNBOUNDED};
pub use scalar::BoundedScalar;

use serde::{Deserialize, Serialize};

/// Cached-state flags the owning graph consults before reusing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyFlags {
    pub value: bool,
    pub shape: bool,
}

impl Default for DirtyFlags {
    /// New (and freshly deserialized) nodes have nothing cached.
    fn default() -> Self {
        Self {
            value: true,
            shape: true,
        }
    }
}

/// State shared by every real-valued node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealCore {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub plot: PlotRange,
    #[serde(skip)]
    pub dirty: DirtyFlags,
}

impl RealCore {
    pub fn new(name: &str, title: &str, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            unit: unit.to_string(),
            plot: PlotRange::default(),
            dirty: DirtyFlags::default(),
        }
    }
}

/// How much detail `print` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrintStyle {
    #[default]
    Standard,
    Shape,
    Verbose,
}

pub trait RealValued {
    fn core(&self) -> &RealCore;

    fn core_mut(&mut self) -> &mut RealCore;

    /// Whether the node's current value is acceptable.
    fn is_valid(&self) -> bool;

    fn name(&self) -> &str {
        &self.core().name
    }

    fn title(&self) -> &str {
        &self.core().title
    }

    fn unit(&self) -> &str {
        &self.core().unit
    }

    fn set_unit(&mut self, unit: &str) {
        self.core_mut().unit = unit.to_string();
    }

    fn plot_range(&self) -> PlotRange {
        self.core().plot
    }

    /// Set the display range. An inverted range collapses onto `min`.
    fn set_plot_range(&mut self, min: f64, max: f64) {
        let core = self.core_mut();
        if min > max {
            tracing::warn!(
                "{}: proposed plot max {} smaller than min {}, setting max to min",
                core.name,
                max,
                min
            );
            core.plot.min = min;
            core.plot.max = min;
        } else {
            core.plot.min = min;
            core.plot.max = max;
        }
    }

    fn set_plot_bins(&mut self, bins: u32) {
        self.core_mut().plot.bins = bins;
    }

    fn dirty(&self) -> DirtyFlags {
        self.core().dirty
    }

    fn mark_value_dirty(&mut self) {
        self.core_mut().dirty.value = true;
    }

    fn mark_shape_dirty(&mut self) {
        self.core_mut().dirty.shape = true;
    }

    fn clear_dirty(&mut self) {
        self.core_mut().dirty = DirtyFlags {
            value: false,
            shape: false,
        };
    }
}
