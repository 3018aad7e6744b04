//! Fit and plot ranges, and the clamping policy of the fit range.

use serde::{Deserialize, Serialize};

/// Magnitude at which a fit bound counts as "no limit".
pub const UNBOUNDED: f64 = 1e10;

/// Relative distance beyond a bound that is still treated as round-off.
pub const CLIP_TOLERANCE: f64 = 1e-6;

/// Outcome of clipping a value into a [`FitRange`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub value: f64,
    pub in_range: bool,
    /// The input lay outside by more than the tolerance, i.e. the clip is
    /// worth a warning.
    pub beyond_tolerance: bool,
}

/// Inclusive bounds used for validity checks and clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitRange {
    pub min: f64,
    pub max: f64,
}

impl Default for FitRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl FitRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn unbounded() -> Self {
        Self {
            min: -UNBOUNDED,
            max: UNBOUNDED,
        }
    }

    /// True unless the range is exactly the unbounded sentinel pair.
    pub fn has_limits(&self) -> bool {
        self.min != -UNBOUNDED || self.max != UNBOUNDED
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        self.clip(value).in_range
    }

    pub fn clip(&self, value: f64) -> Clip {
        let unchanged = Clip {
            value,
            in_range: true,
            beyond_tolerance: false,
        };
        if !self.has_limits() {
            return unchanged;
        }

        let tolerance = CLIP_TOLERANCE * self.width();
        if value > self.max {
            Clip {
                value: self.max,
                in_range: false,
                beyond_tolerance: value - self.max > tolerance,
            }
        } else if value < self.min {
            Clip {
                value: self.min,
                in_range: false,
                beyond_tolerance: self.min - value > tolerance,
            }
        } else {
            unchanged
        }
    }
}

/// Display-only range with a bin count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotRange {
    pub min: f64,
    pub max: f64,
    pub bins: u32,
}

impl PlotRange {
    pub const DEFAULT_BINS: u32 = 100;

    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            bins: Self::DEFAULT_BINS,
        }
    }
}

impl Default for PlotRange {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_inside_is_identity() {
        let range = FitRange::new(-1.0, 1.0);
        for v in [-1.0, -0.5, 0.0, 0.999, 1.0] {
            let clip = range.clip(v);
            assert_eq!(clip.value, v);
            assert!(clip.in_range);
            assert!(!clip.beyond_tolerance);
        }
    }

    #[test]
    fn test_clip_outside_lands_on_bound() {
        let range = FitRange::new(2.0, 4.0);
        let high = range.clip(10.0);
        assert_eq!(high.value, 4.0);
        assert!(!high.in_range);
        assert!(high.beyond_tolerance);

        let low = range.clip(-3.0);
        assert_eq!(low.value, 2.0);
        assert!(!low.in_range);
        assert!(low.beyond_tolerance);
    }

    #[test]
    fn test_clip_within_tolerance_is_quiet() {
        let range = FitRange::new(0.0, 100.0);
        // tolerance is 1e-6 * 100 = 1e-4
        let clip = range.clip(100.00005);
        assert_eq!(clip.value, 100.0);
        assert!(!clip.in_range);
        assert!(!clip.beyond_tolerance);

        let clip = range.clip(-0.00005);
        assert_eq!(clip.value, 0.0);
        assert!(!clip.beyond_tolerance);

        assert!(range.clip(100.001).beyond_tolerance);
    }

    #[test]
    fn test_unbounded_range_never_clips() {
        let range = FitRange::unbounded();
        assert!(!range.has_limits());
        let clip = range.clip(5e12);
        assert_eq!(clip.value, 5e12);
        assert!(clip.in_range);
    }

    #[test]
    fn test_one_sided_limit_counts_as_limited() {
        assert!(FitRange::new(0.0, UNBOUNDED).has_limits());
        assert!(FitRange::new(-UNBOUNDED, 3.0).has_limits());
        assert!(FitRange::new(-1e12, 1e12).has_limits());
    }

    #[test]
    fn test_range_wider_than_sentinel_clips() {
        let range = FitRange::new(-1e12, 1e12);
        let clip = range.clip(5e12);
        assert_eq!(clip.value, 1e12);
        assert!(!clip.in_range);
        assert!(clip.beyond_tolerance);
    }
}
