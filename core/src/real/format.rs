//! Precision-aware rendering of a value with its uncertainty.

/// Which segments [`format_value`] emits and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatOptions {
    /// Prefix with `<label> = `.
    pub name: bool,
    /// Leave out the value itself.
    pub hide_value: bool,
    /// Append the error (never for constants).
    pub show_error: bool,
    /// Append the unit.
    pub show_unit: bool,
    /// Wrap in `$...$` and use `\pm`.
    pub tex: bool,
    /// Use the `±` glyph.
    pub rich_text: bool,
    /// Derive the precision from the error even when the error is not shown.
    pub error_precision: bool,
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self) -> Self {
        self.name = true;
        self
    }

    pub fn hide_value(mut self) -> Self {
        self.hide_value = true;
        self
    }

    pub fn with_error(mut self) -> Self {
        self.show_error = true;
        self
    }

    pub fn with_unit(mut self) -> Self {
        self.show_unit = true;
        self
    }

    pub fn tex(mut self) -> Self {
        self.tex = true;
        self
    }

    pub fn rich_text(mut self) -> Self {
        self.rich_text = true;
        self
    }

    pub fn error_precision(mut self) -> Self {
        self.error_precision = true;
        self
    }

    /// Build options from single-letter codes, case-insensitive:
    /// `n` name, `h` hide value, `e` error, `u` unit, `l` rich text,
    /// `x` TeX, `p` error precision. Other characters are ignored.
    pub fn parse(codes: &str) -> Self {
        let mut opts = Self::default();
        for c in codes.chars().map(|c| c.to_ascii_lowercase()) {
            match c {
                'n' => opts.name = true,
                'h' => opts.hide_value = true,
                'e' => opts.show_error = true,
                'u' => opts.show_unit = true,
                'l' => opts.rich_text = true,
                'x' => opts.tex = true,
                'p' => opts.error_precision = true,
                _ => {}
            }
        }
        opts
    }
}

/// Everything the formatter needs to know about the quantity being shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueDisplay<'a> {
    pub label: &'a str,
    pub value: f64,
    pub error: f64,
    pub constant: bool,
    pub unit: &'a str,
}

impl<'a> ValueDisplay<'a> {
    pub fn new(value: f64, error: f64) -> Self {
        Self {
            label: "",
            value,
            error,
            constant: false,
            unit: "",
        }
    }
}

/// More digits than an f64 carries.
pub const MAX_SIG_DIGITS: i32 = 17;

/// Number of decimal places that keeps `sig_digits` significant digits of
/// `basis`. A zero or non-finite basis counts as magnitude 1.
///
/// `sig_digits` is clamped to `1..=MAX_SIG_DIGITS`.
pub fn decimal_places(basis: f64, sig_digits: i32) -> usize {
    let sig_digits = sig_digits.clamp(1, MAX_SIG_DIGITS);
    let leading_digit = if basis != 0.0 && basis.is_finite() {
        basis.abs().log10().floor() as i32
    } else {
        0
    };
    let where_ = leading_digit - sig_digits + 1;
    if where_ < 0 {
        (-where_) as usize
    } else {
        0
    }
}

/// Render a value, and optionally its error, name and unit.
///
/// Value and error share one precision, derived from the error when
/// `error_precision` is set or when a non-constant error is shown, and from
/// the value otherwise. If the error is zero the value is used instead.
pub fn format_value(display: &ValueDisplay<'_>, sig_digits: i32, opts: FormatOptions) -> String {
    let use_error = opts.error_precision || (opts.show_error && !display.constant);
    let basis = if use_error && display.error != 0.0 && display.error.is_finite() {
        display.error
    } else {
        display.value
    };
    let places = decimal_places(basis, sig_digits);

    let mut text = String::new();
    if opts.tex {
        text.push('$');
    }
    if opts.name {
        text.push_str(display.label);
        text.push_str(" = ");
    }
    if !opts.hide_value {
        text.push_str(&format!("{:.*}", places, display.value));
    }
    if opts.show_error && !display.constant {
        let separator = if opts.tex {
            "\\pm "
        } else if opts.rich_text {
            " ± "
        } else {
            " +/- "
        };
        text.push_str(separator);
        text.push_str(&format!("{:.*}", places, display.error));
    }
    if opts.show_unit && !display.unit.is_empty() {
        text.push(' ');
        text.push_str(display.unit);
    }
    if opts.tex {
        text.push('$');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_sets_precision() {
        let d = ValueDisplay::new(3.14159, 0.002);
        assert_eq!(format_value(&d, 1, FormatOptions::new().with_error()), "3.142 +/- 0.002");
        assert_eq!(format_value(&d, 2, FormatOptions::new().with_error()), "3.1416 +/- 0.0020");
        assert_eq!(
            format_value(&d, 1, FormatOptions::new().with_error().error_precision()),
            "3.142 +/- 0.002"
        );
    }

    #[test]
    fn test_value_sets_precision_without_error() {
        let d = ValueDisplay::new(3.14159, 0.002);
        assert_eq!(format_value(&d, 3, FormatOptions::new()), "3.14");
        assert_eq!(format_value(&d, 3, FormatOptions::new().error_precision()), "3.14159");
        let big = ValueDisplay::new(1234.5678, 0.0);
        assert_eq!(format_value(&big, 2, FormatOptions::new()), "1235");
    }

    #[test]
    fn test_sig_digits_floor_is_one() {
        let d = ValueDisplay::new(0.0456, 0.0);
        assert_eq!(format_value(&d, 0, FormatOptions::new()), "0.05");
        assert_eq!(format_value(&d, -4, FormatOptions::new()), "0.05");
    }

    #[test]
    fn test_hidden_value_keeps_other_segments() {
        let d = ValueDisplay {
            label: "mass",
            value: 1.0,
            error: 0.0,
            constant: false,
            unit: "GeV",
        };
        assert_eq!(format_value(&d, 1, FormatOptions::new().hide_value()), "");
        assert_eq!(
            format_value(&d, 1, FormatOptions::new().hide_value().with_name().with_unit()),
            "mass =  GeV"
        );
        assert_eq!(
            format_value(&d, 1, FormatOptions::new().hide_value().with_error()),
            " +/- 0"
        );
    }

    #[test]
    fn test_constant_suppresses_error() {
        let d = ValueDisplay {
            label: "c",
            value: 2.5,
            error: 0.1,
            constant: true,
            unit: "",
        };
        assert_eq!(format_value(&d, 2, FormatOptions::new().with_error()), "2.5");
    }

    #[test]
    fn test_tex_and_rich_text() {
        let d = ValueDisplay {
            label: "\\mu",
            value: 5.27934,
            error: 0.00012,
            constant: false,
            unit: "GeV",
        };
        assert_eq!(
            format_value(&d, 1, FormatOptions::parse("NEUX")),
            "$\\mu = 5.2793\\pm 0.0001 GeV$"
        );
        assert_eq!(
            format_value(&d, 2, FormatOptions::new().with_error().rich_text()),
            "5.27934 ± 0.00012"
        );
    }

    #[test]
    fn test_zero_basis_falls_back() {
        // zero error: precision comes from the value
        let d = ValueDisplay::new(12.345, 0.0);
        assert_eq!(format_value(&d, 3, FormatOptions::new().with_error()), "12.3 +/- 0.0");
        // zero value and zero error: magnitude 1
        let z = ValueDisplay::new(0.0, 0.0);
        assert_eq!(format_value(&z, 2, FormatOptions::new()), "0.0");
    }

    #[test]
    fn test_huge_sig_digits_are_capped() {
        assert_eq!(decimal_places(0.002, i32::MAX), 19);
        assert_eq!(decimal_places(0.002, i32::MIN), 3);
        let d = ValueDisplay::new(3.14159, 0.002);
        assert_eq!(
            format_value(&d, i32::MAX, FormatOptions::new().with_error()),
            format_value(&d, MAX_SIG_DIGITS, FormatOptions::new().with_error())
        );
    }

    #[test]
    fn test_parse_option_codes() {
        let opts = FormatOptions::parse("nhp?");
        assert!(opts.name && opts.hide_value && opts.error_precision);
        assert!(!opts.show_error && !opts.show_unit && !opts.tex && !opts.rich_text);
    }
}
