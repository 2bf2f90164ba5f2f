//! Vocabulary of the two text channels shared with the XR driver.
//!
//! The driver reads commands from the **control channel** and publishes its
//! status on the **state channel**.  Both are plain line-oriented
//! `key=value` text; this module owns the formatting of the former and the
//! parsing of the latter.
//!
//! # Control line
//!
//! ```text
//! display_distance=1.05
//! ```
//!
//! # State file
//!
//! ```text
//! device_connected=true
//! firmware=1.2.3
//! ```

use std::collections::HashMap;
use std::fmt;

/// Every key the driver understands on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    DisplayDistance,
    FollowMode,
    FollowThreshold,
    WidescreenMode,
    Recenter,
    DisableXr,
}

impl ControlKey {
    /// The literal key written before the `=`.
    pub fn as_str(self) -> &'static str {
        match self {
            ControlKey::DisplayDistance => "display_distance",
            ControlKey::FollowMode => "follow_mode",
            ControlKey::FollowThreshold => "follow_threshold",
            ControlKey::WidescreenMode => "widescreen_mode",
            ControlKey::Recenter => "recenter",
            ControlKey::DisableXr => "disable_xr",
        }
    }
}

impl fmt::Display for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `key=value` command destined for the control channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlLine {
    pub key: ControlKey,
    pub value: String,
}

impl ControlLine {
    /// A line carrying a floating-point value.
    pub fn float(key: ControlKey, value: f64) -> Self {
        Self {
            key,
            value: format_float(value),
        }
    }

    /// A line carrying a `true` / `false` literal.
    pub fn flag(key: ControlKey, value: bool) -> Self {
        Self {
            key,
            value: if value { "true" } else { "false" }.to_string(),
        }
    }

    /// The exact bytes written to the channel, trailing newline included.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for ControlLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Render a float in its shortest round-trip form, keeping a fractional
/// part for whole numbers (`1.0`, not `1`).
///
/// Magnitudes below `1e-4` or from `1e16` up use a signed exponent of at
/// least two digits (`1e-05`, `1e+16`).
fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

/// Flat mapping parsed from the state channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMap(HashMap<String, String>);

impl StateMap {
    /// Look up a raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of parsed entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` only if `device_connected` is present and equals `"true"`
    /// ignoring ASCII case.
    pub fn device_connected(&self) -> bool {
        self.get("device_connected")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Parse the contents of the state channel.
///
/// Lines without `=` are skipped.  A line is split on its **first** `=`, so
/// `build=a=b` yields key `build` and value `a=b`.  Later duplicates win.
pub fn parse_state(text: &str) -> StateMap {
    let entries = text
        .lines()
        .map(str::trim)
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    StateMap(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_line_keeps_fraction() {
        let line = ControlLine::float(ControlKey::DisplayDistance, 1.0);
        assert_eq!(line.to_line(), "display_distance=1.0\n");
        let line = ControlLine::float(ControlKey::FollowThreshold, 0.1);
        assert_eq!(line.to_line(), "follow_threshold=0.1\n");
        let line = ControlLine::float(ControlKey::DisplayDistance, 1.05);
        assert_eq!(line.to_string(), "display_distance=1.05");
    }

    #[test]
    fn float_exponent_is_signed_and_padded() {
        assert_eq!(format_float(1e-5), "1e-05");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(-2.5e100), "-2.5e+100");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(
            ControlLine::float(ControlKey::DisplayDistance, 1e-5).to_line(),
            "display_distance=1e-05\n"
        );
    }

    #[test]
    fn flag_line_uses_lowercase_literals() {
        assert_eq!(
            ControlLine::flag(ControlKey::WidescreenMode, true).to_line(),
            "widescreen_mode=true\n"
        );
        assert_eq!(
            ControlLine::flag(ControlKey::FollowMode, false).to_line(),
            "follow_mode=false\n"
        );
    }

    #[test]
    fn parse_skips_lines_without_separator() {
        let map = parse_state("device_connected=true\ngarbage\n\n  \nmode=3d\n");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("mode"), Some("3d"));
    }

    #[test]
    fn parse_splits_on_first_equals() {
        let map = parse_state("build=abc=def\n");
        assert_eq!(map.get("build"), Some("abc=def"));
    }

    #[test]
    fn parse_trims_whitespace() {
        let map = parse_state("  device_connected = true  \r\n");
        assert_eq!(map.get("device_connected"), Some("true"));
        assert!(map.device_connected());
    }

    #[test]
    fn device_connected_is_case_insensitive() {
        assert!(parse_state("device_connected=TRUE").device_connected());
        assert!(parse_state("device_connected=True\n").device_connected());
    }

    #[test]
    fn device_connected_false_or_absent() {
        assert!(!parse_state("device_connected=false").device_connected());
        assert!(!parse_state("device_connected=yes").device_connected());
        assert!(!parse_state("other=true").device_connected());
        assert!(!parse_state("").device_connected());
    }

    #[test]
    fn later_duplicate_wins() {
        let map = parse_state("device_connected=false\ndevice_connected=true\n");
        assert!(map.device_connected());
    }
}
