use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel code for a grid position that carries no value
pub const SENTINEL_NO_VALUE: i32 = -99;
/// Sentinel code for a recognition failure
pub const SENTINEL_FAILURE: i32 = -98;
/// Sentinel code for a below-threshold measurement (`<0`)
pub const SENTINEL_BELOW_THRESHOLD: i32 = -97;

/// Inclusive range for raw sensitivity values, in dB
pub const RAW_VALUE_RANGE: (i32, i32) = (0, 50);
/// Inclusive range for deviation values, in dB
pub const DEVIATION_VALUE_RANGE: (i32, i32) = (-50, 50);

/// A single cell of a value plot (raw sensitivity or deviation)
///
/// Recognition failures are values, not errors: one unreadable cell must
/// never abort extraction of the rest of the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellValue {
    /// A recognized number, in dB
    Value(i32),
    /// No value at this grid position
    #[default]
    Blank,
    /// Recognition failed for this cell
    Unreadable,
    /// Below-threshold measurement, shown as `<0` on raw plots
    BelowThreshold,
}

impl CellValue {
    /// Converts a numeric sentinel code into a cell value
    ///
    /// Codes outside the sentinel set are taken as plain values.
    pub fn from_sentinel(code: i32) -> Self {
        match code {
            SENTINEL_NO_VALUE => CellValue::Blank,
            SENTINEL_FAILURE => CellValue::Unreadable,
            SENTINEL_BELOW_THRESHOLD => CellValue::BelowThreshold,
            v => CellValue::Value(v),
        }
    }

    /// Converts this cell value into its numeric sentinel code
    pub fn to_sentinel(&self) -> i32 {
        match self {
            CellValue::Value(v) => *v,
            CellValue::Blank => SENTINEL_NO_VALUE,
            CellValue::Unreadable => SENTINEL_FAILURE,
            CellValue::BelowThreshold => SENTINEL_BELOW_THRESHOLD,
        }
    }

    /// Parses the display form back into a cell value
    ///
    /// Returns `None` for strings that are not a valid cell display.
    pub fn from_display(s: &str) -> Option<Self> {
        match s.trim() {
            "" => Some(CellValue::Blank),
            "?" => Some(CellValue::Unreadable),
            "<0" => Some(CellValue::BelowThreshold),
            other => other.parse::<i32>().ok().map(CellValue::Value),
        }
    }

    /// Returns whether this cell holds no value
    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }

    /// Clamps a recognized raw sensitivity value to its valid range
    pub fn clamp_raw(value: i32) -> i32 {
        value.clamp(RAW_VALUE_RANGE.0, RAW_VALUE_RANGE.1)
    }

    /// Clamps a recognized deviation value to its valid range
    pub fn clamp_deviation(value: i32) -> i32 {
        value.clamp(DEVIATION_VALUE_RANGE.0, DEVIATION_VALUE_RANGE.1)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Value(v) => write!(f, "{}", v),
            CellValue::Blank => write!(f, " "),
            CellValue::Unreadable => write!(f, "?"),
            CellValue::BelowThreshold => write!(f, "<0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_round_trip() {
        let cells = [
            CellValue::Value(26),
            CellValue::Value(-7),
            CellValue::Value(0),
            CellValue::Blank,
            CellValue::Unreadable,
            CellValue::BelowThreshold,
        ];
        for cell in cells {
            assert_eq!(CellValue::from_sentinel(cell.to_sentinel()), cell);
        }
    }

    #[test]
    fn test_sentinel_codes() {
        assert_eq!(CellValue::Blank.to_sentinel(), -99);
        assert_eq!(CellValue::Unreadable.to_sentinel(), -98);
        assert_eq!(CellValue::BelowThreshold.to_sentinel(), -97);
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["26", "-7", "0", "", "?", "<0"] {
            let cell = CellValue::from_display(s).unwrap();
            assert_eq!(
                CellValue::from_display(&cell.to_string()).unwrap(),
                cell
            );
        }
    }

    #[test]
    fn test_from_display_rejects_garbage() {
        assert_eq!(CellValue::from_display("abc"), None);
        assert_eq!(CellValue::from_display("2x"), None);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(CellValue::clamp_raw(-3), 0);
        assert_eq!(CellValue::clamp_raw(61), 50);
        assert_eq!(CellValue::clamp_raw(33), 33);
        assert_eq!(CellValue::clamp_deviation(-61), -50);
        assert_eq!(CellValue::clamp_deviation(55), 50);
        assert_eq!(CellValue::clamp_deviation(-12), -12);
    }
}
