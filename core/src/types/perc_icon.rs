use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a percentile (probability) plot
///
/// Humphrey reports render deviation probabilities as icons: a small dot
/// for within-normal-limits, stippled boxes for p < 5%, 2%, 1%, and a
/// solid box for p < 0.5%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PercIcon {
    /// No icon at this grid position
    #[default]
    Blank,
    /// Within normal limits (the small dot)
    Normal,
    /// p < 5%
    FivePercent,
    /// p < 2%
    TwoPercent,
    /// p < 1%
    OnePercent,
    /// p < 0.5% (solid box)
    HalfPercent,
    /// Recognition failed for this cell
    Unreadable,
}

impl PercIcon {
    /// Single-character display forms, in classification order
    pub const ALL: [PercIcon; 7] = [
        PercIcon::Blank,
        PercIcon::Normal,
        PercIcon::FivePercent,
        PercIcon::TwoPercent,
        PercIcon::OnePercent,
        PercIcon::HalfPercent,
        PercIcon::Unreadable,
    ];

    /// Parses the display character back into an icon
    pub fn from_display(s: &str) -> Option<Self> {
        match s {
            " " | "" => Some(PercIcon::Blank),
            "." => Some(PercIcon::Normal),
            "5" => Some(PercIcon::FivePercent),
            "2" => Some(PercIcon::TwoPercent),
            "1" => Some(PercIcon::OnePercent),
            "x" => Some(PercIcon::HalfPercent),
            "?" => Some(PercIcon::Unreadable),
            _ => None,
        }
    }

    /// Returns whether this cell holds no icon
    pub fn is_blank(&self) -> bool {
        matches!(self, PercIcon::Blank)
    }
}

impl fmt::Display for PercIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            PercIcon::Blank => " ",
            PercIcon::Normal => ".",
            PercIcon::FivePercent => "5",
            PercIcon::TwoPercent => "2",
            PercIcon::OnePercent => "1",
            PercIcon::HalfPercent => "x",
            PercIcon::Unreadable => "?",
        };
        write!(f, "{}", c)
    }
}
