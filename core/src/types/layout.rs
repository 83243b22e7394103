use std::fmt;

use serde::{Deserialize, Serialize};

/// Report layout generations produced by the Humphrey analyzer line
///
/// The layout version drives which crop fractions and field labels the
/// extractors use. `Dicom` marks records ingested from an OPV dataset
/// rather than a raster report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutVersion {
    /// Early narrow single-page layout
    V1,
    /// Wide layout without a GPA panel
    V2,
    /// Wide layout sharing the page with a "See GPA printout" panel
    V2Gpa,
    /// Current layout with a "Date of Birth" header field
    V3,
    /// Ingested from DICOM, no raster layout
    Dicom,
}

impl LayoutVersion {
    /// Returns the canonical serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutVersion::V1 => "v1",
            LayoutVersion::V2 => "v2",
            LayoutVersion::V2Gpa => "v2_gpa",
            LayoutVersion::V3 => "v3",
            LayoutVersion::Dicom => "dicom",
        }
    }

    /// Parses the canonical serialized name
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "v1" => Some(LayoutVersion::V1),
            "v2" => Some(LayoutVersion::V2),
            "v2_gpa" => Some(LayoutVersion::V2Gpa),
            "v3" => Some(LayoutVersion::V3),
            "dicom" => Some(LayoutVersion::Dicom),
            _ => None,
        }
    }
}

impl fmt::Display for LayoutVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for v in [
            LayoutVersion::V1,
            LayoutVersion::V2,
            LayoutVersion::V2Gpa,
            LayoutVersion::V3,
            LayoutVersion::Dicom,
        ] {
            assert_eq!(LayoutVersion::from_str(v.as_str()), Some(v));
        }
    }

    #[test]
    fn test_from_str_unknown() {
        assert_eq!(LayoutVersion::from_str("v4"), None);
    }
}
