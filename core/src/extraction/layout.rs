//! Report layout classification

use image::GrayImage;

use crate::error::Result;
use crate::extraction::fuzzy::partial_ratio;
use crate::imaging::ops;
use crate::ocr::OcrEngine;
use crate::types::LayoutVersion;

/// Header window holding the patient block in every layout
const HEADER_SLICE: (f64, f64, f64, f64) = (0.0, 0.15, 0.0, 0.31);
/// Window where the GPA notice appears on split-page reports
const GPA_SLICE: (f64, f64, f64, f64) = (0.28, 0.45, 0.60, 0.40);

/// Scans narrower than this (before upscaling) are the early v1 layout
const V1_WIDTH_CUTOFF: u32 = 1400;

/// Fuzzy score above which a marker phrase counts as present
const MARKER_SCORE_CUTOFF: u32 = 50;

/// Classifies the report layout
///
/// Looks for "Date of Birth" in the header (v3 only prints it there); for
/// older layouts the original scan width separates v1 from v2, and the GPA
/// notice separates v2_gpa from plain v2. `original_width` is the scan
/// width before any upscaling.
pub fn classify_layout(
    img: &GrayImage,
    original_width: u32,
    ocr: &dyn OcrEngine,
) -> Result<LayoutVersion> {
    let (y, ys, x, xs) = HEADER_SLICE;
    let header = ops::slice_fraction(img, y, ys, x, xs);
    let header_text = ocr.recognize(&ops::preprocess(&header))?;

    let dob_score = partial_ratio("Date of Birth", &header_text);
    if dob_score > MARKER_SCORE_CUTOFF {
        log::debug!("layout v3 (dob score {})", dob_score);
        return Ok(LayoutVersion::V3);
    }

    if original_width < V1_WIDTH_CUTOFF {
        log::debug!("layout v1 (width {})", original_width);
        return Ok(LayoutVersion::V1);
    }

    let (y, ys, x, xs) = GPA_SLICE;
    let gpa = ops::slice_fraction(img, y, ys, x, xs);
    let gpa_text = ocr.recognize(&ops::preprocess(&gpa))?;
    let gpa_score = partial_ratio("See GPA printout", &gpa_text);
    if gpa_score > MARKER_SCORE_CUTOFF {
        log::debug!("layout v2_gpa (gpa score {})", gpa_score);
        Ok(LayoutVersion::V2Gpa)
    } else {
        Ok(LayoutVersion::V2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::FakeOcr;
    use image::Luma;

    fn gray(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([255]))
    }

    #[test]
    fn test_v3_from_dob_header() {
        let ocr = FakeOcr::new(&["Patient: DOE  Date of Birth: 01-02-1950"]);
        let layout = classify_layout(&gray(2500, 3000), 2200, &ocr).unwrap();
        assert_eq!(layout, LayoutVersion::V3);
    }

    #[test]
    fn test_v3_survives_ocr_noise() {
        let ocr = FakeOcr::new(&["Date of Blrth: 01-02-1950"]);
        let layout = classify_layout(&gray(2500, 3000), 2200, &ocr).unwrap();
        assert_eq!(layout, LayoutVersion::V3);
    }

    #[test]
    fn test_v1_from_narrow_scan() {
        let ocr = FakeOcr::new(&["STATPAC header text"]);
        let layout = classify_layout(&gray(2500, 3000), 1100, &ocr).unwrap();
        assert_eq!(layout, LayoutVersion::V1);
    }

    #[test]
    fn test_v2_gpa_from_notice() {
        let ocr = FakeOcr::new(&["header text", "See GPA printout for details"]);
        let layout = classify_layout(&gray(2500, 3000), 2200, &ocr).unwrap();
        assert_eq!(layout, LayoutVersion::V2Gpa);
    }

    #[test]
    fn test_v2_default() {
        let ocr = FakeOcr::new(&["header text", "pattern deviation"]);
        let layout = classify_layout(&gray(2500, 3000), 2200, &ocr).unwrap();
        assert_eq!(layout, LayoutVersion::V2);
    }
}
