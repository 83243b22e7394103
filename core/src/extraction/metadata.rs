//! Header and global-index metadata extraction

use image::GrayImage;

use crate::error::Result;
use crate::extraction::fuzzy::{
    self, extract_one, find_near_match, fuzzy_regex, fuzzy_regex_middle_field, partial_ratio,
};
use crate::imaging::ops;
use crate::ocr::OcrEngine;
use crate::types::{
    CellValue, FieldSize, LayoutVersion, Metadata, Plot, EXTRACTION_FAILURE, PLOT_SIZE,
};

pub const LATERALITY_RIGHT: &str = "Right";
pub const LATERALITY_LEFT: &str = "Left";

pub const STRATEGY_FULL_THRESHOLD: &str = "Full Threshold";
pub const STRATEGY_SITA_STANDARD: &str = "SITA Standard";
pub const STRATEGY_SITA_FAST: &str = "SITA Fast";

/// Header windows, as `(y_ratio, y_size, x_ratio, x_size)`
///
/// The header is OCR'd in separate windows so each field is searched in
/// a small amount of text.
const HEADER_MAIN: (f64, f64, f64, f64) = (0.0, 0.27, 0.0, 0.33);
const HEADER_STIMULUS: (f64, f64, f64, f64) = (0.0, 0.27, 0.31, 0.547 - 0.31);
const HEADER_RX: (f64, f64, f64, f64) = (0.0, 0.27, 0.547, 0.83 - 0.547);
const HEADER_V3_MIDDLE: (f64, f64, f64, f64) = (0.0, 0.25, 0.403, 0.75 - 0.403);
const HEADER_DATES: (f64, f64, f64, f64) = (0.0, 0.27, 0.71, 1.0 - 0.71);

/// Per-layout window holding the MD/PSD/VFI block
fn metric_window(layout: LayoutVersion) -> (f64, f64, f64, f64) {
    match layout {
        LayoutVersion::V1 => (0.5, 0.15, 0.70, 0.35),
        LayoutVersion::V2 => (0.45, 0.2, 0.65, 0.35),
        LayoutVersion::V2Gpa => (0.19, 0.1, 0.60, 0.40),
        LayoutVersion::V3 | LayoutVersion::Dicom => (0.5, 0.15, 0.65, 0.35),
    }
}

/// Stray-mark thresholds for the metric window, far tighter than plot
/// cells because the text sits in a large mostly-white crop
const METRIC_STRAY_GLOBAL: f64 = 0.00001;
const METRIC_STRAY_RELATIVE: f64 = 0.000005;

fn ocr_lines(
    gray: &GrayImage,
    window: (f64, f64, f64, f64),
    ocr: &dyn OcrEngine,
) -> Result<Vec<String>> {
    let (y, ys, x, xs) = window;
    let slice = ops::preprocess(&ops::slice_fraction(gray, y, ys, x, xs));
    let text = ocr.recognize(&slice)?;
    Ok(text.lines().map(str::to_string).collect())
}

fn full_ratio(a: &str, b: &str) -> u32 {
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u32
}

fn is_v1_family(layout: LayoutVersion) -> bool {
    matches!(
        layout,
        LayoutVersion::V1 | LayoutVersion::V2 | LayoutVersion::V2Gpa
    )
}

/// Snaps a laterality string to "Right" or "Left"
fn clean_laterality(field: &str) -> String {
    if field == EXTRACTION_FAILURE {
        return field.to_string();
    }
    if full_ratio(LATERALITY_RIGHT, field) > full_ratio(LATERALITY_LEFT, field) {
        LATERALITY_RIGHT.to_string()
    } else {
        LATERALITY_LEFT.to_string()
    }
}

/// Strips the trailing unit from a value like "2.5 dB", tolerating one
/// misread character in the unit
fn strip_unit(field: &str, unit: &str) -> Option<String> {
    find_near_match(unit, field, 1).map(|m| field.chars().take(m.start).collect())
}

fn clean_fovea(field: String) -> String {
    if field == EXTRACTION_FAILURE {
        return field;
    }
    if partial_ratio("OFF", &field) > 85 {
        return "OFF".to_string();
    }
    match strip_unit(&field, "dB") {
        Some(v) => fuzzy::letter_o_to_zero(&fuzzy::remove_spaces(&v)),
        None => {
            log::warn!("unable to extract fovea value from {:?}", field);
            field
        }
    }
}

fn clean_pupil_diameter(field: String) -> String {
    if field == EXTRACTION_FAILURE {
        return field;
    }
    match find_near_match("mm", &field, 0) {
        Some(m) => {
            let v: String = field.chars().take(m.start).collect();
            fuzzy::remove_spaces(&v)
        }
        None => {
            log::warn!("unable to extract pupil diameter from {:?}", field);
            String::new()
        }
    }
}

/// Normalizes the refraction string to "<sph>DS <cyl>DC X <axis>"
///
/// The printed form is "+1.25 DS +0.50 DC X 90" with the unit letters
/// frequently misread (DS as OS, DC as OC or 0C, X as K).
fn clean_rx(field: String) -> String {
    if field == EXTRACTION_FAILURE {
        return field;
    }
    let re = match regex::Regex::new(r"(.*)[DO]S (.*)[DO0]C [XxK]*\s*(\d*)") {
        Ok(re) => re,
        Err(_) => return field,
    };
    let Some(caps) = re.captures(&field) else {
        log::warn!("unable to parse refraction from {:?}", field);
        return field;
    };
    let sphere = fuzzy::remove_non_numeric(
        &fuzzy::clean_punctuation_to_period(&fuzzy::remove_spaces(&caps[1])),
        &['.', '+', '-'],
    );
    let cyl = fuzzy::remove_non_numeric(
        &fuzzy::clean_punctuation_to_period(&fuzzy::remove_spaces(&caps[2])),
        &['.', '+', '-'],
    );
    let axis = fuzzy::remove_non_numeric(&fuzzy::remove_spaces(&caps[3]), &[]);

    if !cyl.is_empty() {
        format!("{}DS {}DC X {}", sphere, cyl, axis)
    } else if !sphere.is_empty() {
        format!("{}DS", sphere)
    } else {
        "+0.00DS".to_string()
    }
}

/// Picks the field size whose test title best matches a header line
fn detect_field_size(lines: &[String]) -> String {
    let sizes = [FieldSize::Size10_2, FieldSize::Size24_2, FieldSize::Size30_2];
    let mut best = EXTRACTION_FAILURE.to_string();
    let mut best_score = 0;
    for size in sizes {
        let label = format!("Central {} Threshold Test", size.as_str());
        if let Some((_, score)) = extract_one(&label, lines, partial_ratio) {
            if score > best_score {
                best = size.as_str().to_string();
                best_score = score;
            }
        }
    }
    best
}

/// Snaps the strategy field to one of the known test strategies
pub(crate) fn detect_strategy(field: &str) -> String {
    let strategies = [
        STRATEGY_FULL_THRESHOLD,
        STRATEGY_SITA_STANDARD,
        STRATEGY_SITA_FAST,
    ];
    let mut best = EXTRACTION_FAILURE.to_string();
    let mut best_score = 0;
    for strategy in strategies {
        let score = partial_ratio(strategy, field);
        if score > best_score {
            best = strategy.to_string();
            best_score = score;
        }
    }
    best
}

/// Reads every header field off the report page
///
/// The layout decides both where each field sits and which label the
/// analyzer printed next to it. MD/PSD/VFI live lower on the page and are
/// extracted separately by [`extract_metric_metadata`].
pub fn extract_header_metadata(
    gray: &GrayImage,
    layout: LayoutVersion,
    ocr: &dyn OcrEngine,
) -> Result<Metadata> {
    let mut header_main = ocr_lines(gray, HEADER_MAIN, ocr)?;
    let mut header_middle = if is_v1_family(layout) {
        let mut lines = ocr_lines(gray, HEADER_STIMULUS, ocr)?;
        lines.extend(ocr_lines(gray, HEADER_RX, ocr)?);
        lines
    } else {
        ocr_lines(gray, HEADER_V3_MIDDLE, ocr)?
    };
    let mut header_dates = ocr_lines(gray, HEADER_DATES, ocr)?;

    let mut md = Metadata {
        layout_version: layout.as_str().to_string(),
        ..Metadata::default()
    };

    if is_v1_family(layout) {
        md.name = fuzzy_regex("Name: ", &mut header_main);
        md.id = fuzzy::remove_spaces(&fuzzy_regex("ID: ", &mut header_main));
    } else {
        md.id = fuzzy::remove_spaces(&fuzzy_regex("Patient ID: ", &mut header_main));
        md.name = fuzzy_regex("Patient: ", &mut header_main);
    }

    md.dob = if is_v1_family(layout) {
        let field = fuzzy_regex("DOB: ", &mut header_dates);
        fuzzy::remove_non_numeric(&fuzzy::remove_spaces(&field), &['-', '/'])
    } else {
        fuzzy_regex("Date of Birth:", &mut header_main)
    };

    md.test_date = if is_v1_family(layout) {
        fuzzy::remove_spaces(&fuzzy_regex("Date: ", &mut header_dates))
    } else {
        fuzzy_regex("Date: ", &mut header_dates)
    };

    md.laterality = if is_v1_family(layout) {
        clean_laterality(&fuzzy_regex("Eye: ", &mut header_dates))
    } else {
        // v3 prints the eye as a bare OD/OS token in the header block
        match extract_one("| OD |", &header_main, partial_ratio) {
            Some((line, _)) => {
                if partial_ratio("OD", line) > partial_ratio("OS", line) {
                    LATERALITY_RIGHT.to_string()
                } else {
                    LATERALITY_LEFT.to_string()
                }
            }
            None => EXTRACTION_FAILURE.to_string(),
        }
    };

    md.fovea = clean_fovea(fuzzy_regex("Fovea:", &mut header_main));

    let fl = fuzzy_regex("Fixation Losses: ", &mut header_main);
    md.fixation_loss = fuzzy::remove_non_numeric(&fuzzy::remove_spaces(&fl), &['.', '/']);
    md.false_pos =
        fuzzy::letter_o_to_zero(&fuzzy::remove_spaces(&fuzzy_regex(
            "False POS Errors: ",
            &mut header_main,
        )));
    md.false_neg =
        fuzzy::letter_o_to_zero(&fuzzy::remove_spaces(&fuzzy_regex(
            "False NEG Errors: ",
            &mut header_main,
        )));

    md.field_size = if is_v1_family(layout) {
        detect_field_size(&header_main)
    } else {
        detect_field_size(&header_dates)
    };

    md.strategy = detect_strategy(&fuzzy_regex("Strategy: ", &mut header_middle));

    let duration = fuzzy_regex("Test Duration: ", &mut header_main);
    let duration = duration
        .split_whitespace()
        .next()
        .unwrap_or(duration.as_str())
        .to_string();
    md.test_duration = fuzzy::remove_non_numeric(&duration, &[':']);

    md.pupil_diameter =
        clean_pupil_diameter(fuzzy_regex("Pupil Diameter: ", &mut header_middle));

    let rx = fuzzy_regex("Rx:", &mut header_middle);
    md.rx = if is_v1_family(layout) { clean_rx(rx) } else { rx };

    Ok(md)
}

/// Reads MD, PSD, and VFI from the global indices block
///
/// `field_size` comes from the header pass; v3 layouts tag the MD/PSD
/// labels with it.
pub fn extract_metric_metadata(
    gray: &GrayImage,
    layout: LayoutVersion,
    field_size: &str,
    ocr: &dyn OcrEngine,
) -> Result<(String, String, String)> {
    let (y, ys, x, xs) = metric_window(layout);
    let slice = ops::binarize_adaptive(&ops::slice_fraction(gray, y, ys, x, xs), 5, 5);
    let slice = ops::delete_stray_marks(&slice, METRIC_STRAY_GLOBAL, METRIC_STRAY_RELATIVE);
    let text = ocr.recognize(&slice)?;
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();

    let md_size_prefix = format!("MD{}:", field_size);
    let psd_size_prefix = format!("PSD{}:", field_size);

    let md = if is_v1_family(layout) {
        fuzzy_regex_middle_field(&["MD"], "dB", &mut lines)
    } else {
        fuzzy_regex_middle_field(&[md_size_prefix.as_str(), "MD:"], "dB", &mut lines)
    };
    let md = fuzzy::add_decimal_if_absent(&fuzzy::remove_non_numeric(
        &fuzzy::clean_minus_sign(&fuzzy::remove_spaces(&fuzzy::clean_punctuation_to_period(&md))),
        &['.', '-'],
    ));

    let psd = if is_v1_family(layout) {
        fuzzy_regex_middle_field(&["PSD"], "dB", &mut lines)
    } else {
        fuzzy_regex_middle_field(&[psd_size_prefix.as_str(), "PSD:"], "dB", &mut lines)
    };
    let psd = fuzzy::add_decimal_if_absent(&fuzzy::remove_spaces(
        &fuzzy::clean_punctuation_to_period(&psd),
    ));

    let vfi = if is_v1_family(layout) {
        fuzzy_regex_middle_field(&["VFI"], "%", &mut lines)
    } else {
        fuzzy_regex("VFI: ", &mut lines)
    };
    let vfi = fuzzy::remove_spaces(&fuzzy::clean_punctuation_to_period(&vfi));

    Ok((md, psd, vfi))
}

/// Derives field size and laterality from the total deviation plot layout
///
/// The populated cells of each field size form a distinctive footprint;
/// the 24-2 and 30-2 footprints are also chiral, which pins laterality.
/// Returns what could be confirmed, which overrides the OCR'd header
/// fields.
pub fn field_size_laterality_from_plot(
    plot: &Plot<CellValue>,
) -> (Option<FieldSize>, Option<&'static str>) {
    let sizes = [FieldSize::Size24_2, FieldSize::Size10_2, FieldSize::Size30_2];
    for size in sizes {
        for laterality in [LATERALITY_RIGHT, LATERALITY_LEFT] {
            if plot_matches_mask(plot, size, laterality) {
                let lat = (size != FieldSize::Size10_2).then_some(laterality);
                return (Some(size), lat);
            }
        }
    }
    (None, None)
}

fn plot_matches_mask(plot: &Plot<CellValue>, size: FieldSize, laterality: &str) -> bool {
    let mask = size.mask();
    let mirror = laterality == LATERALITY_LEFT;
    for row in 0..PLOT_SIZE {
        for col in 0..PLOT_SIZE {
            let mask_col = if mirror { PLOT_SIZE - 1 - col } else { col };
            if !mask[row][mask_col] && plot.get(col, row) != CellValue::Blank {
                return false;
            }
        }
    }
    true
}
