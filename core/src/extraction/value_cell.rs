//! Numeric cell recognition for value plots

use image::GrayImage;

use crate::imaging::ops::{self, BoundingBox};
use crate::imaging::TemplateStore;
use crate::types::CellValue;

/// Stray-mark thresholds (fraction of cell, fraction of largest component)
const STRAY_GLOBAL: f64 = 0.005;
const STRAY_RELATIVE_RAW: f64 = 0.1;
const STRAY_RELATIVE_DEVIATION: f64 = 0.01;

/// Glyph boxes wider than this (relative to line height) hold fused digits
const MAX_GLYPH_W_H_RATIO: f64 = 0.7;
/// Nominal width/height ratio of a single printed digit
const DIGIT_W_H_RATIO: f64 = 0.575;

/// Difference score under which a leading glyph reads as `<`
const LESS_THAN_THRESHOLD: f64 = 0.4;
/// Correlation above which a leading glyph reads as a minus sign
const MINUS_THRESHOLD: f64 = 0.55;
/// Correlation under which a digit match is retried on the backup image
const DIGIT_RETRY_THRESHOLD: f64 = 0.5;
/// Correlation under which even the backup match is discarded
const DIGIT_FAILURE_THRESHOLD: f64 = 0.35;

/// Which value plot a cell came from; raw cells carry `<0` and no signs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Raw,
    Deviation,
}

impl ValueKind {
    fn stray_relative(self) -> f64 {
        match self {
            ValueKind::Raw => STRAY_RELATIVE_RAW,
            ValueKind::Deviation => STRAY_RELATIVE_DEVIATION,
        }
    }

    fn clamp(self, v: i32) -> CellValue {
        match self {
            ValueKind::Raw => CellValue::Value(CellValue::clamp_raw(v)),
            ValueKind::Deviation => CellValue::Value(CellValue::clamp_deviation(v)),
        }
    }
}

/// Splits a cropped cell into single-glyph slices, left to right
///
/// Kerned digits often merge into one connected component; a component
/// wider than a digit is cut into its expected number of equal slices.
fn chop_into_glyphs(img: &GrayImage) -> Vec<GrayImage> {
    let line_height = f64::from(img.height());
    let mut boxes: Vec<BoundingBox> = ops::external_ink_contours(img)
        .iter()
        .map(ops::contour_bounding_box)
        .collect();
    boxes.sort_by_key(|b| b.x);

    let mut glyphs = Vec::new();
    for b in boxes {
        if f64::from(b.width) / line_height > MAX_GLYPH_W_H_RATIO {
            let n = (((f64::from(b.width) / line_height) / DIGIT_W_H_RATIO + 0.15).round()
                as usize)
                .max(1);
            let step = b.width / n as u32;
            for i in 0..n {
                let x = b.x + step * i as u32;
                let w = step.min(img.width().saturating_sub(x)).max(1);
                glyphs.push(image::imageops::crop_imm(img, x, 0, w, img.height()).to_image());
            }
        } else {
            glyphs.push(
                image::imageops::crop_imm(img, b.x, 0, b.width.max(1), img.height()).to_image(),
            );
        }
    }
    glyphs
}

/// Trims a glyph slice to its ink, dropping single-pixel stragglers on
/// the vertical edges
fn clean_glyph(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let trimmed = if w > 2 {
        image::imageops::crop_imm(img, 1, 0, w - 2, h).to_image()
    } else {
        img.clone()
    };
    ops::crop_white_border(&trimmed)
}

fn is_blank(img: &GrayImage) -> bool {
    ops::content_bounding_box(img).is_none()
}

/// Disambiguates 1 from 4 by the width of the glyph's lower half
///
/// A 4's crossbar spans most of the glyph width; a 1 leaves the lower
/// half a narrow stem.
fn refine_one_vs_four(glyph: &GrayImage, digit: u8) -> u8 {
    if digit != 1 && digit != 4 {
        return digit;
    }
    let lower = ops::slice_fraction(glyph, 0.5, 0.5, 0.0, 1.0);
    let widest = ops::external_ink_contours(&lower)
        .iter()
        .map(|c| ops::contour_bounding_box(c).width)
        .max()
        .unwrap_or(0);
    if f64::from(widest) > f64::from(glyph.width()) * 0.8 {
        4
    } else {
        1
    }
}

fn read_digit(
    store: &TemplateStore,
    primary: &GrayImage,
    backup: Option<&GrayImage>,
    allow_zero: bool,
) -> Option<u8> {
    let glyph = clean_glyph(primary);
    if is_blank(&glyph) {
        return None;
    }
    let (mut digit, mut score) = store.best_digit_match(&glyph, allow_zero);
    let mut chosen = glyph;
    if score < DIGIT_RETRY_THRESHOLD {
        if let Some(backup) = backup {
            let backup_glyph = clean_glyph(backup);
            if !is_blank(&backup_glyph) {
                let (backup_digit, backup_score) =
                    store.best_digit_match(&backup_glyph, allow_zero);
                if backup_score > score {
                    digit = backup_digit;
                    score = backup_score;
                    chosen = backup_glyph;
                }
            }
        }
    }
    if score < DIGIT_FAILURE_THRESHOLD {
        return None;
    }
    Some(refine_one_vs_four(&chosen, digit))
}

/// Reads the numeric value printed in one plot cell
///
/// `primary` and `backup` are the same cell under the two binarization
/// passes; the backup is consulted when the primary match is weak.
pub fn recognize_value_cell(
    primary: &GrayImage,
    backup: &GrayImage,
    kind: ValueKind,
    store: &TemplateStore,
) -> CellValue {
    let cleaned = ops::delete_stray_marks(primary, STRAY_GLOBAL, kind.stray_relative());
    let cleaned_backup = ops::delete_stray_marks(backup, STRAY_GLOBAL, kind.stray_relative());

    let Some(bb) = ops::content_bounding_box(&cleaned) else {
        return CellValue::Blank;
    };
    let cropped =
        image::imageops::crop_imm(&cleaned, bb.x, bb.y, bb.width, bb.height).to_image();
    let cropped_backup = {
        let bw = bb.width.min(cleaned_backup.width().saturating_sub(bb.x)).max(1);
        let bh = bb
            .height
            .min(cleaned_backup.height().saturating_sub(bb.y))
            .max(1);
        image::imageops::crop_imm(&cleaned_backup, bb.x, bb.y, bw, bh).to_image()
    };

    let glyphs = chop_into_glyphs(&cropped);
    let glyphs_backup = chop_into_glyphs(&cropped_backup);
    if glyphs.is_empty() {
        return CellValue::Blank;
    }

    // Below-threshold marker, printed only on raw plots as "<0".
    // Sign glyphs are matched at full line height so their vertical
    // placement contributes to the score.
    if kind == ValueKind::Raw && glyphs.len() == 2 {
        let primary_hit = store.less_than_score(&glyphs[0]) < LESS_THAN_THRESHOLD;
        let backup_hit = glyphs_backup
            .first()
            .map(|g| store.less_than_score(g) < LESS_THAN_THRESHOLD)
            .unwrap_or(false);
        if primary_hit || backup_hit {
            log::debug!("cell reads as below-threshold marker");
            return CellValue::BelowThreshold;
        }
    }

    let mut digits = glyphs;
    let mut digits_backup = glyphs_backup;
    let mut sign = 1i32;
    if kind == ValueKind::Deviation {
        if digits.len() == 2 && store.minus_score(&digits[0]) > MINUS_THRESHOLD {
            log::debug!("detected minus sign");
            sign = -1;
            digits.remove(0);
            if !digits_backup.is_empty() {
                digits_backup.remove(0);
            }
        } else if digits.len() == 3 {
            // Three glyphs only occur as a sign plus two digits
            log::debug!("assuming minus sign");
            sign = -1;
            digits.remove(0);
            if !digits_backup.is_empty() {
                digits_backup.remove(0);
            }
        }
    }

    let count = digits.len();
    let mut running = 0i32;
    for (i, glyph) in digits.iter().enumerate() {
        let allow_zero = (i == count - 1 && count > 1) || (count == 1 && sign == 1);
        let backup = digits_backup.get(i);
        match read_digit(store, glyph, backup, allow_zero) {
            Some(d) => running = 10 * running + i32::from(d),
            None => return CellValue::Unreadable,
        }
    }

    kind.clamp(running * sign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::templates::test_glyphs::{
        digit_glyph, less_than_glyph, minus_glyph, test_store,
    };
    use image::{GenericImage, Luma};

    /// Lays glyphs out left to right on a white canvas with margins
    fn compose_cell(glyphs: &[GrayImage]) -> GrayImage {
        let gap = 4u32;
        let margin = 8u32;
        let h = glyphs.iter().map(|g| g.height()).max().unwrap_or(1);
        let w: u32 =
            glyphs.iter().map(|g| g.width() + gap).sum::<u32>() + 2 * margin;
        let mut cell = GrayImage::from_pixel(w, h + 2 * margin, Luma([255]));
        let mut x = margin;
        for g in glyphs {
            cell.copy_from(g, x, margin).unwrap();
            x += g.width() + gap;
        }
        cell
    }

    fn recognize(glyphs: &[GrayImage], kind: ValueKind) -> CellValue {
        let cell = compose_cell(glyphs);
        recognize_value_cell(&cell, &cell, kind, &test_store())
    }

    #[test]
    fn test_blank_cell() {
        let cell = GrayImage::from_pixel(60, 40, Luma([255]));
        let got = recognize_value_cell(&cell, &cell, ValueKind::Raw, &test_store());
        assert_eq!(got, CellValue::Blank);
    }

    #[test]
    fn test_single_digit_raw() {
        assert_eq!(recognize(&[digit_glyph(7)], ValueKind::Raw), CellValue::Value(7));
    }

    #[test]
    fn test_two_digit_raw() {
        let got = recognize(&[digit_glyph(2), digit_glyph(6)], ValueKind::Raw);
        assert_eq!(got, CellValue::Value(26));
    }

    #[test]
    fn test_below_threshold_raw() {
        let got = recognize(&[less_than_glyph(), digit_glyph(0)], ValueKind::Raw);
        assert_eq!(got, CellValue::BelowThreshold);
    }

    #[test]
    fn test_less_than_ignored_on_deviation_plot() {
        let got = recognize(&[less_than_glyph(), digit_glyph(0)], ValueKind::Deviation);
        assert_ne!(got, CellValue::BelowThreshold);
    }

    #[test]
    fn test_negative_single_digit() {
        let got = recognize(&[minus_glyph(), digit_glyph(5)], ValueKind::Deviation);
        assert_eq!(got, CellValue::Value(-5));
    }

    #[test]
    fn test_negative_two_digits_assumes_minus() {
        let got = recognize(
            &[minus_glyph(), digit_glyph(1), digit_glyph(2)],
            ValueKind::Deviation,
        );
        assert_eq!(got, CellValue::Value(-12));
    }

    #[test]
    fn test_trailing_zero_allowed() {
        let got = recognize(&[digit_glyph(3), digit_glyph(0)], ValueKind::Raw);
        assert_eq!(got, CellValue::Value(30));
    }

    #[test]
    fn test_clamp_holds_values_in_plot_range() {
        assert_eq!(ValueKind::Raw.clamp(60), CellValue::Value(50));
        assert_eq!(ValueKind::Raw.clamp(-3), CellValue::Value(0));
        assert_eq!(ValueKind::Raw.clamp(26), CellValue::Value(26));
        assert_eq!(ValueKind::Deviation.clamp(-61), CellValue::Value(-50));
        assert_eq!(ValueKind::Deviation.clamp(55), CellValue::Value(50));
    }

    #[test]
    fn test_misread_is_clamped_not_rejected() {
        let got = recognize(
            &[digit_glyph(9), digit_glyph(9)],
            ValueKind::Raw,
        );
        assert_eq!(got, CellValue::Value(50));
    }

    #[test]
    fn test_stray_marks_do_not_register() {
        let mut cell = GrayImage::from_pixel(80, 60, Luma([255]));
        cell.put_pixel(3, 3, Luma([0]));
        cell.put_pixel(76, 55, Luma([0]));
        let got = recognize_value_cell(&cell, &cell, ValueKind::Deviation, &test_store());
        assert_eq!(got, CellValue::Blank);
    }

    #[test]
    fn test_one_vs_four_refinement() {
        assert_eq!(recognize(&[digit_glyph(4)], ValueKind::Raw), CellValue::Value(4));
        assert_eq!(recognize(&[digit_glyph(1)], ValueKind::Raw), CellValue::Value(1));
    }
}
