//! Percentile icon recognition for probability plots

use image::GrayImage;

use crate::imaging::ops::{self, INK_THRESHOLD};
use crate::imaging::templates::sqdiff_score;
use crate::imaging::TemplateStore;
use crate::types::PercIcon;

const STRAY_GLOBAL: f64 = 0.005;
const STRAY_RELATIVE: f64 = 0.005;

/// Ink boxes shorter than this fraction of the cell are the normal dot
///
/// The dot is too small to template-match reliably, but no other icon
/// comes close to its size.
const NORMAL_HEIGHT_RATIO: f64 = 0.20;

/// Ink coverage above which a 5% match is reclassified as 0.5%
///
/// The stippled 5% box and the solid 0.5% box confuse the matcher at low
/// resolution; coverage separates them cleanly.
const HALF_PERCENT_COVERAGE: f64 = 0.5;

fn ink_coverage(img: &GrayImage) -> f64 {
    let total = u64::from(img.width()) * u64::from(img.height());
    if total == 0 {
        return 0.0;
    }
    let ink = img.pixels().filter(|p| p.0[0] < INK_THRESHOLD).count() as u64;
    ink as f64 / total as f64
}

/// Reads the percentile icon printed in one probability plot cell
pub fn recognize_perc_cell(cell: &GrayImage, store: &TemplateStore) -> PercIcon {
    let cleaned = ops::delete_stray_marks(cell, STRAY_GLOBAL, STRAY_RELATIVE);

    let Some(bb) = ops::content_bounding_box(&cleaned) else {
        return PercIcon::Blank;
    };
    if f64::from(bb.height) / f64::from(cleaned.height()) < NORMAL_HEIGHT_RATIO {
        return PercIcon::Normal;
    }

    let cropped =
        image::imageops::crop_imm(&cleaned, bb.x, bb.y, bb.width, bb.height).to_image();
    let icons = store.icons();
    let candidates = [
        (PercIcon::FivePercent, &icons.five_percent),
        (PercIcon::TwoPercent, &icons.two_percent),
        (PercIcon::OnePercent, &icons.one_percent),
        (PercIcon::HalfPercent, &icons.half_percent),
    ];

    let mut best = PercIcon::Blank;
    let mut best_score = f64::MAX;
    for (icon, template) in candidates {
        let score = sqdiff_score(&cropped, template);
        log::debug!("perc icon {} scored {:.4}", icon, score);
        if score < best_score {
            best_score = score;
            best = icon;
        }
    }

    if best == PercIcon::FivePercent && ink_coverage(&cropped) > HALF_PERCENT_COVERAGE {
        log::debug!("reclassifying 5% icon as 0.5% by ink coverage");
        return PercIcon::HalfPercent;
    }
    best
}
