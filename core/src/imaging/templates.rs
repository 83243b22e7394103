//! Reference glyph templates and matching scores
//!
//! Recognizers take a [`TemplateStore`] explicitly; nothing here is global
//! state. Stores load from a directory of PNG assets or are assembled from
//! in-memory images.

use std::path::Path;

use image::GrayImage;

use crate::error::{HvfError, Result};

/// Number of digit glyph generations shipped with the analyzer fonts
pub const FONT_GENERATIONS: usize = 3;

/// One font generation's worth of value glyphs
#[derive(Debug, Clone)]
pub struct GlyphSet {
    /// Digit glyphs 0-9
    pub digits: [GrayImage; 10],
    /// The minus sign
    pub minus: GrayImage,
    /// The `<` sign used for below-threshold raw values
    pub less_than: GrayImage,
}

/// The four non-normal percentile icons
#[derive(Debug, Clone)]
pub struct IconSet {
    pub five_percent: GrayImage,
    pub two_percent: GrayImage,
    pub one_percent: GrayImage,
    pub half_percent: GrayImage,
}

/// Reference templates for value and percentile recognition
#[derive(Debug, Clone)]
pub struct TemplateStore {
    glyph_sets: Vec<GlyphSet>,
    icons: IconSet,
}

impl TemplateStore {
    /// Assembles a store from in-memory parts
    ///
    /// # Errors
    ///
    /// Returns a `TemplateError` when no glyph set is supplied.
    pub fn new(glyph_sets: Vec<GlyphSet>, icons: IconSet) -> Result<Self> {
        if glyph_sets.is_empty() {
            return Err(HvfError::TemplateError(
                "at least one glyph set is required".to_string(),
            ));
        }
        Ok(TemplateStore { glyph_sets, icons })
    }

    /// Loads a store from a template directory
    ///
    /// Expects `v0/`, `v1/`, `v2/` subdirectories holding `0.png`..`9.png`,
    /// `minus.png` and `lt.png`, plus `perc_5.png`, `perc_2.png`,
    /// `perc_1.png` and `perc_half.png` at the top level. Generations
    /// beyond `v0` are optional.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut glyph_sets = Vec::new();
        for gen in 0..FONT_GENERATIONS {
            let sub = dir.join(format!("v{}", gen));
            if !sub.is_dir() {
                continue;
            }
            let digits: Vec<GrayImage> = (0..10)
                .map(|d| load_png(&sub.join(format!("{}.png", d))))
                .collect::<Result<_>>()?;
            let digits: [GrayImage; 10] = digits
                .try_into()
                .map_err(|_| HvfError::TemplateError("expected 10 digit glyphs".to_string()))?;
            glyph_sets.push(GlyphSet {
                digits,
                minus: load_png(&sub.join("minus.png"))?,
                less_than: load_png(&sub.join("lt.png"))?,
            });
        }
        let icons = IconSet {
            five_percent: load_png(&dir.join("perc_5.png"))?,
            two_percent: load_png(&dir.join("perc_2.png"))?,
            one_percent: load_png(&dir.join("perc_1.png"))?,
            half_percent: load_png(&dir.join("perc_half.png"))?,
        };
        Self::new(glyph_sets, icons)
    }

    pub fn glyph_sets(&self) -> &[GlyphSet] {
        &self.glyph_sets
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    /// Scores `glyph` against digit templates across all font generations,
    /// returning the best `(digit, score)`
    ///
    /// Zero is excluded from the search unless `allow_zero` is set; leading
    /// digits are never zero, and skipping it avoids low-resolution
    /// confusions with 8.
    pub fn best_digit_match(&self, glyph: &GrayImage, allow_zero: bool) -> (u8, f64) {
        let start = usize::from(!allow_zero);
        let mut best = (0u8, f64::MIN);
        for set in &self.glyph_sets {
            for (digit, template) in set.digits.iter().enumerate().skip(start) {
                let score = ncc_score(glyph, template);
                if score > best.1 {
                    best = (digit as u8, score);
                }
            }
        }
        best
    }

    /// Best minus-sign correlation across generations
    pub fn minus_score(&self, glyph: &GrayImage) -> f64 {
        self.glyph_sets
            .iter()
            .map(|s| ncc_score(glyph, &s.minus))
            .fold(f64::MIN, f64::max)
    }

    /// Best (lowest) `<` difference score across generations
    pub fn less_than_score(&self, glyph: &GrayImage) -> f64 {
        self.glyph_sets
            .iter()
            .map(|s| sqdiff_score(glyph, &s.less_than))
            .fold(f64::MAX, f64::min)
    }
}

fn load_png(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)
        .map_err(|e| HvfError::TemplateError(format!("{}: {}", path.display(), e)))?;
    Ok(img.to_luma8())
}

/// Resizes `img` to exactly `w` x `h` with nearest-neighbor sampling
///
/// Binary glyphs stay binary under nearest-neighbor, which keeps the
/// difference scores well-behaved.
pub fn resize_to(img: &GrayImage, w: u32, h: u32) -> GrayImage {
    if img.dimensions() == (w, h) {
        return img.clone();
    }
    image::imageops::resize(img, w.max(1), h.max(1), image::imageops::FilterType::Nearest)
}

/// Normalized cross-correlation between an image and a template
///
/// The template is rescaled to the image's dimensions; both are
/// mean-subtracted, so a perfect match scores 1.0 and unrelated glyphs
/// score near 0. Blank inputs score 0.
pub fn ncc_score(img: &GrayImage, template: &GrayImage) -> f64 {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let template = resize_to(template, w, h);

    let n = (w * h) as f64;
    let mean_a: f64 = img.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / n;
    let mean_b: f64 = template.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / n;

    let mut num = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (pa, pb) in img.pixels().zip(template.pixels()) {
        let a = f64::from(pa.0[0]) - mean_a;
        let b = f64::from(pb.0[0]) - mean_b;
        num += a * b;
        var_a += a * a;
        var_b += b * b;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    num / (var_a.sqrt() * var_b.sqrt())
}

/// Normalized squared-difference score; lower is better
///
/// The template is rescaled to the image's dimensions. Identical images
/// score 0.0; the normalization follows the squared-difference template
/// matching convention.
pub fn sqdiff_score(img: &GrayImage, template: &GrayImage) -> f64 {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return f64::MAX;
    }
    let template = resize_to(template, w, h);

    let mut diff = 0.0;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    for (pa, pb) in img.pixels().zip(template.pixels()) {
        let a = f64::from(pa.0[0]);
        let b = f64::from(pb.0[0]);
        diff += (a - b) * (a - b);
        sum_a += a * a;
        sum_b += b * b;
    }
    let denom = (sum_a * sum_b).sqrt();
    if denom == 0.0 {
        if diff == 0.0 {
            return 0.0;
        }
        return f64::MAX;
    }
    diff / denom
}

#[cfg(test)]
pub(crate) mod test_glyphs {
    //! Synthetic glyph rendering shared by recognition tests
    //!
    //! Each digit is drawn on a 7x11 dot-matrix pattern, scaled up to
    //! template size. The shapes only need to be mutually distinguishable
    //! and consistent between templates and rendered test cells.

    use super::*;
    use image::Luma;

    /// 7-wide dot matrix rows for digits 0-9
    const DIGIT_PATTERNS: [[u8; 11]; 10] = [
        // Each u8 is a 7-bit row, MSB left
        [0x3E, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x3E], // 0
        [0x08, 0x18, 0x28, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08], // 1
        [0x3E, 0x41, 0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x7F], // 2
        [0x3E, 0x41, 0x01, 0x01, 0x1E, 0x01, 0x01, 0x01, 0x01, 0x41, 0x3E], // 3
        [0x02, 0x06, 0x0A, 0x12, 0x22, 0x42, 0x7F, 0x02, 0x02, 0x02, 0x02], // 4
        [0x7F, 0x40, 0x40, 0x40, 0x7E, 0x01, 0x01, 0x01, 0x01, 0x41, 0x3E], // 5
        [0x3E, 0x41, 0x40, 0x40, 0x7E, 0x41, 0x41, 0x41, 0x41, 0x41, 0x3E], // 6
        [0x7F, 0x01, 0x02, 0x02, 0x04, 0x04, 0x08, 0x08, 0x10, 0x10, 0x10], // 7
        [0x3E, 0x41, 0x41, 0x41, 0x3E, 0x41, 0x41, 0x41, 0x41, 0x41, 0x3E], // 8
        [0x3E, 0x41, 0x41, 0x41, 0x41, 0x3F, 0x01, 0x01, 0x01, 0x41, 0x3E], // 9
    ];

    const MINUS_PATTERN: [u8; 11] = [0, 0, 0, 0, 0, 0x7F, 0, 0, 0, 0, 0];
    const LT_PATTERN: [u8; 11] =
        [0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02];

    /// Pixels per dot-matrix cell in rendered glyphs
    pub const GLYPH_SCALE: u32 = 4;

    pub fn render_pattern(pattern: &[u8; 11]) -> GrayImage {
        let mut img = GrayImage::from_pixel(7 * GLYPH_SCALE, 11 * GLYPH_SCALE, Luma([255]));
        for (row, bits) in pattern.iter().enumerate() {
            for col in 0..7u32 {
                if bits & (1 << (6 - col)) != 0 {
                    for dy in 0..GLYPH_SCALE {
                        for dx in 0..GLYPH_SCALE {
                            img.put_pixel(
                                col * GLYPH_SCALE + dx,
                                row as u32 * GLYPH_SCALE + dy,
                                Luma([0]),
                            );
                        }
                    }
                }
            }
        }
        img
    }

    pub fn digit_glyph(digit: u8) -> GrayImage {
        render_pattern(&DIGIT_PATTERNS[digit as usize])
    }

    pub fn minus_glyph() -> GrayImage {
        render_pattern(&MINUS_PATTERN)
    }

    pub fn less_than_glyph() -> GrayImage {
        render_pattern(&LT_PATTERN)
    }

    /// Builds a store with one synthetic glyph generation and simple icons
    pub fn test_store() -> TemplateStore {
        let digits: Vec<GrayImage> = (0..10).map(digit_glyph).collect();
        let set = GlyphSet {
            digits: digits.try_into().unwrap(),
            minus: minus_glyph(),
            less_than: less_than_glyph(),
        };
        TemplateStore::new(vec![set], test_icons()).unwrap()
    }

    /// Icon templates: outlined box (5%), stippled boxes (2%, 1%), solid
    /// box (0.5%)
    pub fn test_icons() -> IconSet {
        IconSet {
            five_percent: icon_box(0),
            two_percent: icon_box(1),
            one_percent: icon_box(2),
            half_percent: icon_box(3),
        }
    }

    pub fn icon_box(kind: u8) -> GrayImage {
        let size = 24u32;
        let mut img = GrayImage::from_pixel(size, size, Luma([255]));
        for y in 0..size {
            for x in 0..size {
                let edge = x == 0 || y == 0 || x == size - 1 || y == size - 1;
                let ink = match kind {
                    0 => edge,
                    1 => edge || (x + y) % 4 == 0,
                    2 => edge || (x + y) % 2 == 0,
                    _ => true,
                };
                if ink {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
        img
    }
}
