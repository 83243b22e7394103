//! Pixel-level utilities shared by the extraction pipeline
//!
//! Binary images follow report convention throughout: white (255)
//! background, black (0) ink.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::otsu_level;

/// Reports narrower than this are upscaled before extraction
pub const MIN_REPORT_WIDTH: u32 = 2500;

/// Ink threshold: pixels below this are considered content
pub const INK_THRESHOLD: u8 = 128;

/// Axis-aligned pixel bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Converts an input image to grayscale, upscaling narrow scans
///
/// Low-resolution scans defeat template matching; anything narrower than
/// [`MIN_REPORT_WIDTH`] is resized with Catmull-Rom interpolation,
/// preserving aspect ratio.
pub fn to_working_gray(img: &DynamicImage) -> GrayImage {
    let gray = img.to_luma8();
    upscale_if_narrow(gray)
}

/// Upscales a grayscale image if it is narrower than [`MIN_REPORT_WIDTH`]
pub fn upscale_if_narrow(gray: GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w >= MIN_REPORT_WIDTH || w == 0 {
        return gray;
    }
    let scale = f64::from(MIN_REPORT_WIDTH) / f64::from(w);
    let new_h = (f64::from(h) * scale).round() as u32;
    image::imageops::resize(
        &gray,
        MIN_REPORT_WIDTH,
        new_h.max(1),
        image::imageops::FilterType::CatmullRom,
    )
}

/// Crops a fractional window out of an image
///
/// `y_ratio`/`x_ratio` give the top-left corner and `y_size`/`x_size` the
/// extent, all as fractions of the full image dimensions.
pub fn slice_fraction(
    img: &GrayImage,
    y_ratio: f64,
    y_size: f64,
    x_ratio: f64,
    x_size: f64,
) -> GrayImage {
    let (w, h) = img.dimensions();
    let y1 = (f64::from(h) * y_ratio) as u32;
    let y2 = ((f64::from(h) * (y_ratio + y_size)) as u32).min(h);
    let x1 = (f64::from(w) * x_ratio) as u32;
    let x2 = ((f64::from(w) * (x_ratio + x_size)) as u32).min(w);
    image::imageops::crop_imm(img, x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1)).to_image()
}

/// Fixed binary threshold
///
/// Pixels above `thresh` become white, everything else black.
pub fn threshold_binary(img: &GrayImage, thresh: u8) -> GrayImage {
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, p) in img.enumerate_pixels() {
        out.put_pixel(x, y, Luma([if p.0[0] > thresh { 255 } else { 0 }]));
    }
    out
}

/// Binarizes with a global Otsu threshold
pub fn binarize_otsu(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    threshold_binary(img, level)
}

/// Mean-based adaptive threshold with a constant offset
///
/// A pixel stays white when its value exceeds the local window mean minus
/// `offset`; the window is the square of radius `block_radius`. Matches
/// the adaptive binarization used on scanned reports (a box mean stands in
/// for the Gaussian weighting, which makes no practical difference on
/// printed text).
pub fn binarize_adaptive(img: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    // Summed-area table, 1-based
    let stride = (w + 1) as usize;
    let mut integral = vec![0u64; stride * (h + 1) as usize];
    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += u64::from(img.get_pixel(x as u32, y as u32).0[0]);
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let r = block_radius as i64;
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let x0 = (x - r).max(0) as usize;
            let y0 = (y - r).max(0) as usize;
            let x1 = ((x + r).min(w as i64 - 1) + 1) as usize;
            let y1 = ((y + r).min(h as i64 - 1) + 1) as usize;
            let count = ((x1 - x0) * (y1 - y0)) as u64;
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let mean = (sum / count) as i32;
            let v = i32::from(img.get_pixel(x as u32, y as u32).0[0]);
            let bit = if v > mean - offset { 255 } else { 0 };
            out.put_pixel(x as u32, y as u32, Luma([bit]));
        }
    }
    out
}

/// Standard scan preprocessing: adaptive threshold tuned for the printed
/// report (11-px window, offset 2)
pub fn preprocess(img: &GrayImage) -> GrayImage {
    binarize_adaptive(img, 5, 2)
}

/// Inverts a grayscale image
pub fn invert(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0[0] = 255 - p.0[0];
    }
    out
}

/// Returns the tight bounding box of ink content, or `None` for a blank
/// image
pub fn content_bounding_box(img: &GrayImage) -> Option<BoundingBox> {
    let (w, h) = img.dimensions();
    let mut min_x = w;
    let mut max_x = 0u32;
    let mut min_y = h;
    let mut max_y = 0u32;
    let mut found = false;
    for (x, y, p) in img.enumerate_pixels() {
        if p.0[0] < INK_THRESHOLD {
            found = true;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if !found {
        return None;
    }
    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

/// Crops the white border around ink content
///
/// Blank images are returned unchanged.
pub fn crop_white_border(img: &GrayImage) -> GrayImage {
    match content_bounding_box(img) {
        Some(bb) => image::imageops::crop_imm(img, bb.x, bb.y, bb.width, bb.height).to_image(),
        None => img.clone(),
    }
}

/// Bounding box of a contour's points
pub fn contour_bounding_box(contour: &Contour<u32>) -> BoundingBox {
    let mut min_x = u32::MAX;
    let mut max_x = 0u32;
    let mut min_y = u32::MAX;
    let mut max_y = 0u32;
    for p in &contour.points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

/// Finds external contours of the ink content
///
/// The image is inverted first so ink becomes foreground; only outer
/// borders without a parent are kept, mirroring external-retrieval
/// contour detection.
pub fn external_ink_contours(img: &GrayImage) -> Vec<Contour<u32>> {
    let inverted = invert(img);
    find_contours::<u32>(&inverted)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Removes small stray marks from a binary image
///
/// A connected component is erased (painted white) when its bounding-box
/// area falls below `global_threshold` x image area or below
/// `relative_threshold` x the largest component's bounding-box area.
pub fn delete_stray_marks(
    img: &GrayImage,
    global_threshold: f64,
    relative_threshold: f64,
) -> GrayImage {
    let image_area = u64::from(img.width()) * u64::from(img.height());
    if image_area == 0 {
        return img.clone();
    }
    let contours = external_ink_contours(img);
    let boxes: Vec<BoundingBox> = contours.iter().map(contour_bounding_box).collect();
    let largest = boxes.iter().map(BoundingBox::area).max().unwrap_or(0);

    let mut out = img.clone();
    for bb in &boxes {
        let area = bb.area();
        let global_fraction = area as f64 / image_area as f64;
        let relative_fraction = if largest > 0 {
            area as f64 / largest as f64
        } else {
            1.0
        };
        if global_fraction < global_threshold || relative_fraction < relative_threshold {
            log::debug!(
                "erasing stray mark at ({}, {}) size {}x{}",
                bb.x,
                bb.y,
                bb.width,
                bb.height
            );
            fill_white(&mut out, *bb);
        }
    }
    out
}

/// Paints a rectangle white
pub fn fill_white(img: &mut GrayImage, bb: BoundingBox) {
    let x1 = (bb.x + bb.width).min(img.width());
    let y1 = (bb.y + bb.height).min(img.height());
    for y in bb.y..y1 {
        for x in bb.x..x1 {
            img.put_pixel(x, y, Luma([255]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([255]))
    }

    fn ink_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
        for yy in y..y + h {
            for xx in x..x + w {
                img.put_pixel(xx, yy, Luma([0]));
            }
        }
    }

    #[test]
    fn test_slice_fraction() {
        let img = blank(200, 100);
        let slice = slice_fraction(&img, 0.1, 0.5, 0.25, 0.5);
        assert_eq!(slice.dimensions(), (100, 50));
    }

    #[test]
    fn test_upscale_if_narrow() {
        let img = blank(1250, 500);
        let scaled = upscale_if_narrow(img);
        assert_eq!(scaled.dimensions(), (2500, 1000));

        let img = blank(3000, 500);
        let same = upscale_if_narrow(img);
        assert_eq!(same.dimensions(), (3000, 500));
    }

    #[test]
    fn test_threshold_binary() {
        let mut img = blank(4, 1);
        img.put_pixel(0, 0, Luma([10]));
        img.put_pixel(1, 0, Luma([200]));
        let out = threshold_binary(&img, 128);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn test_content_bounding_box() {
        let mut img = blank(50, 40);
        ink_rect(&mut img, 10, 5, 3, 4);
        let bb = content_bounding_box(&img).unwrap();
        assert_eq!(
            bb,
            BoundingBox {
                x: 10,
                y: 5,
                width: 3,
                height: 4
            }
        );
        assert!(content_bounding_box(&blank(10, 10)).is_none());
    }

    #[test]
    fn test_crop_white_border() {
        let mut img = blank(50, 40);
        ink_rect(&mut img, 10, 5, 3, 4);
        let cropped = crop_white_border(&img);
        assert_eq!(cropped.dimensions(), (3, 4));
        assert_eq!(cropped.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_delete_stray_marks_removes_specks() {
        let mut img = blank(100, 100);
        // Main glyph plus a 1px speck
        ink_rect(&mut img, 20, 20, 20, 30);
        ink_rect(&mut img, 80, 80, 1, 1);
        let cleaned = delete_stray_marks(&img, 0.005, 0.01);
        assert_eq!(cleaned.get_pixel(80, 80).0[0], 255);
        assert_eq!(cleaned.get_pixel(25, 25).0[0], 0);
    }

    #[test]
    fn test_delete_stray_marks_keeps_lone_content(){
        let mut img = blank(100, 100);
        ink_rect(&mut img, 20, 20, 30, 30);
        let cleaned = delete_stray_marks(&img, 0.005, 0.01);
        assert_eq!(cleaned.get_pixel(30, 30).0[0], 0);
    }

    #[test]
    fn test_binarize_adaptive_uniform_image() {
        // Uniform regions stay white regardless of offset
        let img = GrayImage::from_pixel(20, 20, Luma([180]));
        let out = binarize_adaptive(&img, 5, 2);
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_binarize_adaptive_detects_dark_text() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([200]));
        ink_rect(&mut img, 18, 18, 2, 2);
        let out = binarize_adaptive(&img, 5, 2);
        assert_eq!(out.get_pixel(18, 18).0[0], 0);
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
    }
}
