//! Plot geometry: axis cross location, grid lines, cell slicing

use image::{GrayImage, Luma};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};

use crate::error::{HvfError, Result};
use crate::imaging::ops::{self, BoundingBox, INK_THRESHOLD};

/// Grid divisions per axis (10 cells, 11 boundaries)
pub const CELLS_PER_AXIS: usize = 10;

/// Fraction of the plot blanked in each corner (legend text lives there)
pub const CORNER_MASK_RATIO: f64 = 0.2;

/// Axis whiteout thickness for raw plots (they carry axis tick labels)
pub const AXIS_WHITEOUT_RAW: f64 = 0.03;
/// Axis whiteout thickness for deviation plots
pub const AXIS_WHITEOUT_DEVIATION: f64 = 0.0135;

/// Triangle icon width as a fraction of the raw plot width
const TRIANGLE_TO_PLOT_RATIO_W: f64 = 0.0305;
/// Correlation above which the triangle icon counts as found
const TRIANGLE_MATCH_THRESHOLD: f32 = 0.6;

/// Nominal grid-line positions as fractions of the axis bounding box
///
/// Columns sit slightly wider than rows on the printed plots.
fn nominal_col(c: usize) -> f64 {
    0.5 - 0.097 * (5.0 - c as f64)
}

fn nominal_row(r: usize) -> f64 {
    0.5 - 0.095 * (5.0 - r as f64)
}

/// Cell boundary fractions relative to the plot image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLines {
    pub cols: [f64; CELLS_PER_AXIS + 1],
    pub rows: [f64; CELLS_PER_AXIS + 1],
}

/// 3x3 maximum dilation, matching a one-iteration rectangular dilate
fn dilate_3x3(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut max_val = 0u8;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx >= 0 && ny >= 0 && nx < i64::from(w) && ny < i64::from(h) {
                        max_val = max_val.max(img.get_pixel(nx as u32, ny as u32).0[0]);
                    }
                }
            }
            out.put_pixel(x, y, Luma([max_val]));
        }
    }
    out
}

fn paint_border_black(img: &mut GrayImage) {
    let (w, h) = img.dimensions();
    for x in 0..w {
        img.put_pixel(x, 0, Luma([0]));
        img.put_pixel(x, h - 1, Luma([0]));
    }
    for y in 0..h {
        img.put_pixel(0, y, Luma([0]));
        img.put_pixel(w - 1, y, Luma([0]));
    }
}

/// Locates the plot's axis cross inside a binarized slice
///
/// The inverted slice is dilated to bridge noise breaks in the axis lines;
/// the largest connected component fixes the cross dimensions, and a
/// sweep of the synthesized cross (scored only along its two lines) fixes
/// the position.
pub fn find_axis_cross(img: &GrayImage) -> Result<BoundingBox> {
    let (width, height) = img.dimensions();
    if width < 2 || height < 2 {
        return Err(HvfError::ExtractionError(
            "plot slice too small for axis detection".to_string(),
        ));
    }

    // Foreground components of the dilated ink
    let mut inverted = dilate_3x3(&ops::invert(img));
    paint_border_black(&mut inverted);
    let contours = imageproc::contours::find_contours::<u32>(&inverted);
    let best = contours
        .iter()
        .map(ops::contour_bounding_box)
        .max_by_key(BoundingBox::area)
        .ok_or_else(|| HvfError::ExtractionError("no axis cross candidate found".to_string()))?;
    let (w, h) = (best.width.min(width), best.height.min(height));
    if w < 2 || h < 2 {
        return Err(HvfError::ExtractionError(
            "degenerate axis cross candidate".to_string(),
        ));
    }

    // Column/row prefix sums of squared intensity; the cross template is
    // black along its lines, so the squared-difference there is just the
    // squared pixel value.
    let wi = width as usize;
    let hi = height as usize;
    let mut col_cum = vec![0u64; wi * (hi + 1)];
    let mut row_cum = vec![0u64; hi * (wi + 1)];
    for y in 0..hi {
        for x in 0..wi {
            let v = u64::from(img.get_pixel(x as u32, y as u32).0[0]);
            let sq = v * v;
            col_cum[x * (hi + 1) + y + 1] = col_cum[x * (hi + 1) + y] + sq;
            row_cum[y * (wi + 1) + x + 1] = row_cum[y * (wi + 1) + x] + sq;
        }
    }

    let mut best_score = u64::MAX;
    let mut best_pos = (0u32, 0u32);
    for y in 0..=(height - h) {
        for x in 0..=(width - w) {
            let cx = (x + w / 2) as usize;
            let cy = (y + h / 2) as usize;
            let v_sum =
                col_cum[cx * (hi + 1) + (y + h) as usize] - col_cum[cx * (hi + 1) + y as usize];
            let h_sum =
                row_cum[cy * (wi + 1) + (x + w) as usize] - row_cum[cy * (wi + 1) + x as usize];
            let score = v_sum + h_sum;
            if score < best_score {
                best_score = score;
                best_pos = (x, y);
            }
        }
    }

    Ok(BoundingBox {
        x: best_pos.0,
        y: best_pos.1,
        width: w,
        height: h,
    })
}

/// Locates the axis cross with a repair pass for broken x-axes
///
/// The raw plot's x-axis is interrupted by the fovea triangle icon, which
/// splits the cross into two components. Filling the detected midline and
/// re-running detection recovers the full extent.
pub fn find_axis_cross_repaired(img: &GrayImage) -> Result<BoundingBox> {
    let first = find_axis_cross(img)?;
    let mut repaired = img.clone();
    let y_mid = first.y + first.height / 2;
    let thickness = ((f64::from(first.height) * 0.015) as u32).max(1);
    for dy in 0..thickness {
        let y = (y_mid + dy).min(repaired.height() - 1);
        for x in first.x..(first.x + first.width).min(repaired.width()) {
            repaired.put_pixel(x, y, Luma([0]));
        }
    }
    find_axis_cross(&repaired)
}

/// Crops a plot image to its axis bounding box
pub fn crop_to_box(img: &GrayImage, bb: BoundingBox) -> GrayImage {
    image::imageops::crop_imm(img, bb.x, bb.y, bb.width, bb.height).to_image()
}

/// Whites out the axis lines of a cropped plot
pub fn whiteout_axes(img: &mut GrayImage, thickness_ratio: f64) {
    let (w, h) = img.dimensions();
    let tw = ((f64::from(w) * thickness_ratio) as u32).max(1);
    let th = ((f64::from(h) * thickness_ratio) as u32).max(1);
    let x_mid = w / 2;
    let y_mid = h / 2;
    ops::fill_white(
        img,
        BoundingBox {
            x: x_mid.saturating_sub(tw / 2),
            y: 0,
            width: tw,
            height: h,
        },
    );
    ops::fill_white(
        img,
        BoundingBox {
            x: 0,
            y: y_mid.saturating_sub(th / 2),
            width: w,
            height: th,
        },
    );
}

/// Whites out the four corner boxes of a cropped plot
pub fn whiteout_corners(img: &mut GrayImage, ratio: f64) {
    let (w, h) = img.dimensions();
    let cw = (f64::from(w) * ratio) as u32;
    let ch = (f64::from(h) * ratio) as u32;
    for (x, y) in [
        (0, 0),
        (w - cw, 0),
        (0, h - ch),
        (w - cw, h - ch),
    ] {
        ops::fill_white(
            img,
            BoundingBox {
                x,
                y,
                width: cw,
                height: ch,
            },
        );
    }
}

/// Synthesizes the fovea triangle reference glyph
fn triangle_template(w: u32) -> GrayImage {
    let w = w.max(3);
    let h = (f64::from(w) * 1.2) as u32;
    let mut img = GrayImage::from_pixel(w, h.max(3), Luma([255]));
    let (tw, th) = img.dimensions();
    // Filled triangle, apex at top center
    for y in 0..th {
        let half_span = (f64::from(y) / f64::from(th) * f64::from(tw) / 2.0) as i64;
        let cx = i64::from(tw) / 2;
        for x in (cx - half_span).max(0)..=(cx + half_span).min(i64::from(tw) - 1) {
            img.put_pixel(x as u32, y, Luma([0]));
        }
    }
    img
}

/// Finds and erases the fovea triangle icon on a raw plot
///
/// Raw plots print a small triangle on the x-axis below the cross center;
/// left in place it reads as a glyph. A correlation match against the
/// synthesized triangle erases it when found.
pub fn find_and_delete_triangle(img: &mut GrayImage) {
    let tw = (f64::from(img.width()) * TRIANGLE_TO_PLOT_RATIO_W) as u32;
    let template = triangle_template(tw);
    let (tw, th) = template.dimensions();
    if tw >= img.width() || th >= img.height() {
        return;
    }
    let scores = match_template(img, &template, MatchTemplateMethod::CrossCorrelationNormalized);
    let extremes = find_extremes(&scores);
    if extremes.max_value > TRIANGLE_MATCH_THRESHOLD {
        let (x, y) = extremes.max_value_location;
        log::debug!("erasing triangle icon at ({}, {})", x, y);
        ops::fill_white(
            img,
            BoundingBox {
                x,
                y,
                width: tw,
                height: th,
            },
        );
    }
}

/// Maximal runs of blank (ink-free) lines, as center fractions
fn blank_band_centers(blank: &[bool]) -> Vec<f64> {
    let n = blank.len();
    let mut centers = Vec::new();
    let mut start: Option<usize> = None;
    for i in 0..=n {
        let is_blank = i < n && blank[i];
        match (is_blank, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                centers.push((s + i) as f64 / 2.0 / n as f64);
                start = None;
            }
            _ => {}
        }
    }
    centers
}

/// Locates the 11 column and row boundaries of a cropped plot
///
/// Nominal boundaries are kept when they fall in a blank strip; boundaries
/// that land on printed content are snapped to the nearest blank band's
/// center. Call after the axes have been whited out.
pub fn locate_grid_lines(img: &GrayImage) -> GridLines {
    let (w, h) = img.dimensions();

    let mut col_blank = vec![true; w as usize];
    let mut row_blank = vec![true; h as usize];
    for (x, y, p) in img.enumerate_pixels() {
        if p.0[0] < INK_THRESHOLD {
            col_blank[x as usize] = false;
            row_blank[y as usize] = false;
        }
    }
    let col_centers = blank_band_centers(&col_blank);
    let row_centers = blank_band_centers(&row_blank);

    let snap = |nominal: f64, blank: &[bool], centers: &[f64]| -> f64 {
        let n = blank.len();
        let idx = ((nominal * n as f64) as usize).min(n.saturating_sub(1));
        if blank.get(idx).copied().unwrap_or(true) {
            return nominal;
        }
        centers
            .iter()
            .copied()
            .min_by(|a, b| {
                (a - nominal)
                    .abs()
                    .partial_cmp(&(b - nominal).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(nominal)
    };

    let mut cols = [0.0; CELLS_PER_AXIS + 1];
    let mut rows = [0.0; CELLS_PER_AXIS + 1];
    for i in 0..=CELLS_PER_AXIS {
        cols[i] = snap(nominal_col(i), &col_blank, &col_centers);
        rows[i] = snap(nominal_row(i), &row_blank, &row_centers);
    }
    GridLines { cols, rows }
}

/// Cuts the cell at `(col, row)` out of a cropped plot
pub fn cell_slice(img: &GrayImage, lines: &GridLines, col: usize, row: usize) -> GrayImage {
    let y = lines.rows[row];
    let ys = lines.rows[row + 1] - y;
    let x = lines.cols[col];
    let xs = lines.cols[col + 1] - x;
    ops::slice_fraction(img, y, ys, x, xs)
}
