//! Whole-plot extraction: slice, locate, and read all five plots

use image::GrayImage;

use crate::error::Result;
use crate::extraction::grid::{self, AXIS_WHITEOUT_DEVIATION, AXIS_WHITEOUT_RAW, CORNER_MASK_RATIO};
use crate::extraction::perc_cell::recognize_perc_cell;
use crate::extraction::value_cell::{recognize_value_cell, ValueKind};
use crate::imaging::{ops, TemplateStore};
use crate::types::{
    CellValue, DeviationPlot, LayoutVersion, PercIcon, Plot, PLOT_SIZE, RECOGNITION_MASK,
};

/// Fractional window of the report page holding one plot
///
/// Windows are cut generously; the axis cross search narrows them down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotRegion {
    pub y_ratio: f64,
    pub y_size: f64,
    pub x_ratio: f64,
    pub x_size: f64,
}

pub const TOTAL_DEV_VALUE_REGION: PlotRegion = PlotRegion {
    y_ratio: 0.4,
    y_size: 0.30,
    x_ratio: 0.0,
    x_size: 0.4,
};

pub const PATTERN_DEV_VALUE_REGION: PlotRegion = PlotRegion {
    y_ratio: 0.4,
    y_size: 0.30,
    x_ratio: 0.35,
    x_size: 0.4,
};

pub const TOTAL_DEV_PERC_REGION: PlotRegion = PlotRegion {
    y_ratio: 0.6,
    y_size: 0.30,
    x_ratio: 0.0,
    x_size: 0.4,
};

pub const PATTERN_DEV_PERC_REGION: PlotRegion = PlotRegion {
    y_ratio: 0.6,
    y_size: 0.30,
    x_ratio: 0.35,
    x_size: 0.4,
};

/// The raw plot shifts left on GPA printouts to make room for the
/// progression column
pub fn raw_value_region(layout: LayoutVersion) -> PlotRegion {
    if layout == LayoutVersion::V2Gpa {
        PlotRegion {
            y_ratio: 0.16,
            y_size: 0.36,
            x_ratio: 0.0,
            x_size: 0.35,
        }
    } else {
        PlotRegion {
            y_ratio: 0.16,
            y_size: 0.36,
            x_ratio: 0.14,
            x_size: 0.44,
        }
    }
}

/// Backup binarization window radius and offset for value cells
const VALUE_BACKUP_RADIUS: u32 = 15;
const VALUE_BACKUP_OFFSET: i32 = 15;
/// Binarization parameters for percentile cells
const PERC_RADIUS: u32 = 5;
const PERC_OFFSET: i32 = 5;

/// Axis boxes smaller than this fraction of the window mean no plot
const PATTERN_NOT_SHOWN_RATIO: f64 = 0.3;

fn slice_region(img: &GrayImage, region: PlotRegion) -> GrayImage {
    ops::slice_fraction(img, region.y_ratio, region.y_size, region.x_ratio, region.x_size)
}

/// Detects a severely depressed field whose pattern plots were not printed
///
/// When the plot is absent, the window holds only a text notice; the axis
/// search either fails outright or locks onto something far too small.
pub fn is_pattern_not_shown(gray: &GrayImage, region: PlotRegion) -> bool {
    let processed = ops::preprocess(&slice_region(gray, region));
    let bb = match grid::find_axis_cross(&processed) {
        Ok(bb) => bb,
        Err(_) => return true,
    };
    let expected_w = region.x_size * f64::from(gray.width());
    let expected_h = region.y_size * f64::from(gray.height());
    f64::from(bb.width) / expected_w < PATTERN_NOT_SHOWN_RATIO
        || f64::from(bb.height) / expected_h < PATTERN_NOT_SHOWN_RATIO
}

/// Slices the plot window and crops it to the located axis cross
fn tight_plot(gray: &GrayImage, region: PlotRegion) -> Result<GrayImage> {
    let plot_slice = slice_region(gray, region);
    let processed = ops::preprocess(&plot_slice);
    let bb = grid::find_axis_cross_repaired(&processed)?;
    Ok(grid::crop_to_box(&plot_slice, bb))
}

/// Extracts a 10x10 plot of numeric values from the report
pub fn extract_value_plot(
    gray: &GrayImage,
    region: PlotRegion,
    kind: ValueKind,
    store: &TemplateStore,
) -> Result<Plot<CellValue>> {
    let tight = tight_plot(gray, region)?;

    let mut primary = ops::binarize_otsu(&tight);
    let backup = ops::binarize_adaptive(&tight, VALUE_BACKUP_RADIUS, VALUE_BACKUP_OFFSET);

    if kind == ValueKind::Raw {
        grid::find_and_delete_triangle(&mut primary);
    }
    grid::whiteout_corners(&mut primary, CORNER_MASK_RATIO);
    let axes = if kind == ValueKind::Raw {
        AXIS_WHITEOUT_RAW
    } else {
        AXIS_WHITEOUT_DEVIATION
    };
    grid::whiteout_axes(&mut primary, axes);

    let lines = grid::locate_grid_lines(&primary);

    let mut plot = Plot::new();
    for row in 0..PLOT_SIZE {
        for col in 0..PLOT_SIZE {
            if !RECOGNITION_MASK[row][col] {
                continue;
            }
            let cell = grid::cell_slice(&primary, &lines, col, row);
            let cell_backup = grid::cell_slice(&backup, &lines, col, row);
            let value = recognize_value_cell(&cell, &cell_backup, kind, store);
            log::debug!("cell ({}, {}) read as {}", col, row, value);
            plot.set(col, row, value);
        }
    }
    Ok(plot)
}

/// Extracts a 10x10 plot of percentile icons from the report
pub fn extract_perc_plot(
    gray: &GrayImage,
    region: PlotRegion,
    store: &TemplateStore,
) -> Result<Plot<PercIcon>> {
    let tight = tight_plot(gray, region)?;

    let mut primary = ops::binarize_adaptive(&tight, PERC_RADIUS, PERC_OFFSET);
    grid::whiteout_corners(&mut primary, CORNER_MASK_RATIO);
    grid::whiteout_axes(&mut primary, AXIS_WHITEOUT_DEVIATION);

    let lines = grid::locate_grid_lines(&primary);

    let mut plot = Plot::new();
    for row in 0..PLOT_SIZE {
        for col in 0..PLOT_SIZE {
            if !RECOGNITION_MASK[row][col] {
                continue;
            }
            let cell = grid::cell_slice(&primary, &lines, col, row);
            let icon = recognize_perc_cell(&cell, store);
            log::debug!("cell ({}, {}) read as {}", col, row, icon);
            plot.set(col, row, icon);
        }
    }
    Ok(plot)
}

/// All five plots read off one report page
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPlots {
    pub raw_value: Plot<CellValue>,
    pub total_dev_value: Plot<CellValue>,
    pub total_dev_perc: Plot<PercIcon>,
    pub pattern_dev_value: DeviationPlot<CellValue>,
    pub pattern_dev_perc: DeviationPlot<PercIcon>,
}

/// Extracts every plot, skipping pattern plots that were not printed
pub fn extract_all_plots(
    gray: &GrayImage,
    layout: LayoutVersion,
    store: &TemplateStore,
) -> Result<ExtractedPlots> {
    log::info!("extracting raw value plot");
    let raw_value = extract_value_plot(gray, raw_value_region(layout), ValueKind::Raw, store)?;
    log::info!("extracting total deviation value plot");
    let total_dev_value =
        extract_value_plot(gray, TOTAL_DEV_VALUE_REGION, ValueKind::Deviation, store)?;
    log::info!("extracting total deviation percentile plot");
    let total_dev_perc = extract_perc_plot(gray, TOTAL_DEV_PERC_REGION, store)?;

    let pattern_dev_value = if is_pattern_not_shown(gray, PATTERN_DEV_VALUE_REGION) {
        log::info!("pattern deviation value plot not printed");
        DeviationPlot::NotGenerated
    } else {
        log::info!("extracting pattern deviation value plot");
        DeviationPlot::Generated(extract_value_plot(
            gray,
            PATTERN_DEV_VALUE_REGION,
            ValueKind::Deviation,
            store,
        )?)
    };
    let pattern_dev_perc = if is_pattern_not_shown(gray, PATTERN_DEV_PERC_REGION) {
        log::info!("pattern deviation percentile plot not printed");
        DeviationPlot::NotGenerated
    } else {
        log::info!("extracting pattern deviation percentile plot");
        DeviationPlot::Generated(extract_perc_plot(gray, PATTERN_DEV_PERC_REGION, store)?)
    };

    Ok(ExtractedPlots {
        raw_value,
        total_dev_value,
        total_dev_perc,
        pattern_dev_value,
        pattern_dev_perc,
    })
}
