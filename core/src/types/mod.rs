//! Core type definitions for Humphrey visual field data
//!
//! This module provides the fundamental types used throughout the hvf-core
//! library:
//! - [`CellValue`]: A single value-plot cell (dB number or sentinel)
//! - [`PercIcon`]: A single percentile-plot cell (probability icon)
//! - [`Plot`]: The 10x10 grid, addressed `(col, row)`
//! - [`DeviationPlot`]: A plot the analyzer may decline to generate
//! - [`FieldSize`]: 24-2 / 10-2 / 30-2 test patterns and their masks
//! - [`LayoutVersion`]: Report layout generations
//! - [`Metadata`]: The fixed report header fields

mod layout;
mod metadata;
mod perc_icon;
mod plot;
mod value;

pub use layout::LayoutVersion;
pub use metadata::{Metadata, MetadataField, EXTRACTION_FAILURE};
pub use perc_icon::PercIcon;
pub use plot::{
    DeviationPlot, FieldSize, Plot, PlotMask, MASK_10_2, MASK_24_2, MASK_30_2, PLOT_SIZE,
    RECOGNITION_MASK,
};
pub use value::{
    CellValue, DEVIATION_VALUE_RANGE, RAW_VALUE_RANGE, SENTINEL_BELOW_THRESHOLD, SENTINEL_FAILURE,
    SENTINEL_NO_VALUE,
};
