//! Record editing: orientation and field-size conversion
//!
//! Left and right eyes mirror each other, so plots are flipped to a
//! common orientation before any column-indexed operation and flipped
//! back afterwards.

use crate::record::HvfRecord;
use crate::types::{DeviationPlot, FieldSize, Plot, MASK_24_2};

/// Mirrors a plot left-to-right
///
/// Maps a left-eye plot onto right-eye orientation (and back, since the
/// operation is its own inverse).
pub fn transpose<T: Copy + Default>(plot: &Plot<T>) -> Plot<T> {
    plot.mirror_columns()
}

/// Blanks every cell outside the 24-2 test pattern
///
/// The mask is defined in right-eye orientation; left-eye plots are
/// flipped, masked, and flipped back.
fn mask_to_24_2<T: Copy + Default>(plot: &Plot<T>, left_eye: bool) -> Plot<T> {
    let oriented = if left_eye { transpose(plot) } else { *plot };
    let masked = oriented.map(|col, row, v| if MASK_24_2[row][col] { v } else { T::default() });
    if left_eye {
        transpose(&masked)
    } else {
        masked
    }
}

fn mask_deviation_to_24_2<T: Copy + Default>(
    plot: &DeviationPlot<T>,
    left_eye: bool,
) -> DeviationPlot<T> {
    match plot.as_plot() {
        Some(p) => DeviationPlot::Generated(mask_to_24_2(p, left_eye)),
        None => DeviationPlot::NotGenerated,
    }
}

/// Converts a 30-2 record into its 24-2 subset
///
/// 24-2 test points are a subset of 30-2 points, so a 30-2 field can be
/// reduced by blanking the extra ring. Returns a new record with the
/// field size updated; records of any other size are returned unchanged.
pub fn mask_302_to_242(record: &HvfRecord) -> HvfRecord {
    if record.metadata.field_size != FieldSize::Size30_2.as_str() {
        return record.clone();
    }

    let left_eye = record.metadata.is_left_eye();
    let mut metadata = record.metadata.clone();
    metadata.field_size = FieldSize::Size24_2.as_str().to_string();

    HvfRecord::new(
        metadata,
        mask_to_24_2(&record.raw_value_plot, left_eye),
        mask_to_24_2(&record.abs_value_plot, left_eye),
        mask_to_24_2(&record.abs_perc_plot, left_eye),
        mask_deviation_to_24_2(&record.pat_value_plot, left_eye),
        mask_deviation_to_24_2(&record.pat_perc_plot, left_eye),
    )
}
