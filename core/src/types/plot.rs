use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HvfError, Result};
use crate::types::perc_icon::PercIcon;
use crate::types::value::CellValue;

/// Grid dimension of every Humphrey plot
pub const PLOT_SIZE: usize = 10;

/// Field test patterns supported by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldSize {
    Size24_2,
    Size10_2,
    Size30_2,
}

impl FieldSize {
    /// Returns the canonical report label
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSize::Size24_2 => "24-2",
            FieldSize::Size10_2 => "10-2",
            FieldSize::Size30_2 => "30-2",
        }
    }

    /// Parses the canonical report label
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "24-2" => Some(FieldSize::Size24_2),
            "10-2" => Some(FieldSize::Size10_2),
            "30-2" => Some(FieldSize::Size30_2),
            _ => None,
        }
    }

    /// Returns the active-cell mask for this field pattern (right-eye
    /// orientation)
    pub fn mask(&self) -> &'static PlotMask {
        match self {
            FieldSize::Size24_2 => &MASK_24_2,
            FieldSize::Size10_2 => &MASK_10_2,
            FieldSize::Size30_2 => &MASK_30_2,
        }
    }
}

impl fmt::Display for FieldSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boolean cell mask, indexed `[row][col]`
pub type PlotMask = [[bool; PLOT_SIZE]; PLOT_SIZE];

const O: bool = false;
const X: bool = true;

/// Active cells for a right-eye 24-2 field (blind spot at column 7,
/// rows 4 and 5)
pub const MASK_24_2: PlotMask = [
    [O, O, O, O, O, O, O, O, O, O],
    [O, O, O, X, X, X, X, O, O, O],
    [O, O, X, X, X, X, X, X, O, O],
    [O, X, X, X, X, X, X, X, X, O],
    [X, X, X, X, X, X, X, O, X, O],
    [X, X, X, X, X, X, X, O, X, O],
    [O, X, X, X, X, X, X, X, X, O],
    [O, O, X, X, X, X, X, X, O, O],
    [O, O, O, X, X, X, X, O, O, O],
    [O, O, O, O, O, O, O, O, O, O],
];

/// Active cells for a 10-2 field
pub const MASK_10_2: PlotMask = [
    [O, O, O, O, X, X, O, O, O, O],
    [O, O, X, X, X, X, X, X, O, O],
    [O, X, X, X, X, X, X, X, X, O],
    [O, X, X, X, X, X, X, X, X, O],
    [X, X, X, X, X, X, X, X, X, X],
    [X, X, X, X, X, X, X, X, X, X],
    [O, X, X, X, X, X, X, X, X, O],
    [O, X, X, X, X, X, X, X, X, O],
    [O, X, X, X, X, X, X, X, O, O],
    [O, O, O, O, X, X, O, O, O, O],
];

/// Active cells for a right-eye 30-2 field
pub const MASK_30_2: PlotMask = [
    [O, O, O, X, X, X, X, O, O, O],
    [O, O, X, X, X, X, X, X, O, O],
    [O, X, X, X, X, X, X, X, X, O],
    [X, X, X, X, X, X, X, X, X, X],
    [X, X, X, X, X, X, X, O, X, X],
    [X, X, X, X, X, X, X, O, X, X],
    [X, X, X, X, X, X, X, X, X, X],
    [O, X, X, X, X, X, X, X, X, O],
    [O, O, X, X, X, X, X, X, O, O],
    [O, O, O, X, X, X, X, O, O, O],
];

/// Cells the recognizer ever needs to look at: the 30-2 pattern with the
/// blind-spot holes filled in. Everything outside is blank in every
/// layout/laterality combination.
pub const RECOGNITION_MASK: PlotMask = [
    [O, O, O, X, X, X, X, O, O, O],
    [O, O, X, X, X, X, X, X, O, O],
    [O, X, X, X, X, X, X, X, X, O],
    [X, X, X, X, X, X, X, X, X, X],
    [X, X, X, X, X, X, X, X, X, X],
    [X, X, X, X, X, X, X, X, X, X],
    [X, X, X, X, X, X, X, X, X, X],
    [O, X, X, X, X, X, X, X, X, O],
    [O, O, X, X, X, X, X, X, O, O],
    [O, O, O, X, X, X, X, O, O, O],
];

/// A 10x10 plot grid
///
/// Cells are addressed as `(col, row)` with `(0, 0)` the top-left corner,
/// columns increasing rightward (temporal for a right eye) and rows
/// increasing downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot<T> {
    cells: [[T; PLOT_SIZE]; PLOT_SIZE],
}

impl<T: Copy + Default> Default for Plot<T> {
    fn default() -> Self {
        Plot {
            cells: [[T::default(); PLOT_SIZE]; PLOT_SIZE],
        }
    }
}

impl<T: Copy + Default> Plot<T> {
    /// Creates an all-default plot
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell at `(col, row)`
    ///
    /// # Panics
    ///
    /// Panics if either index is out of the 0..10 range.
    pub fn get(&self, col: usize, row: usize) -> T {
        self.cells[row][col]
    }

    /// Sets the cell at `(col, row)`
    pub fn set(&mut self, col: usize, row: usize, value: T) {
        self.cells[row][col] = value;
    }

    /// Applies `f` to each cell, passing `(col, row, value)`
    pub fn map<U: Copy + Default>(&self, mut f: impl FnMut(usize, usize, T) -> U) -> Plot<U> {
        let mut out = Plot::new();
        for row in 0..PLOT_SIZE {
            for col in 0..PLOT_SIZE {
                out.set(col, row, f(col, row, self.get(col, row)));
            }
        }
        out
    }

    /// Mirrors the plot left-to-right (`col` becomes `9 - col`)
    ///
    /// Converts a left-eye plot to right-eye orientation and vice versa.
    pub fn mirror_columns(&self) -> Self {
        self.map(|col, row, _| self.get(PLOT_SIZE - 1 - col, row))
    }
}

impl Plot<CellValue> {
    /// Renders one row with fixed-width cells joined by `delimiter`
    pub fn row_string(&self, row: usize, delimiter: &str) -> String {
        let cells: Vec<String> = (0..PLOT_SIZE)
            .map(|col| format!("{:>3}", self.get(col, row).to_string()))
            .collect();
        cells.join(delimiter)
    }

    /// Renders all rows for serialization
    pub fn row_strings(&self, delimiter: &str) -> Vec<String> {
        (0..PLOT_SIZE).map(|r| self.row_string(r, delimiter)).collect()
    }

    /// Reconstructs a plot from serialized row strings
    ///
    /// # Errors
    ///
    /// Returns an error when the row count, cell count, or any cell
    /// display form is malformed.
    pub fn from_row_strings(rows: &[String], delimiter: &str) -> Result<Self> {
        parse_rows(rows, delimiter, |cell| {
            CellValue::from_display(cell)
                .ok_or_else(|| HvfError::SerializationError(format!("bad value cell: {:?}", cell)))
        })
    }

    /// Multi-line display form for debugging and test diffs
    pub fn display_string(&self) -> String {
        let mut out = String::new();
        for row in self.row_strings("|") {
            out.push_str(&row);
            out.push('\n');
        }
        out
    }
}

impl Plot<PercIcon> {
    pub fn row_string(&self, row: usize, delimiter: &str) -> String {
        let cells: Vec<String> = (0..PLOT_SIZE)
            .map(|col| self.get(col, row).to_string())
            .collect();
        cells.join(delimiter)
    }

    pub fn row_strings(&self, delimiter: &str) -> Vec<String> {
        (0..PLOT_SIZE).map(|r| self.row_string(r, delimiter)).collect()
    }

    pub fn from_row_strings(rows: &[String], delimiter: &str) -> Result<Self> {
        parse_rows(rows, delimiter, |cell| {
            PercIcon::from_display(cell)
                .ok_or_else(|| HvfError::SerializationError(format!("bad icon cell: {:?}", cell)))
        })
    }

    pub fn display_string(&self) -> String {
        let mut out = String::new();
        for row in self.row_strings("|") {
            out.push_str(&row);
            out.push('\n');
        }
        out
    }
}

fn parse_rows<T: Copy + Default>(
    rows: &[String],
    delimiter: &str,
    parse_cell: impl Fn(&str) -> Result<T>,
) -> Result<Plot<T>> {
    if rows.len() != PLOT_SIZE {
        return Err(HvfError::SerializationError(format!(
            "expected {} plot rows, found {}",
            PLOT_SIZE,
            rows.len()
        )));
    }
    let mut plot = Plot::new();
    for (row, line) in rows.iter().enumerate() {
        let cells: Vec<&str> = line.split(delimiter).collect();
        if cells.len() != PLOT_SIZE {
            return Err(HvfError::SerializationError(format!(
                "expected {} cells in row {}, found {}",
                PLOT_SIZE,
                row,
                cells.len()
            )));
        }
        for (col, cell) in cells.iter().enumerate() {
            plot.set(col, row, parse_cell(cell.trim())?);
        }
    }
    Ok(plot)
}

/// A plot that the analyzer may decline to generate
///
/// Pattern deviation plots are omitted for severely depressed fields; the
/// report prints a notice in their place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviationPlot<T> {
    Generated(Plot<T>),
    NotGenerated,
}

impl<T: Copy + Default> DeviationPlot<T> {
    pub fn is_generated(&self) -> bool {
        matches!(self, DeviationPlot::Generated(_))
    }

    pub fn as_plot(&self) -> Option<&Plot<T>> {
        match self {
            DeviationPlot::Generated(p) => Some(p),
            DeviationPlot::NotGenerated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_row_addressing() {
        let mut plot: Plot<CellValue> = Plot::new();
        plot.set(7, 4, CellValue::Value(26));
        // (col, row): row 4 is the 5th row string, col 7 the 8th cell
        let rows = plot.row_strings("|");
        let cells: Vec<&str> = rows[4].split('|').collect();
        assert_eq!(cells[7].trim(), "26");
        assert_eq!(plot.get(7, 4), CellValue::Value(26));
        assert_eq!(plot.get(4, 7), CellValue::Blank);
    }

    #[test]
    fn test_value_row_strings_round_trip() {
        let mut plot: Plot<CellValue> = Plot::new();
        plot.set(3, 1, CellValue::Value(26));
        plot.set(4, 1, CellValue::Value(-7));
        plot.set(5, 1, CellValue::BelowThreshold);
        plot.set(6, 1, CellValue::Unreadable);
        let rows = plot.row_strings("|");
        let parsed = Plot::<CellValue>::from_row_strings(&rows, "|").unwrap();
        assert_eq!(parsed, plot);
    }

    #[test]
    fn test_value_cells_fixed_width() {
        let mut plot: Plot<CellValue> = Plot::new();
        plot.set(0, 0, CellValue::Value(5));
        plot.set(1, 0, CellValue::Value(-12));
        let row = plot.row_string(0, "|");
        assert!(row.starts_with("  5|-12|"));
    }

    #[test]
    fn test_perc_row_strings_round_trip() {
        let mut plot: Plot<PercIcon> = Plot::new();
        plot.set(4, 4, PercIcon::Normal);
        plot.set(5, 4, PercIcon::HalfPercent);
        plot.set(6, 4, PercIcon::TwoPercent);
        let rows = plot.row_strings("|");
        assert_eq!(rows[4], " | | | |.|x|2| | | ");
        let parsed = Plot::<PercIcon>::from_row_strings(&rows, "|").unwrap();
        assert_eq!(parsed, plot);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        let rows = vec!["1|2".to_string()];
        assert!(Plot::<CellValue>::from_row_strings(&rows, "|").is_err());
    }

    #[test]
    fn test_mirror_columns() {
        let mut plot: Plot<CellValue> = Plot::new();
        plot.set(0, 2, CellValue::Value(30));
        let mirrored = plot.mirror_columns();
        assert_eq!(mirrored.get(9, 2), CellValue::Value(30));
        assert_eq!(mirrored.get(0, 2), CellValue::Blank);
        assert_eq!(mirrored.mirror_columns(), plot);
    }

    #[test]
    fn test_masks_contain_recognition_mask() {
        // Every active cell of every field pattern is recognizable
        for row in 0..PLOT_SIZE {
            for col in 0..PLOT_SIZE {
                for mask in [&MASK_24_2, &MASK_10_2, &MASK_30_2] {
                    if mask[row][col] {
                        assert!(RECOGNITION_MASK[row][col], "({}, {})", col, row);
                    }
                }
            }
        }
    }

    #[test]
    fn test_blind_spot_holes() {
        // Right-eye blind spot sits at column 7, rows 4 and 5
        assert!(!MASK_24_2[4][7]);
        assert!(!MASK_24_2[5][7]);
        assert!(!MASK_30_2[4][7]);
        assert!(!MASK_30_2[5][7]);
        assert!(MASK_10_2[4][7]);
    }

    #[test]
    fn test_field_size_labels() {
        for fs in [FieldSize::Size24_2, FieldSize::Size10_2, FieldSize::Size30_2] {
            assert_eq!(FieldSize::from_str(fs.as_str()), Some(fs));
        }
        assert_eq!(FieldSize::from_str("60-4"), None);
    }
}
