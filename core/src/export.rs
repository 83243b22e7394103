//! Tab-delimited spreadsheet export
//!
//! One row per record: source file name, the metadata fields in canonical
//! order, then the five plots flattened row-major. Left-eye plots are
//! mirrored into right-eye orientation so a column always refers to the
//! same anatomic position.

use std::fmt::Display;

use crate::editor::transpose;
use crate::record::HvfRecord;
use crate::types::{DeviationPlot, MetadataField, Plot, PLOT_SIZE};

/// Delimiter between spreadsheet cells
pub const CELL_DELIMITER: &str = "\t";

const CELLS_PER_PLOT: usize = PLOT_SIZE * PLOT_SIZE;
const PLOT_PREFIXES: [&str; 5] = ["raw", "tdv", "tdp", "pdv", "pdp"];

/// Builds the header row
pub fn header_row() -> String {
    let mut columns = vec!["file_name".to_string()];
    for field in MetadataField::ALL {
        columns.push(field.key().to_string());
    }
    for prefix in PLOT_PREFIXES {
        for i in 0..CELLS_PER_PLOT {
            columns.push(format!("{}{}", prefix, i));
        }
    }
    columns.join(CELL_DELIMITER)
}

/// Flattens a plot into display cells, row-major
///
/// Values are trimmed of their print padding; blank cells become empty
/// strings.
fn plot_cells<T: Copy + Default + Display>(plot: &Plot<T>, left_eye: bool) -> Vec<String> {
    let oriented = if left_eye { transpose(plot) } else { *plot };
    let mut cells = Vec::with_capacity(CELLS_PER_PLOT);
    for row in 0..PLOT_SIZE {
        for col in 0..PLOT_SIZE {
            cells.push(oriented.get(col, row).to_string().trim().to_string());
        }
    }
    cells
}

fn deviation_plot_cells<T: Copy + Default + Display>(
    plot: &DeviationPlot<T>,
    left_eye: bool,
) -> Vec<String> {
    match plot.as_plot() {
        Some(p) => plot_cells(p, left_eye),
        None => vec![String::new(); CELLS_PER_PLOT],
    }
}

/// Builds one data row for a record
pub fn export_row(file_name: &str, record: &HvfRecord) -> String {
    let left_eye = record.metadata.is_left_eye();
    let mut columns = vec![file_name.to_string()];
    for field in MetadataField::ALL {
        columns.push(record.metadata.get(field).to_string());
    }
    columns.extend(plot_cells(&record.raw_value_plot, left_eye));
    columns.extend(plot_cells(&record.abs_value_plot, left_eye));
    columns.extend(plot_cells(&record.abs_perc_plot, left_eye));
    columns.extend(deviation_plot_cells(&record.pat_value_plot, left_eye));
    columns.extend(deviation_plot_cells(&record.pat_perc_plot, left_eye));
    columns.join(CELL_DELIMITER)
}

/// Exports a batch of named records as one spreadsheet string
pub fn export(records: &[(String, HvfRecord)]) -> String {
    let mut out = header_row();
    out.push('\n');
    for (file_name, record) in records {
        out.push_str(&export_row(file_name, record));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellValue, Metadata, PercIcon};

    fn sample_record(laterality: &str) -> HvfRecord {
        let mut metadata = Metadata::default();
        metadata.laterality = laterality.to_string();
        metadata.name = "DOE, JOHN".to_string();

        let mut raw: Plot<CellValue> = Plot::new();
        raw.set(0, 0, CellValue::Value(26));
        raw.set(3, 1, CellValue::BelowThreshold);
        let mut perc: Plot<PercIcon> = Plot::new();
        perc.set(0, 0, PercIcon::HalfPercent);
        HvfRecord::new(
            metadata,
            raw,
            raw,
            perc,
            DeviationPlot::Generated(raw),
            DeviationPlot::Generated(perc),
        )
    }

    #[test]
    fn test_header_row_layout() {
        let header = header_row();
        let columns: Vec<&str> = header.split('\t').collect();
        assert_eq!(columns.len(), 1 + 18 + 5 * 100);
        assert_eq!(columns[0], "file_name");
        assert_eq!(columns[1], "layout_version");
        assert_eq!(columns[18], "vfi");
        assert_eq!(columns[19], "raw0");
        assert_eq!(columns[118], "raw99");
        assert_eq!(columns[119], "tdv0");
        assert_eq!(columns[519], "pdp0");
    }

    #[test]
    fn test_export_row_right_eye() {
        let row = export_row("report.png", &sample_record("Right"));
        let columns: Vec<&str> = row.split('\t').collect();
        assert_eq!(columns.len(), 1 + 18 + 5 * 100);
        assert_eq!(columns[0], "report.png");
        // raw0 is cell (0, 0); raw13 is cell (3, 1)
        assert_eq!(columns[19], "26");
        assert_eq!(columns[19 + 13], "<0");
        // blanks export as empty cells
        assert_eq!(columns[20], "");
        // tdp0 carries the icon display character
        assert_eq!(columns[19 + 200], "x");
    }

    #[test]
    fn test_export_row_transposes_left_eye() {
        let row = export_row("report.png", &sample_record("Left"));
        let columns: Vec<&str> = row.split('\t').collect();
        // cell (0, 0) lands in the mirrored position raw9
        assert_eq!(columns[19 + 9], "26");
        assert_eq!(columns[19], "");
        assert_eq!(columns[19 + 13], "");
        assert_eq!(columns[19 + 16], "<0");
    }

    #[test]
    fn test_export_row_absent_pattern_plots() {
        let mut record = sample_record("Right");
        record.pat_value_plot = DeviationPlot::NotGenerated;
        record.pat_perc_plot = DeviationPlot::NotGenerated;
        let row = export_row("report.png", &record);
        let columns: Vec<&str> = row.split('\t').collect();
        for i in 0..200 {
            assert_eq!(columns[19 + 300 + i], "");
        }
    }

    #[test]
    fn test_export_batch() {
        let records = vec![
            ("a.png".to_string(), sample_record("Right")),
            ("b.png".to_string(), sample_record("Left")),
        ];
        let sheet = export(&records);
        let lines: Vec<&str> = sheet.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("file_name\tlayout_version"));
        assert!(lines[1].starts_with("a.png\t"));
        assert!(lines[2].starts_with("b.png\t"));
    }
}
