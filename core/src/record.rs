//! Canonical extraction record and its JSON codec

use image::DynamicImage;
use serde_json::{json, Map, Value};

use crate::error::{HvfError, Result};
use crate::types::{CellValue, DeviationPlot, Metadata, MetadataField, PercIcon, Plot};

/// Delimiter between cells in serialized plot rows
pub const SERIALIZATION_DELIMITER: &str = "|";

/// Notice printed in place of pattern deviation plots on severely
/// depressed fields; doubles as their serialized form
pub const NO_PATTERN_DETECT: &str =
    "Pattern Deviation not shown for severely depressed fields";

/// JSON keys for the five plots
pub const KEY_RAW_VALUE_PLOT: &str = "raw_value_plot";
pub const KEY_ABS_VALUE_PLOT: &str = "absolute_value_plot";
pub const KEY_PAT_VALUE_PLOT: &str = "pattern_value_plot";
pub const KEY_ABS_PERC_PLOT: &str = "absolute_percentile_plot";
pub const KEY_PAT_PERC_PLOT: &str = "pattern_percentile_plot";

/// A fully extracted visual field report
///
/// Header metadata plus the five plots: raw sensitivity, total ("absolute")
/// deviation values and percentiles, and pattern deviation values and
/// percentiles. The two pattern plots are either both generated or both
/// absent.
///
/// A record extracted from an image retains the source image until
/// [`HvfRecord::release_source_image`] is called. Equality compares the
/// recognized content only, never the retained pixels.
#[derive(Debug, Clone)]
pub struct HvfRecord {
    pub metadata: Metadata,
    pub raw_value_plot: Plot<CellValue>,
    pub abs_value_plot: Plot<CellValue>,
    pub abs_perc_plot: Plot<PercIcon>,
    pub pat_value_plot: DeviationPlot<CellValue>,
    pub pat_perc_plot: DeviationPlot<PercIcon>,
    pub source_image: Option<DynamicImage>,
}

impl PartialEq for HvfRecord {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata
            && self.raw_value_plot == other.raw_value_plot
            && self.abs_value_plot == other.abs_value_plot
            && self.abs_perc_plot == other.abs_perc_plot
            && self.pat_value_plot == other.pat_value_plot
            && self.pat_perc_plot == other.pat_perc_plot
    }
}

impl HvfRecord {
    /// Assembles a record, normalizing pattern-plot consistency
    ///
    /// If either pattern plot is absent, both are stored as absent.
    pub fn new(
        metadata: Metadata,
        raw_value_plot: Plot<CellValue>,
        abs_value_plot: Plot<CellValue>,
        abs_perc_plot: Plot<PercIcon>,
        pat_value_plot: DeviationPlot<CellValue>,
        pat_perc_plot: DeviationPlot<PercIcon>,
    ) -> Self {
        let (pat_value_plot, pat_perc_plot) =
            if pat_value_plot.is_generated() && pat_perc_plot.is_generated() {
                (pat_value_plot, pat_perc_plot)
            } else {
                (DeviationPlot::NotGenerated, DeviationPlot::NotGenerated)
            };
        HvfRecord {
            metadata,
            raw_value_plot,
            abs_value_plot,
            abs_perc_plot,
            pat_value_plot,
            pat_perc_plot,
            source_image: None,
        }
    }

    /// Returns whether the pattern deviation plots were generated
    pub fn has_pattern_plots(&self) -> bool {
        self.pat_value_plot.is_generated()
    }

    /// Drops the retained source image to bound memory in batch runs
    ///
    /// All recognized values and metadata are preserved.
    pub fn release_source_image(&mut self) {
        self.source_image = None;
    }

    /// Serializes the record to a JSON string
    ///
    /// Metadata fields are stored under their canonical keys; plots as
    /// lists of row strings with cells joined by [`SERIALIZATION_DELIMITER`].
    /// Absent pattern plots serialize as the [`NO_PATTERN_DETECT`] notice.
    pub fn to_json(&self) -> Result<String> {
        let mut map = Map::new();
        for field in MetadataField::ALL {
            map.insert(field.key().to_string(), json!(self.metadata.get(field)));
        }
        map.insert(
            KEY_RAW_VALUE_PLOT.to_string(),
            json!(self.raw_value_plot.row_strings(SERIALIZATION_DELIMITER)),
        );
        map.insert(
            KEY_ABS_VALUE_PLOT.to_string(),
            json!(self.abs_value_plot.row_strings(SERIALIZATION_DELIMITER)),
        );
        map.insert(
            KEY_PAT_VALUE_PLOT.to_string(),
            match &self.pat_value_plot {
                DeviationPlot::Generated(p) => json!(p.row_strings(SERIALIZATION_DELIMITER)),
                DeviationPlot::NotGenerated => json!(NO_PATTERN_DETECT),
            },
        );
        map.insert(
            KEY_ABS_PERC_PLOT.to_string(),
            json!(self.abs_perc_plot.row_strings(SERIALIZATION_DELIMITER)),
        );
        map.insert(
            KEY_PAT_PERC_PLOT.to_string(),
            match &self.pat_perc_plot {
                DeviationPlot::Generated(p) => json!(p.row_strings(SERIALIZATION_DELIMITER)),
                DeviationPlot::NotGenerated => json!(NO_PATTERN_DETECT),
            },
        );
        Ok(serde_json::to_string_pretty(&Value::Object(map))?)
    }

    /// Deserializes a record from its JSON form
    ///
    /// # Errors
    ///
    /// Returns a `SerializationError` for missing keys, malformed plot
    /// rows, or unparseable cells.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let obj = value
            .as_object()
            .ok_or_else(|| HvfError::SerializationError("expected a JSON object".to_string()))?;

        let mut metadata = Metadata::default();
        for field in MetadataField::ALL {
            let v = get_str(obj, field.key())?;
            metadata.set(field, v);
        }

        let raw_value_plot =
            Plot::<CellValue>::from_row_strings(&get_rows(obj, KEY_RAW_VALUE_PLOT)?, SERIALIZATION_DELIMITER)?;
        let abs_value_plot =
            Plot::<CellValue>::from_row_strings(&get_rows(obj, KEY_ABS_VALUE_PLOT)?, SERIALIZATION_DELIMITER)?;
        let abs_perc_plot =
            Plot::<PercIcon>::from_row_strings(&get_rows(obj, KEY_ABS_PERC_PLOT)?, SERIALIZATION_DELIMITER)?;

        let pat_value_plot = match get_pattern_rows(obj, KEY_PAT_VALUE_PLOT)? {
            Some(rows) => DeviationPlot::Generated(Plot::<CellValue>::from_row_strings(
                &rows,
                SERIALIZATION_DELIMITER,
            )?),
            None => DeviationPlot::NotGenerated,
        };
        let pat_perc_plot = match get_pattern_rows(obj, KEY_PAT_PERC_PLOT)? {
            Some(rows) => DeviationPlot::Generated(Plot::<PercIcon>::from_row_strings(
                &rows,
                SERIALIZATION_DELIMITER,
            )?),
            None => DeviationPlot::NotGenerated,
        };

        Ok(HvfRecord::new(
            metadata,
            raw_value_plot,
            abs_value_plot,
            abs_perc_plot,
            pat_value_plot,
            pat_perc_plot,
        ))
    }
}

fn get_str(obj: &Map<String, Value>, key: &str) -> Result<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HvfError::SerializationError(format!("missing string key: {}", key)))
}

fn get_rows(obj: &Map<String, Value>, key: &str) -> Result<Vec<String>> {
    let arr = obj
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| HvfError::SerializationError(format!("missing plot key: {}", key)))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| HvfError::SerializationError(format!("non-string row in {}", key)))
        })
        .collect()
}

/// Pattern plots are a row list or the no-pattern notice string
fn get_pattern_rows(obj: &Map<String, Value>, key: &str) -> Result<Option<Vec<String>>> {
    match obj.get(key) {
        Some(Value::String(s)) if s == NO_PATTERN_DETECT => Ok(None),
        Some(Value::Array(_)) => get_rows(obj, key).map(Some),
        _ => Err(HvfError::SerializationError(format!(
            "missing or malformed plot key: {}",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MASK_24_2;

    fn sample_metadata() -> Metadata {
        let mut md = Metadata::default();
        md.layout_version = "v2".to_string();
        md.name = "DOE, JOHN".to_string();
        md.dob = "01-02-1950".to_string();
        md.id = "123456".to_string();
        md.test_date = "03-04-2019".to_string();
        md.laterality = "Right".to_string();
        md.fovea = "OFF".to_string();
        md.fixation_loss = "1/14".to_string();
        md.false_pos = "2%".to_string();
        md.false_neg = "3%".to_string();
        md.test_duration = "05:21".to_string();
        md.field_size = "24-2".to_string();
        md.strategy = "SITA Standard".to_string();
        md.pupil_diameter = "4.1".to_string();
        md.rx = "+1.25DS +0.50DC X 90".to_string();
        md.md = "-3.21".to_string();
        md.psd = "2.87".to_string();
        md.vfi = "96%".to_string();
        md
    }

    fn sample_record() -> HvfRecord {
        let mut raw: Plot<CellValue> = Plot::new();
        let mut abs_val: Plot<CellValue> = Plot::new();
        let mut abs_perc: Plot<PercIcon> = Plot::new();
        for row in 0..10 {
            for col in 0..10 {
                if MASK_24_2[row][col] {
                    raw.set(col, row, CellValue::Value(25));
                    abs_val.set(col, row, CellValue::Value(-2));
                    abs_perc.set(col, row, PercIcon::Normal);
                }
            }
        }
        raw.set(3, 1, CellValue::BelowThreshold);
        raw.set(4, 1, CellValue::Unreadable);
        HvfRecord::new(
            sample_metadata(),
            raw,
            abs_val,
            abs_perc,
            DeviationPlot::Generated(abs_val),
            DeviationPlot::Generated(abs_perc),
        )
    }

    #[test]
    fn test_json_round_trip() {
        let record = sample_record();
        let text = record.to_json().unwrap();
        let parsed = HvfRecord::from_json(&text).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_json_round_trip_without_pattern_plots() {
        let mut record = sample_record();
        record.pat_value_plot = DeviationPlot::NotGenerated;
        record.pat_perc_plot = DeviationPlot::NotGenerated;
        let text = record.to_json().unwrap();
        assert!(text.contains(NO_PATTERN_DETECT));
        let parsed = HvfRecord::from_json(&text).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_new_normalizes_pattern_consistency() {
        let base = sample_record();
        let record = HvfRecord::new(
            base.metadata.clone(),
            base.raw_value_plot,
            base.abs_value_plot,
            base.abs_perc_plot,
            base.pat_value_plot,
            DeviationPlot::NotGenerated,
        );
        assert!(!record.pat_value_plot.is_generated());
        assert!(!record.pat_perc_plot.is_generated());
    }

    #[test]
    fn test_release_source_image() {
        let mut record = sample_record();
        record.source_image = Some(image::DynamicImage::new_luma8(4, 4));
        let with_image = record.clone();
        record.release_source_image();
        assert!(record.source_image.is_none());
        assert_eq!(record, with_image);
    }

    #[test]
    fn test_from_json_missing_key() {
        let record = sample_record();
        let text = record.to_json().unwrap();
        let mut value: Value = serde_json::from_str(&text).unwrap();
        value.as_object_mut().unwrap().remove(KEY_RAW_VALUE_PLOT);
        let err = HvfRecord::from_json(&value.to_string());
        assert!(err.is_err());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(HvfRecord::from_json("not json").is_err());
        assert!(HvfRecord::from_json("[1, 2, 3]").is_err());
    }
}
