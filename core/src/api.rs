//! Top-level extraction pipeline

use std::path::Path;

use image::DynamicImage;

use crate::error::Result;
use crate::extraction::{
    classify_layout, extract_all_plots, extract_header_metadata, extract_metric_metadata,
    field_size_laterality_from_plot,
};
use crate::imaging::ops;
use crate::imaging::templates::TemplateStore;
use crate::ocr::OcrEngine;
use crate::record::HvfRecord;

/// Extractor for Humphrey visual field report images
///
/// Holds the OCR backend used for text fields and the glyph/icon
/// templates used for plot recognition. One extractor can process any
/// number of reports.
///
/// # Example
///
/// ```no_run
/// use hvf_core::imaging::templates::TemplateStore;
/// use hvf_core::ocr::OcrEngine;
/// use hvf_core::HvfExtractor;
/// use image::GrayImage;
/// use std::path::Path;
///
/// struct NullOcr;
///
/// impl OcrEngine for NullOcr {
///     fn recognize(&self, _img: &GrayImage) -> hvf_core::Result<String> {
///         Ok(String::new())
///     }
/// }
///
/// let templates = TemplateStore::from_dir(Path::new("assets/templates")).unwrap();
/// let extractor = HvfExtractor::new(Box::new(NullOcr), templates);
/// let record = extractor.extract_from_path(Path::new("report.png")).unwrap();
/// println!("{}", record.to_json().unwrap());
/// ```
pub struct HvfExtractor {
    ocr: Box<dyn OcrEngine>,
    templates: TemplateStore,
}

impl HvfExtractor {
    pub fn new(ocr: Box<dyn OcrEngine>, templates: TemplateStore) -> Self {
        HvfExtractor { ocr, templates }
    }

    /// Extracts a full record from a report image
    ///
    /// The page is grayscaled and upscaled to working resolution, the
    /// layout classified, then the five plots and the metadata read off
    /// it. The field size and laterality recognized from the plot
    /// footprint override the OCR'd header fields, since plot geometry is
    /// far more reliable than header text.
    ///
    /// # Errors
    ///
    /// Returns an error when a plot's axes cannot be found or the OCR
    /// backend fails. Unreadable cells and missing text fields do not
    /// error; they are reported in-band as `?` cells and
    /// `"Extraction Failure"` values.
    pub fn extract(&self, img: &DynamicImage) -> Result<HvfRecord> {
        let original_width = img.width();
        let gray = ops::to_working_gray(img);

        let layout = classify_layout(&gray, original_width, self.ocr.as_ref())?;
        log::info!("report layout: {}", layout.as_str());

        let plots = extract_all_plots(&gray, layout, &self.templates)?;

        let mut metadata = extract_header_metadata(&gray, layout, self.ocr.as_ref())?;

        let (field_size, laterality) = field_size_laterality_from_plot(&plots.total_dev_value);
        if let Some(size) = field_size {
            if metadata.field_size != size.as_str() {
                log::info!(
                    "field size {} from plot overrides header {}",
                    size,
                    metadata.field_size
                );
            }
            metadata.field_size = size.as_str().to_string();
        }
        if let Some(lat) = laterality {
            if metadata.laterality != lat {
                log::info!(
                    "laterality {} from plot overrides header {}",
                    lat,
                    metadata.laterality
                );
            }
            metadata.laterality = lat.to_string();
        }

        let (md, psd, vfi) =
            extract_metric_metadata(&gray, layout, &metadata.field_size, self.ocr.as_ref())?;
        metadata.md = md;
        metadata.psd = psd;
        metadata.vfi = vfi;

        let mut record = HvfRecord::new(
            metadata,
            plots.raw_value,
            plots.total_dev_value,
            plots.total_dev_perc,
            plots.pattern_dev_value,
            plots.pattern_dev_perc,
        );
        record.source_image = Some(img.clone());
        Ok(record)
    }

    /// Reads an image file and extracts a record from it
    pub fn extract_from_path(&self, path: &Path) -> Result<HvfRecord> {
        let img = image::open(path)?;
        self.extract(&img)
    }
}
