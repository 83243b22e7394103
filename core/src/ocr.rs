//! OCR engine seam
//!
//! Metadata extraction only needs plain text back from a cropped image;
//! the trait keeps the extraction pipeline testable without a system OCR
//! installation. The Tesseract-backed implementation compiles with the
//! `ocr` cargo feature.

use image::GrayImage;

use crate::error::Result;

/// Text recognition over a binarized report crop
pub trait OcrEngine {
    /// Recognizes text in `img`
    ///
    /// Implementations return whatever text they find; an empty string is
    /// a valid result for a blank crop.
    fn recognize(&self, img: &GrayImage) -> Result<String>;
}

#[cfg(feature = "ocr")]
pub use self::tesseract_engine::TesseractEngine;

#[cfg(feature = "ocr")]
mod tesseract_engine {
    use image::{GrayImage, Luma};
    use tesseract::{PageSegMode, Tesseract};

    use super::OcrEngine;
    use crate::error::{HvfError, Result};

    /// Tesseract-backed engine
    ///
    /// Report headers are columnar label/value text, so recognition runs
    /// in single-column page segmentation mode.
    pub struct TesseractEngine {
        language: String,
    }

    impl TesseractEngine {
        pub fn new(language: impl Into<String>) -> Self {
            TesseractEngine {
                language: language.into(),
            }
        }
    }

    impl Default for TesseractEngine {
        fn default() -> Self {
            TesseractEngine::new("eng")
        }
    }

    impl OcrEngine for TesseractEngine {
        fn recognize(&self, img: &GrayImage) -> Result<String> {
            // A white border improves text-block detection
            let pad = 15u32;
            let (w, h) = img.dimensions();
            let mut padded = GrayImage::from_pixel(w + pad * 2, h + pad * 2, Luma([255u8]));
            image::imageops::overlay(&mut padded, img, i64::from(pad), i64::from(pad));

            let (pw, ph) = padded.dimensions();
            let bytes = padded.into_raw();

            let mut tess = Tesseract::new(None, Some(&self.language))
                .map_err(|e| HvfError::OcrError(format!("init: {}", e)))?
                .set_frame(&bytes, pw as i32, ph as i32, 1, pw as i32)
                .map_err(|e| HvfError::OcrError(format!("set_frame: {}", e)))?;
            tess.set_page_seg_mode(PageSegMode::PsmSingleColumn);
            let mut tess = tess
                .recognize()
                .map_err(|e| HvfError::OcrError(format!("recognize: {}", e)))?;
            let text = tess
                .get_text()
                .map_err(|e| HvfError::OcrError(format!("get_text: {}", e)))?;
            Ok(text.trim().to_string())
        }
    }
}
