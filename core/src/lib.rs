pub mod api;
pub mod dicom;
pub mod editor;
pub mod error;
pub mod export;
pub mod extraction;
pub mod imaging;
pub mod ocr;
pub mod record;
pub mod types;

pub use api::HvfExtractor;
pub use error::{HvfError, Result};
pub use record::{HvfRecord, NO_PATTERN_DETECT, SERIALIZATION_DELIMITER};
pub use types::*;
