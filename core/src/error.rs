use thiserror::Error;

/// Result type for hvf-core operations
pub type Result<T> = std::result::Result<T, HvfError>;

/// Error types for hvf-core operations
#[derive(Error, Debug)]
pub enum HvfError {
    /// DICOM reading error
    #[error("DICOM error: {0}")]
    DicomError(String),

    /// Tag not found in DICOM file
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Invalid tag value
    #[error("Invalid tag value: {0}")]
    InvalidValue(String),

    /// Image decoding or processing error
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Template asset missing or malformed
    #[error("Template error: {0}")]
    TemplateError(String),

    /// OCR backend error
    #[error("OCR error: {0}")]
    OcrError(String),

    /// Malformed serialized record
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic extraction error
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper conversions
impl From<String> for HvfError {
    fn from(s: String) -> Self {
        HvfError::ExtractionError(s)
    }
}

impl From<&str> for HvfError {
    fn from(s: &str) -> Self {
        HvfError::ExtractionError(s.to_string())
    }
}

impl From<serde_json::Error> for HvfError {
    fn from(e: serde_json::Error) -> Self {
        HvfError::SerializationError(format!("{}", e))
    }
}

// Convert dicom-object errors
impl From<dicom_object::ReadError> for HvfError {
    fn from(e: dicom_object::ReadError) -> Self {
        HvfError::DicomError(format!("{}", e))
    }
}

impl From<dicom_core::value::ConvertValueError> for HvfError {
    fn from(e: dicom_core::value::ConvertValueError) -> Self {
        HvfError::InvalidValue(format!("{}", e))
    }
}
