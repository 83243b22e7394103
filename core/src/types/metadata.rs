use serde::{Deserialize, Serialize};

/// Marker stored when a metadata field could not be extracted
pub const EXTRACTION_FAILURE: &str = "Extraction Failure";

/// The fixed set of report metadata fields
///
/// Every record carries exactly these fields; the serialized key strings
/// are stable and shared by the JSON codec and the spreadsheet export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataField {
    LayoutVersion,
    Name,
    Dob,
    Id,
    TestDate,
    Laterality,
    Fovea,
    FixationLoss,
    FalsePos,
    FalseNeg,
    TestDuration,
    FieldSize,
    Strategy,
    PupilDiameter,
    Rx,
    Md,
    Psd,
    Vfi,
}

impl MetadataField {
    /// All fields in canonical serialization order
    pub const ALL: [MetadataField; 18] = [
        MetadataField::LayoutVersion,
        MetadataField::Name,
        MetadataField::Dob,
        MetadataField::Id,
        MetadataField::TestDate,
        MetadataField::Laterality,
        MetadataField::Fovea,
        MetadataField::FixationLoss,
        MetadataField::FalsePos,
        MetadataField::FalseNeg,
        MetadataField::TestDuration,
        MetadataField::FieldSize,
        MetadataField::Strategy,
        MetadataField::PupilDiameter,
        MetadataField::Rx,
        MetadataField::Md,
        MetadataField::Psd,
        MetadataField::Vfi,
    ];

    /// Returns the canonical serialized key
    pub fn key(&self) -> &'static str {
        match self {
            MetadataField::LayoutVersion => "layout_version",
            MetadataField::Name => "name",
            MetadataField::Dob => "dob",
            MetadataField::Id => "id",
            MetadataField::TestDate => "test_date",
            MetadataField::Laterality => "laterality",
            MetadataField::Fovea => "fovea",
            MetadataField::FixationLoss => "fixation_loss",
            MetadataField::FalsePos => "false_pos",
            MetadataField::FalseNeg => "false_neg",
            MetadataField::TestDuration => "test_duration",
            MetadataField::FieldSize => "field_size",
            MetadataField::Strategy => "strategy",
            MetadataField::PupilDiameter => "pupil_diameter",
            MetadataField::Rx => "rx",
            MetadataField::Md => "md",
            MetadataField::Psd => "psd",
            MetadataField::Vfi => "vfi",
        }
    }
}

/// Report header metadata
///
/// Values are kept as the strings printed on the report (or derived from
/// DICOM attributes); interpretation stays with the caller. Fields that
/// failed extraction hold [`EXTRACTION_FAILURE`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub layout_version: String,
    pub name: String,
    pub dob: String,
    pub id: String,
    pub test_date: String,
    pub laterality: String,
    pub fovea: String,
    pub fixation_loss: String,
    pub false_pos: String,
    pub false_neg: String,
    pub test_duration: String,
    pub field_size: String,
    pub strategy: String,
    pub pupil_diameter: String,
    pub rx: String,
    pub md: String,
    pub psd: String,
    pub vfi: String,
}

impl Metadata {
    /// Returns the value of `field`
    pub fn get(&self, field: MetadataField) -> &str {
        match field {
            MetadataField::LayoutVersion => &self.layout_version,
            MetadataField::Name => &self.name,
            MetadataField::Dob => &self.dob,
            MetadataField::Id => &self.id,
            MetadataField::TestDate => &self.test_date,
            MetadataField::Laterality => &self.laterality,
            MetadataField::Fovea => &self.fovea,
            MetadataField::FixationLoss => &self.fixation_loss,
            MetadataField::FalsePos => &self.false_pos,
            MetadataField::FalseNeg => &self.false_neg,
            MetadataField::TestDuration => &self.test_duration,
            MetadataField::FieldSize => &self.field_size,
            MetadataField::Strategy => &self.strategy,
            MetadataField::PupilDiameter => &self.pupil_diameter,
            MetadataField::Rx => &self.rx,
            MetadataField::Md => &self.md,
            MetadataField::Psd => &self.psd,
            MetadataField::Vfi => &self.vfi,
        }
    }

    /// Sets the value of `field`
    pub fn set(&mut self, field: MetadataField, value: impl Into<String>) {
        let value = value.into();
        match field {
            MetadataField::LayoutVersion => self.layout_version = value,
            MetadataField::Name => self.name = value,
            MetadataField::Dob => self.dob = value,
            MetadataField::Id => self.id = value,
            MetadataField::TestDate => self.test_date = value,
            MetadataField::Laterality => self.laterality = value,
            MetadataField::Fovea => self.fovea = value,
            MetadataField::FixationLoss => self.fixation_loss = value,
            MetadataField::FalsePos => self.false_pos = value,
            MetadataField::FalseNeg => self.false_neg = value,
            MetadataField::TestDuration => self.test_duration = value,
            MetadataField::FieldSize => self.field_size = value,
            MetadataField::Strategy => self.strategy = value,
            MetadataField::PupilDiameter => self.pupil_diameter = value,
            MetadataField::Rx => self.rx = value,
            MetadataField::Md => self.md = value,
            MetadataField::Psd => self.psd = value,
            MetadataField::Vfi => self.vfi = value,
        }
    }

    /// Returns whether the record describes a left eye
    pub fn is_left_eye(&self) -> bool {
        self.laterality == "Left"
    }
}
