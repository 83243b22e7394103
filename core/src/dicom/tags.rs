use dicom_core::Tag;
use dicom_object::InMemDicomObject;

// Patient and Study Tags
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const LATERALITY: Tag = Tag(0x0020, 0x0060);
pub const CODE_MEANING: Tag = Tag(0x0008, 0x0104);
pub const PERFORMED_PROTOCOL_CODE_SEQUENCE: Tag = Tag(0x0040, 0x0260);
pub const ORIGINAL_ATTRIBUTES_SEQUENCE: Tag = Tag(0x0400, 0x0561);
pub const MODIFIED_ATTRIBUTES_SEQUENCE: Tag = Tag(0x0400, 0x0550);

// Test Parameter Tags
pub const VISUAL_FIELD_HORIZONTAL_EXTENT: Tag = Tag(0x0024, 0x0010);
pub const VISUAL_FIELD_TEST_DURATION: Tag = Tag(0x0024, 0x0088);
pub const FOVEAL_SENSITIVITY_MEASURED: Tag = Tag(0x0024, 0x0086);
pub const FOVEAL_SENSITIVITY: Tag = Tag(0x0024, 0x0087);

// Reliability Index Tags
pub const FIXATION_SEQUENCE: Tag = Tag(0x0024, 0x0032);
pub const FIXATION_CHECKED_QUANTITY: Tag = Tag(0x0024, 0x0035);
pub const PATIENT_NOT_PROPERLY_FIXATED_QUANTITY: Tag = Tag(0x0024, 0x0036);
pub const VISUAL_FIELD_CATCH_TRIAL_SEQUENCE: Tag = Tag(0x0024, 0x0034);
pub const FALSE_NEGATIVES_ESTIMATE: Tag = Tag(0x0024, 0x0046);
pub const NEGATIVE_CATCH_TRIALS_QUANTITY: Tag = Tag(0x0024, 0x0048);
pub const FALSE_NEGATIVES_QUANTITY: Tag = Tag(0x0024, 0x0050);
pub const FALSE_POSITIVES_ESTIMATE: Tag = Tag(0x0024, 0x0054);
pub const POSITIVE_CATCH_TRIALS_QUANTITY: Tag = Tag(0x0024, 0x0056);
pub const FALSE_POSITIVES_QUANTITY: Tag = Tag(0x0024, 0x0060);

// Global Index Tags
pub const RESULTS_NORMALS_SEQUENCE: Tag = Tag(0x0024, 0x0064);
pub const GLOBAL_DEVIATION_FROM_NORMAL: Tag = Tag(0x0024, 0x0066);
pub const LOCALIZED_DEVIATION_FROM_NORMAL: Tag = Tag(0x0024, 0x0068);
pub const VISUAL_FIELD_GLOBAL_RESULTS_INDEX_SEQUENCE: Tag = Tag(0x0024, 0x0320);
pub const DATA_OBSERVATION_SEQUENCE: Tag = Tag(0x0024, 0x0325);
pub const NUMERIC_VALUE: Tag = Tag(0x0040, 0xA30A);

// Test Point Tags
pub const VISUAL_FIELD_TEST_POINT_SEQUENCE: Tag = Tag(0x0024, 0x0089);
pub const TEST_POINT_X_COORDINATE: Tag = Tag(0x0024, 0x0090);
pub const TEST_POINT_Y_COORDINATE: Tag = Tag(0x0024, 0x0091);
pub const SENSITIVITY_VALUE: Tag = Tag(0x0024, 0x0094);
pub const STIMULUS_RESULTS: Tag = Tag(0x0024, 0x0093);
pub const TEST_POINT_NORMALS_SEQUENCE: Tag = Tag(0x0024, 0x0097);
pub const AGE_CORRECTED_SENSITIVITY_DEVIATION_VALUE: Tag = Tag(0x0024, 0x0092);
pub const AGE_CORRECTED_SENSITIVITY_DEVIATION_PROBABILITY_VALUE: Tag = Tag(0x0024, 0x0100);
pub const GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_FLAG: Tag = Tag(0x0024, 0x0102);
pub const GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_VALUE: Tag = Tag(0x0024, 0x0103);
pub const GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_PROBABILITY_VALUE: Tag =
    Tag(0x0024, 0x0104);

// Clinical Information Tags
pub const OPHTHALMIC_PATIENT_CLINICAL_INFORMATION_LEFT_EYE_SEQUENCE: Tag = Tag(0x0024, 0x0114);
pub const OPHTHALMIC_PATIENT_CLINICAL_INFORMATION_RIGHT_EYE_SEQUENCE: Tag = Tag(0x0024, 0x0115);
pub const REFRACTIVE_PARAMETERS_USED_ON_PATIENT_SEQUENCE: Tag = Tag(0x0024, 0x0112);
pub const PUPIL_SIZE: Tag = Tag(0x0046, 0x0044);
pub const SPHERICAL_LENS_POWER: Tag = Tag(0x0022, 0x0007);
pub const CYLINDER_LENS_POWER: Tag = Tag(0x0022, 0x0008);
pub const CYLINDER_AXIS: Tag = Tag(0x0022, 0x0009);

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to string
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// Helper to get integer value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to i32
pub fn get_int_value(dcm: &InMemDicomObject, tag: Tag) -> Option<i32> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<i32>().ok())
}

/// Helper to get float value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to f64
pub fn get_float_value(dcm: &InMemDicomObject, tag: Tag) -> Option<f64> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_float64().ok())
}

/// Helper to get one item of a sequence tag
///
/// Returns `None` if the tag is not present, is not a sequence, or has
/// fewer than `index + 1` items
pub fn sequence_item(dcm: &InMemDicomObject, tag: Tag, index: usize) -> Option<&InMemDicomObject> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.items())
        .and_then(|items| items.get(index))
}
