//! Record ingestion from DICOM OPV datasets
//!
//! Visual field analyzers export perimetry results as DICOM Ophthalmic
//! Visual Field (OPV) objects. These carry the same measurements as the
//! printed report, so a record built here is interchangeable with one
//! extracted from a report image.

pub mod tags;

use std::path::Path;

use dicom_object::{open_file, InMemDicomObject};

use crate::error::{HvfError, Result};
use crate::extraction::fuzzy::partial_ratio;
use crate::extraction::metadata::{detect_strategy, LATERALITY_LEFT, LATERALITY_RIGHT};
use crate::record::HvfRecord;
use crate::types::{
    CellValue, DeviationPlot, FieldSize, LayoutVersion, Metadata, PercIcon, Plot,
};

use tags::*;

/// Grid origin and spacing in degrees, by field size
///
/// 24-2 and 30-2 points sit 6 degrees apart centered around +/-3 with the
/// leading edge at -27; 10-2 points sit 2 degrees apart with the edge at -9.
fn grid_geometry(field_size: &str) -> (f64, f64) {
    if field_size == FieldSize::Size10_2.as_str() {
        (-9.0, 2.0)
    } else {
        (-27.0, 6.0)
    }
}

fn require_str(dcm: &InMemDicomObject, tag: dicom_core::Tag, name: &str) -> Result<String> {
    get_string_value(dcm, tag).ok_or_else(|| HvfError::TagNotFound(name.to_string()))
}

fn require_float(dcm: &InMemDicomObject, tag: dicom_core::Tag, name: &str) -> Result<f64> {
    get_float_value(dcm, tag).ok_or_else(|| HvfError::TagNotFound(name.to_string()))
}

fn require_item<'a>(
    dcm: &'a InMemDicomObject,
    tag: dicom_core::Tag,
    index: usize,
    name: &str,
) -> Result<&'a InMemDicomObject> {
    sequence_item(dcm, tag, index).ok_or_else(|| HvfError::TagNotFound(name.to_string()))
}

/// Reads the patient name, preferring the pre-anonymization attributes
///
/// Analyzers that de-identify on export keep the original name inside the
/// original-attributes sequence. DICOM person names separate components
/// with `^` (usually LAST^FIRST).
fn patient_name(dcm: &InMemDicomObject) -> Result<String> {
    if let Ok(elem) = dcm.element(ORIGINAL_ATTRIBUTES_SEQUENCE) {
        if let Some(items) = elem.items() {
            for item in items {
                let original = sequence_item(item, MODIFIED_ATTRIBUTES_SEQUENCE, 0)
                    .and_then(|m| get_string_value(m, PATIENT_NAME));
                if let Some(name) = original {
                    if !name.is_empty() {
                        return Ok(name.replace('^', " "));
                    }
                }
            }
        }
    }
    require_str(dcm, PATIENT_NAME, "PatientName").map(|n| n.replace('^', ", "))
}

/// Converts a DICOM `YYYYMMDD` date to the report's `MM-DD-YYYY` form
fn format_date(field: &str) -> String {
    if field.len() >= 8 {
        format!("{}-{}-{}", &field[4..6], &field[6..8], &field[0..4])
    } else {
        field.to_string()
    }
}

/// Picks the field size whose label best matches the horizontal extent
fn field_size_from_extent(extent: &str) -> String {
    let sizes = [FieldSize::Size10_2, FieldSize::Size24_2, FieldSize::Size30_2];
    let mut best = sizes[1].as_str().to_string();
    let mut best_score = 0;
    for size in sizes {
        let score = partial_ratio(extent, size.as_str());
        if score > best_score {
            best = size.as_str().to_string();
            best_score = score;
        }
    }
    best
}

/// False positives: percent estimate on modern fields, fraction on old ones
fn false_positives(catch_trials: &InMemDicomObject) -> Result<String> {
    if let Some(fp) = get_float_value(catch_trials, FALSE_POSITIVES_ESTIMATE) {
        return Ok(format!("{}%", fp as i32));
    }
    let num = require_float(catch_trials, FALSE_POSITIVES_QUANTITY, "FalsePositivesQuantity")?;
    let den = require_float(
        catch_trials,
        POSITIVE_CATCH_TRIALS_QUANTITY,
        "PositiveCatchTrialsQuantity",
    )?;
    Ok(format!("{}/{}", num as i32, den as i32))
}

/// False negatives: like false positives, with -100 meaning not measured
fn false_negatives(catch_trials: &InMemDicomObject) -> Result<String> {
    if let Some(fneg) = get_float_value(catch_trials, FALSE_NEGATIVES_ESTIMATE) {
        if fneg == -100.0 {
            return Ok("N/A".to_string());
        }
        return Ok(format!("{}%", fneg as i32));
    }
    let num = require_float(catch_trials, FALSE_NEGATIVES_QUANTITY, "FalseNegativesQuantity")?;
    let den = require_float(
        catch_trials,
        NEGATIVE_CATCH_TRIALS_QUANTITY,
        "NegativeCatchTrialsQuantity",
    )?;
    Ok(format!("{}/{}", num as i32, den as i32))
}

fn signed_diopters(v: f64) -> String {
    if v > 0.0 {
        format!("+{:.2}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Pupil size and refraction from the laterality-matching eye sequence
fn pupil_and_rx(dcm: &InMemDicomObject, laterality: &str) -> Result<(String, String)> {
    let eye_tag = if laterality == LATERALITY_RIGHT {
        OPHTHALMIC_PATIENT_CLINICAL_INFORMATION_RIGHT_EYE_SEQUENCE
    } else {
        OPHTHALMIC_PATIENT_CLINICAL_INFORMATION_LEFT_EYE_SEQUENCE
    };
    let eye = require_item(dcm, eye_tag, 0, "OphthalmicPatientClinicalInformationSequence")?;
    let pupil = require_float(eye, PUPIL_SIZE, "PupilSize")?;

    let refraction = require_item(
        eye,
        REFRACTIVE_PARAMETERS_USED_ON_PATIENT_SEQUENCE,
        0,
        "RefractiveParametersUsedOnPatientSequence",
    )?;
    let sphere = signed_diopters(require_float(refraction, SPHERICAL_LENS_POWER, "SphericalLensPower")?);
    let cylinder = signed_diopters(require_float(refraction, CYLINDER_LENS_POWER, "CylinderLensPower")?);
    let axis = require_float(refraction, CYLINDER_AXIS, "CylinderAxis")? as i32;

    let rx = if cylinder != "0.00" {
        format!("{}DS {}DC X {}", sphere, cylinder, axis)
    } else if sphere != "0.00" {
        format!("{}DS", sphere)
    } else {
        "+0.00DS".to_string()
    };
    Ok((pupil.to_string(), rx))
}

fn extract_dicom_metadata(dcm: &InMemDicomObject) -> Result<Metadata> {
    let mut md = Metadata::default();
    md.layout_version = LayoutVersion::Dicom.as_str().to_string();

    md.name = patient_name(dcm)?;
    md.id = require_str(dcm, PATIENT_ID, "PatientID")?;
    md.dob = format_date(&require_str(dcm, PATIENT_BIRTH_DATE, "PatientBirthDate")?);
    md.test_date = format_date(&require_str(dcm, STUDY_DATE, "StudyDate")?);

    let laterality = require_str(dcm, LATERALITY, "Laterality")?;
    md.laterality = if laterality == "R" {
        LATERALITY_RIGHT.to_string()
    } else {
        LATERALITY_LEFT.to_string()
    };

    let fovea_measured = require_str(dcm, FOVEAL_SENSITIVITY_MEASURED, "FovealSensitivityMeasured")?;
    md.fovea = if fovea_measured == "YES" {
        let db = require_float(dcm, FOVEAL_SENSITIVITY, "FovealSensitivity")?;
        format!("{}", db as i32)
    } else {
        "OFF".to_string()
    };

    let fixation = require_item(dcm, FIXATION_SEQUENCE, 0, "FixationSequence")?;
    let fl_num = require_float(
        fixation,
        PATIENT_NOT_PROPERLY_FIXATED_QUANTITY,
        "PatientNotProperlyFixatedQuantity",
    )?;
    let fl_den = require_float(fixation, FIXATION_CHECKED_QUANTITY, "FixationCheckedQuantity")?;
    md.fixation_loss = format!("{}/{}", fl_num as i32, fl_den as i32);

    let catch_trials = require_item(
        dcm,
        VISUAL_FIELD_CATCH_TRIAL_SEQUENCE,
        0,
        "VisualFieldCatchTrialSequence",
    )?;
    md.false_pos = false_positives(catch_trials)?;
    md.false_neg = false_negatives(catch_trials)?;

    let extent = require_float(dcm, VISUAL_FIELD_HORIZONTAL_EXTENT, "VisualFieldHorizontalExtent")?;
    md.field_size = field_size_from_extent(&format!("{}", extent as i32));

    let protocol = require_item(
        dcm,
        PERFORMED_PROTOCOL_CODE_SEQUENCE,
        1,
        "PerformedProtocolCodeSequence",
    )?;
    md.strategy = detect_strategy(&require_str(protocol, CODE_MEANING, "CodeMeaning")?);

    let duration = require_float(dcm, VISUAL_FIELD_TEST_DURATION, "VisualFieldTestDuration")?;
    md.test_duration = format!("{:02}:{:02}", (duration / 60.0) as i32, (duration % 60.0) as i32);

    let (pupil, rx) = pupil_and_rx(dcm, &md.laterality)?;
    md.pupil_diameter = pupil;
    md.rx = rx;

    let normals = require_item(dcm, RESULTS_NORMALS_SEQUENCE, 0, "ResultsNormalsSequence")?;
    md.md = format!(
        "{:.2}",
        require_float(normals, GLOBAL_DEVIATION_FROM_NORMAL, "GlobalDeviationFromNormal")?
    );
    md.psd = format!(
        "{:.2}",
        require_float(normals, LOCALIZED_DEVIATION_FROM_NORMAL, "LocalizedDeviationFromNormal")?
    );

    md.vfi = sequence_item(dcm, VISUAL_FIELD_GLOBAL_RESULTS_INDEX_SEQUENCE, 0)
        .and_then(|idx| sequence_item(idx, DATA_OBSERVATION_SEQUENCE, 0))
        .and_then(|obs| get_float_value(obs, NUMERIC_VALUE))
        .map(|vfi| format!("{}%", vfi as i32))
        .unwrap_or_default();

    Ok(md)
}

/// Maps a deviation probability in percent to its report icon
fn perc_from_probability(p: f64) -> Result<PercIcon> {
    match (p * 10.0).round() as i64 {
        0 => Ok(PercIcon::Normal),
        50 => Ok(PercIcon::FivePercent),
        20 => Ok(PercIcon::TwoPercent),
        10 => Ok(PercIcon::OnePercent),
        5 => Ok(PercIcon::HalfPercent),
        _ => Err(HvfError::InvalidValue(format!(
            "unknown deviation probability: {}",
            p
        ))),
    }
}

impl HvfRecord {
    /// Reads a DICOM OPV file and builds a record from it
    pub fn from_dicom_file(path: &Path) -> Result<HvfRecord> {
        let dcm = open_file(path)?;
        Self::from_dicom(&dcm)
    }

    /// Builds a record from a DICOM OPV dataset
    ///
    /// Test points are listed by their visual field coordinates in degrees
    /// and mapped onto the 10x10 grid; positions without a point stay
    /// blank. The record carries layout version `dicom`.
    pub fn from_dicom(dcm: &InMemDicomObject) -> Result<HvfRecord> {
        let metadata = extract_dicom_metadata(dcm)?;
        let (start, step) = grid_geometry(&metadata.field_size);

        let mut raw: Plot<CellValue> = Plot::new();
        let mut tdv: Plot<CellValue> = Plot::new();
        let mut tdp: Plot<PercIcon> = Plot::new();
        let mut pdv: Plot<CellValue> = Plot::new();
        let mut pdp: Plot<PercIcon> = Plot::new();

        let points = dcm
            .element(VISUAL_FIELD_TEST_POINT_SEQUENCE)
            .map_err(|_| HvfError::TagNotFound("VisualFieldTestPointSequence".to_string()))?;
        let points = points
            .items()
            .ok_or_else(|| HvfError::InvalidValue("test points are not a sequence".to_string()))?;

        let mut pattern_generated = false;
        for (i, point) in points.iter().enumerate() {
            let x = require_float(point, TEST_POINT_X_COORDINATE, "VisualFieldTestPointXCoordinate")?;
            let y = require_float(point, TEST_POINT_Y_COORDINATE, "VisualFieldTestPointYCoordinate")?;
            let col = (x - start) / step;
            let row = (-y - start) / step;
            if !(0.0..10.0).contains(&col)
                || !(0.0..10.0).contains(&row)
                || col.fract() != 0.0
                || row.fract() != 0.0
            {
                return Err(HvfError::InvalidValue(format!(
                    "test point ({}, {}) outside the grid",
                    x, y
                )));
            }
            let col = col as usize;
            let row = row as usize;

            let sensitivity = require_float(point, SENSITIVITY_VALUE, "SensitivityValue")? as i32;
            let not_seen = get_string_value(point, STIMULUS_RESULTS).as_deref() == Some("NOT SEEN");
            raw.set(
                col,
                row,
                if not_seen {
                    CellValue::BelowThreshold
                } else {
                    CellValue::Value(sensitivity)
                },
            );

            let normals = require_item(
                point,
                TEST_POINT_NORMALS_SEQUENCE,
                0,
                "VisualFieldTestPointNormalsSequence",
            )?;
            let tdv_val = require_float(
                normals,
                AGE_CORRECTED_SENSITIVITY_DEVIATION_VALUE,
                "AgeCorrectedSensitivityDeviationValue",
            )? as i32;
            tdv.set(col, row, CellValue::Value(tdv_val));
            let tdp_prob = require_float(
                normals,
                AGE_CORRECTED_SENSITIVITY_DEVIATION_PROBABILITY_VALUE,
                "AgeCorrectedSensitivityDeviationProbabilityValue",
            )?;
            tdp.set(col, row, perc_from_probability(tdp_prob)?);

            let point_pattern = get_string_value(
                normals,
                GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_FLAG,
            )
            .as_deref()
                == Some("YES");
            if i == 0 {
                pattern_generated = point_pattern;
            }
            if point_pattern {
                let pdv_val = require_float(
                    normals,
                    GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_VALUE,
                    "GeneralizedDefectCorrectedSensitivityDeviationValue",
                )? as i32;
                pdv.set(col, row, CellValue::Value(pdv_val));
                let pdp_prob = require_float(
                    normals,
                    GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_PROBABILITY_VALUE,
                    "GeneralizedDefectCorrectedSensitivityDeviationProbabilityValue",
                )?;
                pdp.set(col, row, perc_from_probability(pdp_prob)?);
            }
        }

        // The physiologic blind spot is reported on the raw plot only;
        // deviation plots leave those two positions empty.
        if metadata.field_size != FieldSize::Size10_2.as_str() {
            let blind_col = if metadata.laterality == LATERALITY_RIGHT { 7 } else { 2 };
            for blind_row in [4, 5] {
                tdv.set(blind_col, blind_row, CellValue::Blank);
                tdp.set(blind_col, blind_row, PercIcon::Blank);
                if pattern_generated {
                    pdv.set(blind_col, blind_row, CellValue::Blank);
                    pdp.set(blind_col, blind_row, PercIcon::Blank);
                }
            }
        }

        let (pat_value_plot, pat_perc_plot) = if pattern_generated {
            (DeviationPlot::Generated(pdv), DeviationPlot::Generated(pdp))
        } else {
            (DeviationPlot::NotGenerated, DeviationPlot::NotGenerated)
        };

        Ok(HvfRecord::new(
            metadata,
            raw,
            tdv,
            tdp,
            pat_value_plot,
            pat_perc_plot,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::value::DataSetSequence;
    use dicom_core::{DataElement, PrimitiveValue, Tag, VR};

    fn str_elem(tag: Tag, value: &str) -> DataElement<InMemDicomObject> {
        DataElement::new(tag, VR::LO, PrimitiveValue::from(value))
    }

    fn num_elem(tag: Tag, value: f64) -> DataElement<InMemDicomObject> {
        DataElement::new(tag, VR::FD, PrimitiveValue::from(value))
    }

    fn seq_elem(tag: Tag, items: Vec<InMemDicomObject>) -> DataElement<InMemDicomObject> {
        DataElement::new(tag, VR::SQ, DataSetSequence::from(items))
    }

    struct TestPoint {
        x: f64,
        y: f64,
        sensitivity: f64,
        seen: bool,
        tdv: f64,
        tdp_prob: f64,
        pattern: Option<(f64, f64)>,
    }

    fn point_item(p: &TestPoint) -> InMemDicomObject {
        let mut normals = vec![
            num_elem(AGE_CORRECTED_SENSITIVITY_DEVIATION_VALUE, p.tdv),
            num_elem(AGE_CORRECTED_SENSITIVITY_DEVIATION_PROBABILITY_VALUE, p.tdp_prob),
        ];
        match p.pattern {
            Some((pdv, pdp_prob)) => {
                normals.push(str_elem(
                    GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_FLAG,
                    "YES",
                ));
                normals.push(num_elem(GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_VALUE, pdv));
                normals.push(num_elem(
                    GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_PROBABILITY_VALUE,
                    pdp_prob,
                ));
            }
            None => {
                normals.push(str_elem(
                    GENERALIZED_DEFECT_CORRECTED_SENSITIVITY_DEVIATION_FLAG,
                    "NO",
                ));
            }
        }

        let mut elems = vec![
            num_elem(TEST_POINT_X_COORDINATE, p.x),
            num_elem(TEST_POINT_Y_COORDINATE, p.y),
            num_elem(SENSITIVITY_VALUE, p.sensitivity),
            seq_elem(
                TEST_POINT_NORMALS_SEQUENCE,
                vec![InMemDicomObject::from_element_iter(normals)],
            ),
        ];
        if !p.seen {
            elems.push(str_elem(STIMULUS_RESULTS, "NOT SEEN"));
        }
        InMemDicomObject::from_element_iter(elems)
    }

    fn eye_sequence(tag: Tag, pupil: f64, sphere: f64, cylinder: f64, axis: f64) -> DataElement<InMemDicomObject> {
        let refraction = InMemDicomObject::from_element_iter([
            num_elem(SPHERICAL_LENS_POWER, sphere),
            num_elem(CYLINDER_LENS_POWER, cylinder),
            num_elem(CYLINDER_AXIS, axis),
        ]);
        let eye = InMemDicomObject::from_element_iter([
            num_elem(PUPIL_SIZE, pupil),
            seq_elem(REFRACTIVE_PARAMETERS_USED_ON_PATIENT_SEQUENCE, vec![refraction]),
        ]);
        seq_elem(tag, vec![eye])
    }

    fn sample_dataset(laterality: &str, extent: f64, points: &[TestPoint]) -> InMemDicomObject {
        let fixation = InMemDicomObject::from_element_iter([
            num_elem(PATIENT_NOT_PROPERLY_FIXATED_QUANTITY, 1.0),
            num_elem(FIXATION_CHECKED_QUANTITY, 14.0),
        ]);
        let catch_trials = InMemDicomObject::from_element_iter([
            num_elem(FALSE_POSITIVES_ESTIMATE, 2.0),
            num_elem(FALSE_NEGATIVES_ESTIMATE, -100.0),
        ]);
        let normals = InMemDicomObject::from_element_iter([
            num_elem(GLOBAL_DEVIATION_FROM_NORMAL, -3.214),
            num_elem(LOCALIZED_DEVIATION_FROM_NORMAL, 2.871),
        ]);
        let protocol_device = InMemDicomObject::from_element_iter([str_elem(CODE_MEANING, "HFA II")]);
        let protocol_strategy =
            InMemDicomObject::from_element_iter([str_elem(CODE_MEANING, "SITA-Standard")]);
        let vfi_obs = InMemDicomObject::from_element_iter([num_elem(NUMERIC_VALUE, 96.0)]);
        let vfi_idx = InMemDicomObject::from_element_iter([seq_elem(
            DATA_OBSERVATION_SEQUENCE,
            vec![vfi_obs],
        )]);

        let eye_tag = if laterality == "R" {
            OPHTHALMIC_PATIENT_CLINICAL_INFORMATION_RIGHT_EYE_SEQUENCE
        } else {
            OPHTHALMIC_PATIENT_CLINICAL_INFORMATION_LEFT_EYE_SEQUENCE
        };

        InMemDicomObject::from_element_iter([
            str_elem(PATIENT_NAME, "DOE^JOHN"),
            str_elem(PATIENT_ID, "123456"),
            str_elem(PATIENT_BIRTH_DATE, "19500102"),
            str_elem(STUDY_DATE, "20190304"),
            str_elem(LATERALITY, laterality),
            str_elem(FOVEAL_SENSITIVITY_MEASURED, "NO"),
            num_elem(VISUAL_FIELD_HORIZONTAL_EXTENT, extent),
            num_elem(VISUAL_FIELD_TEST_DURATION, 321.0),
            seq_elem(FIXATION_SEQUENCE, vec![fixation]),
            seq_elem(VISUAL_FIELD_CATCH_TRIAL_SEQUENCE, vec![catch_trials]),
            seq_elem(RESULTS_NORMALS_SEQUENCE, vec![normals]),
            seq_elem(
                PERFORMED_PROTOCOL_CODE_SEQUENCE,
                vec![protocol_device, protocol_strategy],
            ),
            seq_elem(VISUAL_FIELD_GLOBAL_RESULTS_INDEX_SEQUENCE, vec![vfi_idx]),
            eye_sequence(eye_tag, 4.1, 1.25, 0.5, 90.0),
            seq_elem(
                VISUAL_FIELD_TEST_POINT_SEQUENCE,
                points.iter().map(point_item).collect(),
            ),
        ])
    }

    fn seen_point(x: f64, y: f64, sensitivity: f64) -> TestPoint {
        TestPoint {
            x,
            y,
            sensitivity,
            seen: true,
            tdv: -2.0,
            tdp_prob: 0.0,
            pattern: Some((-1.0, 5.0)),
        }
    }

    #[test]
    fn test_from_dicom_metadata() {
        let dcm = sample_dataset("R", 24.0, &[seen_point(3.0, 3.0, 28.0)]);
        let record = HvfRecord::from_dicom(&dcm).unwrap();
        let md = &record.metadata;
        assert_eq!(md.layout_version, "dicom");
        assert_eq!(md.name, "DOE, JOHN");
        assert_eq!(md.id, "123456");
        assert_eq!(md.dob, "01-02-1950");
        assert_eq!(md.test_date, "03-04-2019");
        assert_eq!(md.laterality, "Right");
        assert_eq!(md.fovea, "OFF");
        assert_eq!(md.fixation_loss, "1/14");
        assert_eq!(md.false_pos, "2%");
        assert_eq!(md.false_neg, "N/A");
        assert_eq!(md.test_duration, "05:21");
        assert_eq!(md.field_size, "24-2");
        assert_eq!(md.strategy, "SITA Standard");
        assert_eq!(md.pupil_diameter, "4.1");
        assert_eq!(md.rx, "+1.25DS +0.50DC X 90");
        assert_eq!(md.md, "-3.21");
        assert_eq!(md.psd, "2.87");
        assert_eq!(md.vfi, "96%");
    }

    #[test]
    fn test_from_dicom_point_mapping() {
        let mut not_seen = seen_point(-3.0, 3.0, 0.0);
        not_seen.seen = false;
        let dcm = sample_dataset("R", 24.0, &[seen_point(3.0, 3.0, 28.0), not_seen]);
        let record = HvfRecord::from_dicom(&dcm).unwrap();

        // (3, 3) degrees on a 24-2 grid lands at column 5, row 4
        assert_eq!(record.raw_value_plot.get(5, 4), CellValue::Value(28));
        assert_eq!(record.abs_value_plot.get(5, 4), CellValue::Value(-2));
        assert_eq!(record.abs_perc_plot.get(5, 4), PercIcon::Normal);
        assert_eq!(record.raw_value_plot.get(4, 4), CellValue::BelowThreshold);
        // positions without a test point stay blank
        assert_eq!(record.raw_value_plot.get(0, 0), CellValue::Blank);
        assert_eq!(record.abs_perc_plot.get(0, 0), PercIcon::Blank);
    }

    #[test]
    fn test_from_dicom_rejects_out_of_grid_points() {
        // x = -33 lies one step left of a 24-2 grid; it must error, not
        // land in column 0
        let dcm = sample_dataset(
            "R",
            24.0,
            &[seen_point(3.0, 3.0, 28.0), seen_point(-33.0, 3.0, 30.0)],
        );
        assert!(matches!(
            HvfRecord::from_dicom(&dcm),
            Err(HvfError::InvalidValue(_))
        ));

        // below the grid
        let dcm = sample_dataset("R", 24.0, &[seen_point(3.0, -33.0, 28.0)]);
        assert!(HvfRecord::from_dicom(&dcm).is_err());

        // off the grid lattice entirely
        let dcm = sample_dataset("R", 24.0, &[seen_point(4.0, 3.0, 28.0)]);
        assert!(HvfRecord::from_dicom(&dcm).is_err());
    }

    #[test]
    fn test_from_dicom_pattern_plots() {
        let dcm = sample_dataset("R", 24.0, &[seen_point(3.0, 3.0, 28.0)]);
        let record = HvfRecord::from_dicom(&dcm).unwrap();
        assert!(record.has_pattern_plots());
        let pdv = record.pat_value_plot.as_plot().unwrap();
        let pdp = record.pat_perc_plot.as_plot().unwrap();
        assert_eq!(pdv.get(5, 4), CellValue::Value(-1));
        assert_eq!(pdp.get(5, 4), PercIcon::FivePercent);
    }

    #[test]
    fn test_from_dicom_pattern_not_generated() {
        let mut point = seen_point(3.0, 3.0, 28.0);
        point.pattern = None;
        let dcm = sample_dataset("R", 24.0, &[point]);
        let record = HvfRecord::from_dicom(&dcm).unwrap();
        assert!(!record.has_pattern_plots());
    }

    #[test]
    fn test_from_dicom_blind_spot_blanking() {
        // (15, 3) degrees maps to column 7, row 4: the right-eye blind spot
        let dcm = sample_dataset("R", 24.0, &[seen_point(15.0, 3.0, 12.0)]);
        let record = HvfRecord::from_dicom(&dcm).unwrap();
        assert_eq!(record.raw_value_plot.get(7, 4), CellValue::Value(12));
        assert_eq!(record.abs_value_plot.get(7, 4), CellValue::Blank);
        assert_eq!(record.abs_perc_plot.get(7, 4), PercIcon::Blank);

        // left eye blanks column 2 instead
        let dcm = sample_dataset("L", 24.0, &[seen_point(-15.0, 3.0, 12.0)]);
        let record = HvfRecord::from_dicom(&dcm).unwrap();
        assert_eq!(record.metadata.laterality, "Left");
        assert_eq!(record.raw_value_plot.get(2, 4), CellValue::Value(12));
        assert_eq!(record.abs_value_plot.get(2, 4), CellValue::Blank);
    }

    #[test]
    fn test_from_dicom_10_2_geometry() {
        // (1, 1) degrees on a 10-2 grid lands at column 5, row 4, and the
        // blind spot positions are left alone
        let dcm = sample_dataset("R", 10.0, &[seen_point(1.0, 1.0, 30.0), seen_point(5.0, -1.0, 22.0)]);
        let record = HvfRecord::from_dicom(&dcm).unwrap();
        assert_eq!(record.metadata.field_size, "10-2");
        assert_eq!(record.raw_value_plot.get(5, 4), CellValue::Value(30));
        assert_eq!(record.raw_value_plot.get(7, 5), CellValue::Value(22));
        assert_eq!(record.abs_value_plot.get(7, 5), CellValue::Value(-2));
    }

    #[test]
    fn test_from_dicom_old_style_catch_trials() {
        let mut dcm = sample_dataset("R", 24.0, &[seen_point(3.0, 3.0, 28.0)]);
        let catch_trials = InMemDicomObject::from_element_iter([
            num_elem(FALSE_POSITIVES_QUANTITY, 2.0),
            num_elem(POSITIVE_CATCH_TRIALS_QUANTITY, 15.0),
            num_elem(FALSE_NEGATIVES_QUANTITY, 3.0),
            num_elem(NEGATIVE_CATCH_TRIALS_QUANTITY, 16.0),
        ]);
        dcm.put(seq_elem(VISUAL_FIELD_CATCH_TRIAL_SEQUENCE, vec![catch_trials]));
        let record = HvfRecord::from_dicom(&dcm).unwrap();
        assert_eq!(record.metadata.false_pos, "2/15");
        assert_eq!(record.metadata.false_neg, "3/16");
    }

    #[test]
    fn test_from_dicom_missing_required_tag() {
        let mut dcm = sample_dataset("R", 24.0, &[seen_point(3.0, 3.0, 28.0)]);
        dcm.remove_element(PATIENT_ID);
        assert!(HvfRecord::from_dicom(&dcm).is_err());
    }

    #[test]
    fn test_from_dicom_anonymized_name_fallback() {
        let mut dcm = sample_dataset("R", 24.0, &[seen_point(3.0, 3.0, 28.0)]);
        let modified = InMemDicomObject::from_element_iter([str_elem(PATIENT_NAME, "SMITH^JANE")]);
        let original = InMemDicomObject::from_element_iter([seq_elem(
            MODIFIED_ATTRIBUTES_SEQUENCE,
            vec![modified],
        )]);
        dcm.put(seq_elem(ORIGINAL_ATTRIBUTES_SEQUENCE, vec![original]));
        let record = HvfRecord::from_dicom(&dcm).unwrap();
        assert_eq!(record.metadata.name, "SMITH JANE");
    }
}
