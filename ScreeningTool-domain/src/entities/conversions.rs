use chrono::NaiveDate;

use crate::entities::patient::{
    BloodPressure, BmiClassification, FastingStatus, PatientRecord, RegisterPatientRequest, Sex,
    VisualAcuity,
};
use crate::errors::ScreeningError;
use screening_tool_data::models::patient::{NewPatientRow, PatientRow};

/// Conversion functions between domain entities and data models
/// These functions follow the pattern convert_to_[target_layer]_[model_name]

/// Convert a stored row to a domain record.
///
/// Fails with `InvalidInput` when a stored value cannot be interpreted, for
/// example a blood pressure column that does not split into two integers.
pub fn convert_to_domain_record(row: PatientRow) -> Result<PatientRecord, ScreeningError> {
    let context = |e: ScreeningError| match e {
        ScreeningError::InvalidInput(msg) => {
            ScreeningError::InvalidInput(format!("Record {}: {}", row.unique_code, msg))
        }
        other => other,
    };

    let sex: Sex = row.sex.parse().map_err(context)?;
    let blood_pressure: Option<BloodPressure> = row
        .blood_pressure
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(context)?;
    let bmi_classification: Option<BmiClassification> = row
        .bmi_classification
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(context)?;
    let fasting_status: Option<FastingStatus> = row
        .fasting_status
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(context)?;

    Ok(PatientRecord {
        unique_code: row.unique_code,
        first_name: row.first_name,
        middle_name: row.middle_name,
        last_name: row.last_name,
        date_of_birth: row.date_of_birth,
        age: row.age,
        sex,
        department: row.department,
        job_title: row.job_title,
        email: row.email,
        phone_number: row.phone_number,
        registration_date: row.registration_date,
        blood_pressure,
        bp_notes: row.bp_notes,
        bp_date: row.bp_date,
        weight: row.weight,
        height: row.height,
        bmi: row.bmi,
        bmi_classification,
        bmi_date: row.bmi_date,
        visual_acuity: VisualAcuity {
            right: row.visual_acuity_right,
            left: row.visual_acuity_left,
            right_corrected: row.visual_acuity_right_corrected,
            left_corrected: row.visual_acuity_left_corrected,
        },
        vision_notes: row.vision_notes,
        vision_date: row.vision_date,
        blood_glucose: row.blood_glucose,
        fasting_status,
        glucose_date: row.glucose_date,
        clinical_notes: row.clinical_notes,
        referred: row.referred,
        referral_date: row.referral_date,
        referral_details: row.referral_details,
    })
}

/// Convert a registration request to the data model for a new row
pub fn convert_to_data_new_row(
    request: &RegisterPatientRequest,
    age: u32,
    registration_date: NaiveDate,
) -> NewPatientRow {
    NewPatientRow {
        first_name: request.first_name.clone(),
        middle_name: request.middle_name.clone(),
        last_name: request.last_name.clone(),
        date_of_birth: request.date_of_birth,
        age,
        sex: request.sex.to_string(),
        department: request.department.clone(),
        job_title: request.job_title.clone(),
        email: request.email.clone(),
        phone_number: request.phone_number.clone(),
        registration_date,
    }
}
