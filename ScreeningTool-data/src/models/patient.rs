use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

/// Storage model for one patient record, one row of the flat data file.
///
/// Column names follow the headers used by the clinic's spreadsheet export,
/// so the file can be opened and read by staff directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRow {
    #[serde(rename = "Unique Code")]
    pub unique_code: String,

    #[serde(rename = "First Name")]
    pub first_name: String,

    #[serde(rename = "Middle Name")]
    pub middle_name: Option<String>,

    #[serde(rename = "Last Name")]
    pub last_name: String,

    /// Date of birth, parsed as a date on load
    #[serde(rename = "DOB")]
    pub date_of_birth: NaiveDate,

    /// Age in whole years at registration time
    #[serde(rename = "Age")]
    pub age: u32,

    #[serde(rename = "Sex")]
    pub sex: String,

    #[serde(rename = "Department")]
    pub department: String,

    #[serde(rename = "Job Title")]
    pub job_title: Option<String>,

    #[serde(rename = "Email")]
    pub email: Option<String>,

    #[serde(rename = "Phone Number")]
    pub phone_number: Option<String>,

    #[serde(rename = "Registration Date")]
    pub registration_date: NaiveDate,

    /// Combined reading in the form "systolic/diastolic"
    #[serde(rename = "Blood Pressure")]
    pub blood_pressure: Option<String>,

    #[serde(rename = "BP Notes")]
    pub bp_notes: Option<String>,

    #[serde(rename = "BP Date")]
    pub bp_date: Option<NaiveDate>,

    /// Weight in kilograms
    #[serde(rename = "Weight")]
    pub weight: Option<f64>,

    /// Height in metres
    #[serde(rename = "Height")]
    pub height: Option<f64>,

    #[serde(rename = "BMI")]
    pub bmi: Option<f64>,

    #[serde(rename = "BMI Classification")]
    pub bmi_classification: Option<String>,

    #[serde(rename = "BMI Date")]
    pub bmi_date: Option<NaiveDate>,

    #[serde(rename = "Visual Acuity Right")]
    pub visual_acuity_right: Option<String>,

    #[serde(rename = "Visual Acuity Left")]
    pub visual_acuity_left: Option<String>,

    #[serde(rename = "Visual Acuity Right Corrected")]
    pub visual_acuity_right_corrected: Option<String>,

    #[serde(rename = "Visual Acuity Left Corrected")]
    pub visual_acuity_left_corrected: Option<String>,

    #[serde(rename = "Vision Notes")]
    pub vision_notes: Option<String>,

    #[serde(rename = "Vision Test Date")]
    pub vision_date: Option<NaiveDate>,

    /// Blood glucose in mmol/L
    #[serde(rename = "Blood Glucose")]
    pub blood_glucose: Option<f64>,

    #[serde(rename = "Fasting Status")]
    pub fasting_status: Option<String>,

    #[serde(rename = "Glucose Date")]
    pub glucose_date: Option<NaiveDate>,

    #[serde(rename = "Clinical Notes")]
    pub clinical_notes: Option<String>,

    #[serde(rename = "Referred")]
    pub referred: bool,

    #[serde(rename = "Referral Date")]
    pub referral_date: Option<NaiveDate>,

    #[serde(rename = "Referral Details")]
    pub referral_details: Option<String>,
}

/// Input data for appending a new patient row.
///
/// The unique code is not part of the request; the store assigns it when the
/// row is committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatientRow {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub age: u32,
    pub sex: String,
    pub department: String,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub registration_date: NaiveDate,
}

impl NewPatientRow {
    /// Turn the request into a stored row under the given code, with every
    /// measurement column empty
    pub fn into_row(self, unique_code: String) -> PatientRow {
        PatientRow {
            unique_code,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            age: self.age,
            sex: self.sex,
            department: self.department,
            job_title: self.job_title,
            email: self.email,
            phone_number: self.phone_number,
            registration_date: self.registration_date,
            blood_pressure: None,
            bp_notes: None,
            bp_date: None,
            weight: None,
            height: None,
            bmi: None,
            bmi_classification: None,
            bmi_date: None,
            visual_acuity_right: None,
            visual_acuity_left: None,
            visual_acuity_right_corrected: None,
            visual_acuity_left_corrected: None,
            vision_notes: None,
            vision_date: None,
            blood_glucose: None,
            fasting_status: None,
            glucose_date: None,
            clinical_notes: None,
            referred: false,
            referral_date: None,
            referral_details: None,
        }
    }
}

impl PatientRow {
    /// Display name used by search: first and last name joined by a space
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Persisted login throttling state for the export gate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginAttemptState {
    /// Consecutive failed attempts since the last success or reset
    pub failed_attempts: u32,

    /// Unix timestamp (seconds) of the most recent failed attempt
    pub last_failed_at: Option<i64>,
}
